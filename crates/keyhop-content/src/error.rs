//! Error types for keyhop-content

use keyhop_exec::ExecError;
use thiserror::Error;

/// Errors raised while resolving or unpacking upload content
#[derive(Error, Debug, Clone)]
pub enum ContentError {
    /// Content reference is unusable (missing file, HTTP client error, bad base64)
    #[error("couldn't fetch {reference}: {cause}")]
    ResourceFetch {
        /// Reference as supplied by the caller
        reference: String,
        /// Underlying HTTP, file or decoding error
        cause: String,
    },

    /// Content host unreachable, or it failed with a server error
    #[error("couldn't fetch {reference}: {cause}")]
    Unavailable {
        /// Reference as supplied by the caller
        reference: String,
        /// Network error or HTTP status
        cause: String,
    },

    /// Bytes are not a readable archive
    #[error("{0}")]
    ArchiveFormat(String),
}

impl From<ContentError> for ExecError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::ResourceFetch { .. } => ExecError::ResourceFetch(e.to_string()),
            ContentError::Unavailable { .. } => ExecError::ResourceUnavailable(e.to_string()),
            ContentError::ArchiveFormat(message) => ExecError::ArchiveFormat(message),
        }
    }
}
