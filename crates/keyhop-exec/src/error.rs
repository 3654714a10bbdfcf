//! Error types for keyhop-exec

use thiserror::Error;

/// Errors that can occur while talking to a remote host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Invalid or missing input, detected before any network I/O
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Remote endpoint rejected the supplied credentials
    #[error("authentication failed for {user}@{host}: {reason}")]
    Authentication {
        /// Remote user
        user: String,
        /// Remote host
        host: String,
        /// Why the server refused
        reason: String,
    },

    /// Failed to reach or negotiate with the remote host
    #[error("couldn't connect to {target}: {cause}")]
    Connection {
        /// `user@host:port` that was dialled
        target: String,
        /// Underlying transport error
        cause: String,
    },

    /// Remote endpoint refused to start the command
    #[error("command \"{command}\" was unable to execute: {reason}")]
    ExecutionRejected {
        /// Command that was refused
        command: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// Remote directory operation failed
    #[error("couldn't create the directory {path}: {cause}")]
    RemoteFs {
        /// Remote directory
        path: String,
        /// Underlying SFTP error
        cause: String,
    },

    /// File content transfer failed
    #[error("couldn't upload {path}: {cause}")]
    Transfer {
        /// Remote destination
        path: String,
        /// Underlying SFTP error
        cause: String,
    },

    /// Content reference is unusable (bad URL, missing file, client error, bad base64)
    #[error("getting the resource failed: {0}")]
    ResourceFetch(String),

    /// Content host could not be reached or failed while serving the content
    #[error("the resource is unavailable: {0}")]
    ResourceUnavailable(String),

    /// Archive could not be read or has an unusable layout
    #[error("invalid archive: {0}")]
    ArchiveFormat(String),

    /// Local I/O error (key staging)
    #[error("I/O error: {0}")]
    Io(String),
}

/// Coarse classification of an [`ExecError`] for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied bad input
    BadInput,
    /// The remote host refused the credentials
    BadCredentials,
    /// Remote or transport problem
    Remote,
}

impl ExecError {
    /// Classify the error as bad input, bad credentials, or a remote problem
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Config(_)
            | ExecError::ResourceFetch(_)
            | ExecError::ArchiveFormat(_)
            | ExecError::Io(_) => ErrorKind::BadInput,
            ExecError::Authentication { .. } => ErrorKind::BadCredentials,
            ExecError::Connection { .. }
            | ExecError::ExecutionRejected { .. }
            | ExecError::RemoteFs { .. }
            | ExecError::Transfer { .. }
            | ExecError::ResourceUnavailable(_) => ErrorKind::Remote,
        }
    }

    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ExecError::Config(message.into())
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
