//! Resolving upload content to bytes

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ContentError;

/// Where upload content comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentSource {
    /// Base64-encoded bytes carried in the request
    Inline {
        /// Base64 payload
        inline: String,
    },
    /// `http(s)://` URL, `file://` URL, or local path
    Reference(String),
}

impl ContentSource {
    /// Human-readable name for logs and responses
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ContentSource::Inline { inline } => format!("inline ({} base64 chars)", inline.len()),
            ContentSource::Reference(reference) => reference.clone(),
        }
    }

    /// Whether the source is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ContentSource::Inline { inline } => inline.trim().is_empty(),
            ContentSource::Reference(reference) => reference.trim().is_empty(),
        }
    }
}

/// Resolves a [`ContentSource`] to its bytes
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    async fn fetch(&self, source: &ContentSource) -> Result<Vec<u8>, ContentError>;
}

/// Fetches over HTTP(S) with reqwest and from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    /// Create a new fetcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Network failures and 5xx responses are `Unavailable`, other error statuses are
    /// `ResourceFetch`
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ContentError> {
        let unavailable = |cause: String| ContentError::Unavailable {
            reference: url.to_string(),
            cause,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(unavailable(format!("server returned {status}")));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ContentError::ResourceFetch {
                reference: url.to_string(),
                cause: e.to_string(),
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_path(reference: &str, path: &Path) -> Result<Vec<u8>, ContentError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| ContentError::ResourceFetch {
                reference: reference.to_string(),
                cause: e.to_string(),
            })
    }
}

#[async_trait]
impl ByteFetcher for DefaultFetcher {
    #[instrument(skip(self, source), fields(source = %source.describe()))]
    async fn fetch(&self, source: &ContentSource) -> Result<Vec<u8>, ContentError> {
        if source.is_empty() {
            return Err(ContentError::ResourceFetch {
                reference: source.describe(),
                cause: "content is required".to_string(),
            });
        }

        let bytes = match source {
            ContentSource::Inline { inline } => base64::engine::general_purpose::STANDARD
                .decode(inline.trim())
                .map_err(|e| ContentError::ResourceFetch {
                    reference: source.describe(),
                    cause: format!("invalid base64: {e}"),
                })?,
            ContentSource::Reference(reference) => {
                let reference = reference.trim();
                if reference.starts_with("http://") || reference.starts_with("https://") {
                    self.fetch_url(reference).await?
                } else if let Some(path) = reference.strip_prefix("file://") {
                    Self::fetch_path(reference, Path::new(path)).await?
                } else {
                    Self::fetch_path(reference, Path::new(reference)).await?
                }
            }
        };

        debug!(bytes = bytes.len(), "fetched content");
        Ok(bytes)
    }
}
