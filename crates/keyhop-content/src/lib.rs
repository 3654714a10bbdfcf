//! keyhop-content: Upload content resolution
//!
//! Resolves the content reference of an upload request to bytes, and enumerates zip
//! archives as a lazy sequence of upload entries.

pub mod archive;
pub mod error;
pub mod fetch;

pub use archive::ZipEntries;
pub use error::ContentError;
pub use fetch::{ByteFetcher, ContentSource, DefaultFetcher};
