//! Lazy enumeration of zip archive entries

use std::io::{Cursor, Read};

use keyhop_exec::UploadEntry;
use tracing::debug;
use zip::ZipArchive;

use crate::error::ContentError;

/// Iterator over the entries of an in-memory zip archive, in archive order
///
/// Only the central directory is parsed up front. Each entry's bytes are decompressed
/// when that entry is yielded.
pub struct ZipEntries {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    next: usize,
}

impl std::fmt::Debug for ZipEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipEntries")
            .field("len", &self.archive.len())
            .field("next", &self.next)
            .finish()
    }
}

impl ZipEntries {
    /// Open `bytes` as a zip archive
    ///
    /// # Errors
    /// Returns `ContentError::ArchiveFormat` if the bytes are not a zip archive
    pub fn new(bytes: Vec<u8>) -> Result<Self, ContentError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ContentError::ArchiveFormat(format!("not a zip archive: {e}")))?;

        debug!(entries = archive.len(), "opened zip archive");

        Ok(Self { archive, next: 0 })
    }

    /// Number of entries, directories included
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    fn read_entry(&mut self, index: usize) -> Result<UploadEntry, ContentError> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|e| ContentError::ArchiveFormat(format!("entry {index}: {e}")))?;
        let name = file.name().to_string();

        if file.is_dir() {
            return Ok(UploadEntry::directory(name));
        }

        let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut content)
            .map_err(|e| ContentError::ArchiveFormat(format!("couldn't read {name}: {e}")))?;

        Ok(UploadEntry::file(name, content))
    }
}

impl Iterator for ZipEntries {
    type Item = Result<UploadEntry, ContentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.archive.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.read_entry(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.archive.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}
