//! Uploading single files and archive trees over a [`Transport`]

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::error::ExecError;
use crate::events::{ProgressEvent, ProgressSink, emit};
use crate::result::{UploadEntry, UploadSummary};
use crate::traits::Transport;

/// Check that `path` names an absolute remote file
///
/// # Errors
/// Returns `ExecError::Config` for relative paths and paths ending in `/`
pub fn validate_file_destination(path: &str) -> Result<(), ExecError> {
    if !path.starts_with('/') {
        return Err(ExecError::config(format!(
            "the path {path} must be an absolute path"
        )));
    }
    if path.ends_with('/') {
        return Err(ExecError::config(format!(
            "the path {path} names a directory, expected a file"
        )));
    }
    Ok(())
}

/// Check that `root` is an absolute remote directory
///
/// # Errors
/// Returns `ExecError::Config` for relative paths
pub fn validate_destination_root(root: &str) -> Result<(), ExecError> {
    if root.starts_with('/') {
        Ok(())
    } else {
        Err(ExecError::config(format!(
            "the path {root} must be an absolute path"
        )))
    }
}

/// Write `content` to `path`; the parent directory must already exist
///
/// # Errors
/// Returns `ExecError::Config` before any transport call if `path` is not an absolute
/// file path, or `ExecError::Transfer` if the write fails.
#[instrument(skip(transport, content, events), fields(bytes = content.len()))]
pub async fn upload_file<T>(
    transport: &T,
    content: &[u8],
    path: &str,
    events: Option<&ProgressSink>,
) -> Result<(), ExecError>
where
    T: Transport + ?Sized,
{
    validate_file_destination(path)?;

    info!(path = %path, "uploading file");
    emit(
        events,
        ProgressEvent::Uploading {
            path: path.to_string(),
            bytes: content.len(),
        },
    );
    transport.write_file(path, content).await
}

/// Recreate an archive's file tree under `destination_root`
///
/// Entries are consumed lazily and in order. The archive's common root (see
/// [`ArchiveRoot`]) is stripped from every path. Directory entries are skipped; each
/// file's parent directory is ensured once, then the file is written. The first failure
/// aborts the upload and files already written stay in place.
///
/// # Errors
/// `ExecError::Config` for a relative `destination_root` (before any transport call),
/// `ExecError::ArchiveFormat` for entries outside the root or with unsafe paths,
/// `ExecError::RemoteFs` / `ExecError::Transfer` from the transport, and any error
/// yielded by `entries`.
#[instrument(skip(transport, entries, events))]
pub async fn upload_tree<T, I, E>(
    transport: &T,
    entries: I,
    destination_root: &str,
    events: Option<&ProgressSink>,
) -> Result<UploadSummary, ExecError>
where
    T: Transport + ?Sized,
    I: IntoIterator<Item = Result<UploadEntry, E>>,
    E: Into<ExecError>,
{
    validate_destination_root(destination_root)?;
    let base = destination_root.trim_end_matches('/');

    let mut archive_root: Option<ArchiveRoot> = None;
    let mut ensured: HashSet<String> = HashSet::new();
    let mut summary = UploadSummary::default();

    for entry in entries {
        let entry = entry.map_err(Into::into)?;
        let root = archive_root.get_or_insert_with(|| ArchiveRoot::from_first(&entry));
        let relative = root.strip(&entry.relative_path)?;

        if entry.is_directory {
            continue;
        }
        if relative.is_empty() {
            return Err(ExecError::ArchiveFormat(format!(
                "file entry '{}' has no name below the archive root",
                entry.relative_path
            )));
        }

        let destination = format!("{base}/{relative}");
        let parent = parent_dir(&destination);

        if !ensured.contains(&parent) {
            debug!(dir = %parent, "ensuring remote directory");
            transport.create_dir_all(&parent).await?;
            emit(
                events,
                ProgressEvent::DirectoryEnsured {
                    path: parent.clone(),
                },
            );
            summary.directories.push(parent.clone());
            ensured.extend(self_and_ancestors(&parent));
        }

        info!(path = %destination, "uploading");
        emit(
            events,
            ProgressEvent::Uploading {
                path: destination.clone(),
                bytes: entry.content.len(),
            },
        );
        transport.write_file(&destination, &entry.content).await?;
        summary.files.push(destination);
    }

    Ok(summary)
}

/// Common leading directory shared by every entry of an archive
///
/// Taken from the first entry: `site/` or `site/index.html` both give `site/`. A first
/// entry that is a plain top-level file means there is no common root and nothing is
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRoot {
    prefix: String,
}

impl ArchiveRoot {
    /// Derive the root from the first entry of an archive
    #[must_use]
    pub fn from_first(entry: &UploadEntry) -> Self {
        let path = clean(&entry.relative_path);
        let prefix = match path.split_once('/') {
            Some((top, _)) if !top.is_empty() => format!("{top}/"),
            _ if entry.is_directory && !path.is_empty() => format!("{path}/"),
            _ => String::new(),
        };
        Self { prefix }
    }

    /// Path of `entry_path` below the root, without a trailing `/`
    ///
    /// # Errors
    /// Returns `ExecError::ArchiveFormat` for absolute paths, `..` components, or paths
    /// outside the root.
    pub fn strip(&self, entry_path: &str) -> Result<String, ExecError> {
        let path = clean(entry_path);

        if path.starts_with('/') || path.split('/').any(|part| part == "..") {
            return Err(ExecError::ArchiveFormat(format!(
                "unsafe entry path '{entry_path}'"
            )));
        }

        let relative = if self.prefix.is_empty() {
            path
        } else if let Some(rest) = path.strip_prefix(&self.prefix) {
            rest
        } else if path == self.prefix.trim_end_matches('/') {
            ""
        } else {
            return Err(ExecError::ArchiveFormat(format!(
                "entry '{entry_path}' is outside the archive root '{}'",
                self.prefix
            )));
        };

        Ok(relative.trim_end_matches('/').to_string())
    }
}

fn clean(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

/// `/a/b` gives `/a/b`, `/a`, `/`
fn self_and_ancestors(dir: &str) -> Vec<String> {
    if dir == "/" {
        return vec![dir.to_string()];
    }
    let mut dirs = vec![dir.to_string()];
    let mut current = dir;
    while let Some((parent, _)) = current.rsplit_once('/') {
        if parent.is_empty() {
            break;
        }
        dirs.push(parent.to_string());
        current = parent;
    }
    dirs.push("/".to_string());
    dirs
}
