//! Staging of private key material for a single connection attempt

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

/// Private key bytes written to a 0600 temp file
///
/// The file lives exactly as long as this value: [`StagedKey::erase`] removes it
/// explicitly, and `Drop` removes it if the owner never did.
#[derive(Debug)]
pub struct StagedKey {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl StagedKey {
    /// Write `key_data` to a fresh, owner-only temp file
    ///
    /// # Errors
    /// Returns `KeyError::Empty` for empty key material and `KeyError::Io` if the file
    /// cannot be written.
    pub fn stage(key_data: &[u8]) -> Result<Self, KeyError> {
        if key_data.iter().all(u8::is_ascii_whitespace) {
            return Err(KeyError::Empty);
        }

        let mut file = tempfile::Builder::new()
            .prefix("keyhop_ssh_key_")
            .tempfile()?;
        file.write_all(key_data)?;
        file.flush()?;
        restrict_permissions(file.path())?;

        let temp = file.into_temp_path();
        let path = temp.to_path_buf();

        debug!(path = %path.display(), "staged private key");

        Ok(Self {
            path,
            temp: Some(temp),
        })
    }

    /// Location of the staged key
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the key file has already been removed
    #[must_use]
    pub fn is_erased(&self) -> bool {
        self.temp.is_none()
    }

    /// Remove the key file. Calling this more than once is a no-op.
    ///
    /// # Errors
    /// Returns the I/O error if the file exists but could not be removed
    pub fn erase(&mut self) -> std::io::Result<()> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };

        match temp.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "erased staged private key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StagedKey {
    fn drop(&mut self) {
        if let Err(e) = self.erase() {
            warn!(path = %self.path.display(), error = %e, "failed to remove staged key");
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Key staging errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("private key is empty")]
    Empty,

    #[error("failed to set up private key: {0}")]
    Io(#[from] std::io::Error),
}
