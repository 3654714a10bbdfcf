//! Transport seams
//!
//! [`Connector`] opens a [`Transport`]; a transport opens one [`ExecChannel`] per command
//! and performs file operations. The SSH implementation lives in [`crate::ssh`].

use std::path::Path;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::ConnectionSpec;

/// One message delivered on an execution channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Bytes on standard output
    Stdout(Vec<u8>),
    /// Bytes on standard error (extended data type 1)
    Stderr(Vec<u8>),
    /// Process exited normally
    ExitStatus(u32),
    /// Process was killed by a signal
    ExitSignal {
        /// Signal name without the `SIG` prefix
        name: String,
        /// Whether the server reported a core dump
        core_dumped: bool,
    },
    /// Server refused the exec request
    Rejected,
    /// Server will send no more data; the channel may still deliver exit notices
    Eof,
}

/// A channel bound to one command
#[async_trait]
pub trait ExecChannel: Send {
    /// Wait for the next event; `None` once the channel has closed
    async fn next_event(&mut self) -> Option<ChannelEvent>;
}

/// An open, authenticated connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a channel and request execution of `command` on it
    async fn open_exec(&self, command: &str) -> Result<Box<dyn ExecChannel>, ExecError>;

    /// Create `path` and any missing ancestors; existing directories are not an error
    async fn create_dir_all(&self, path: &str) -> Result<(), ExecError>;

    /// Create or truncate `path` and write `contents` to it
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), ExecError>;

    /// Close the connection
    async fn close(&self) -> Result<(), ExecError>;

    fn transport_type(&self) -> &'static str;
}

/// Opens transports for a [`ConnectionSpec`]
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Connect and authenticate with the staged key at `key_path`
    async fn connect(
        &self,
        spec: &ConnectionSpec,
        key_path: &Path,
    ) -> Result<Self::Transport, ExecError>;
}
