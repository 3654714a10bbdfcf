//! keyhop-exec: Remote execution and upload over SSH
//!
//! Opens one key-authenticated SSH session per operation, runs commands on it with
//! stdout/stderr/exit status captured separately, and replicates file trees to the
//! remote filesystem over SFTP.

pub mod endpoint;
pub mod error;
pub mod events;
pub mod executor;
pub mod keys;
pub mod result;
pub mod session;
pub mod ssh;
pub mod text;
pub mod traits;
pub mod upload;

pub use endpoint::{DEFAULT_SSH_PORT, Endpoint};
pub use error::{ErrorKind, ExecError};
pub use events::{OutputStream, ProgressEvent, ProgressSink};
pub use executor::{BatchPolicy, execute, execute_all};
pub use keys::StagedKey;
pub use result::{CommandResult, ConnectionSpec, UploadEntry, UploadSummary};
pub use session::{with_session, with_session_using};
pub use ssh::{SshConnector, SshTransport};
pub use traits::{ChannelEvent, Connector, ExecChannel, Transport};
pub use upload::{ArchiveRoot, upload_file, upload_tree};
