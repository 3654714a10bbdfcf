//! SSH transport using the russh crate

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::Msg;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect, Sig, client};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::ExecError;
use crate::result::ConnectionSpec;
use crate::traits::{ChannelEvent, Connector, ExecChannel, Transport};

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Host keys are not pinned (StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// Opens key-authenticated SSH connections
#[derive(Clone)]
pub struct SshConnector {
    config: Arc<client::Config>,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector").finish_non_exhaustive()
    }
}

impl SshConnector {
    /// Connector with russh's default client configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Arc::new(client::Config::default()),
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Transport = SshTransport;

    #[instrument(skip(self, spec, key_path), fields(host = %spec.host))]
    async fn connect(
        &self,
        spec: &ConnectionSpec,
        key_path: &Path,
    ) -> Result<SshTransport, ExecError> {
        let target = spec.target();

        let key_pair = load_secret_key(key_path, None)
            .map_err(|e| ExecError::config(format!("invalid private key: {e}")))?;

        info!(
            host = %spec.host,
            port = spec.port_or_default(),
            user = %spec.user,
            "connecting to SSH"
        );

        let mut session = client::connect(
            self.config.clone(),
            (&spec.host[..], spec.port_or_default()),
            SshClientHandler,
        )
        .await
        .map_err(|e| ExecError::Connection {
            target: target.clone(),
            cause: e.to_string(),
        })?;

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        let auth_res = session
            .authenticate_publickey(
                &spec.user,
                PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
            )
            .await
            .map_err(|e| ExecError::Connection {
                target: target.clone(),
                cause: e.to_string(),
            })?;

        if !auth_res.success() {
            return Err(ExecError::Authentication {
                user: spec.user.clone(),
                host: spec.host.clone(),
                reason: "public key rejected, check your SSH key, username, and host"
                    .to_string(),
            });
        }

        info!(host = %spec.host, "SSH connected and authenticated");

        Ok(SshTransport {
            target,
            handle: session,
            sftp: OnceCell::new(),
        })
    }
}

/// One authenticated SSH connection
///
/// Commands run on fresh session channels; file operations share a single SFTP
/// subsystem channel opened on first use.
pub struct SshTransport {
    /// `user@host:port`
    target: String,
    handle: client::Handle<SshClientHandler>,
    sftp: OnceCell<SftpSession>,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("target", &self.target)
            .field("sftp_open", &self.sftp.initialized())
            .finish_non_exhaustive()
    }
}

impl SshTransport {
    async fn sftp(&self) -> Result<&SftpSession, String> {
        self.sftp
            .get_or_try_init(|| async {
                debug!(remote = %self.target, "opening SFTP subsystem");
                let channel = self
                    .handle
                    .channel_open_session()
                    .await
                    .map_err(|e| e.to_string())?;
                channel
                    .request_subsystem(true, "sftp")
                    .await
                    .map_err(|e| e.to_string())?;
                SftpSession::new(channel.into_stream())
                    .await
                    .map_err(|e| e.to_string())
            })
            .await
    }
}

#[async_trait]
impl Transport for SshTransport {
    #[instrument(skip(self), fields(remote = %self.target))]
    async fn open_exec(&self, command: &str) -> Result<Box<dyn ExecChannel>, ExecError> {
        let rejected = |e: russh::Error| ExecError::ExecutionRejected {
            command: command.to_string(),
            reason: e.to_string(),
        };

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(rejected)?;
        channel.exec(true, command).await.map_err(rejected)?;

        Ok(Box::new(SshExecChannel { channel }))
    }

    #[instrument(skip(self), fields(remote = %self.target))]
    async fn create_dir_all(&self, path: &str) -> Result<(), ExecError> {
        let remote_fs = |cause: String| ExecError::RemoteFs {
            path: path.to_string(),
            cause,
        };
        let sftp = self.sftp().await.map_err(remote_fs)?;

        for dir in ancestors(path) {
            if sftp.try_exists(dir.clone()).await.map_err(|e| remote_fs(e.to_string()))? {
                continue;
            }
            debug!(dir = %dir, "creating remote directory");
            if let Err(e) = sftp.create_dir(dir.clone()).await {
                // Lost a race with another writer
                if !sftp.try_exists(dir).await.unwrap_or(false) {
                    return Err(remote_fs(e.to_string()));
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self, contents), fields(remote = %self.target, bytes = contents.len()))]
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), ExecError> {
        let transfer = |cause: String| ExecError::Transfer {
            path: path.to_string(),
            cause,
        };
        let sftp = self.sftp().await.map_err(transfer)?;

        let mut file = sftp
            .open_with_flags(
                path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| transfer(e.to_string()))?;
        file.write_all(contents)
            .await
            .map_err(|e| transfer(e.to_string()))?;
        file.flush().await.map_err(|e| transfer(e.to_string()))?;
        file.shutdown().await.map_err(|e| transfer(e.to_string()))?;

        Ok(())
    }

    async fn close(&self) -> Result<(), ExecError> {
        if let Some(sftp) = self.sftp.get()
            && let Err(e) = sftp.close().await
        {
            debug!(remote = %self.target, error = %e, "SFTP close failed");
        }

        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| ExecError::Connection {
                target: self.target.clone(),
                cause: e.to_string(),
            })?;
        info!(remote = %self.target, "SSH disconnected");
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "ssh"
    }
}

/// Session channel carrying one `exec` request
struct SshExecChannel {
    channel: Channel<Msg>,
}

#[async_trait]
impl ExecChannel for SshExecChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.channel.wait().await? {
                ChannelMsg::Data { data } => ChannelEvent::Stdout(data.to_vec()),
                ChannelMsg::ExtendedData { data, ext: 1 } => ChannelEvent::Stderr(data.to_vec()),
                ChannelMsg::ExitStatus { exit_status } => ChannelEvent::ExitStatus(exit_status),
                ChannelMsg::ExitSignal {
                    signal_name,
                    core_dumped,
                    ..
                } => ChannelEvent::ExitSignal {
                    name: signal_label(&signal_name),
                    core_dumped,
                },
                ChannelMsg::Failure => ChannelEvent::Rejected,
                ChannelMsg::Eof => ChannelEvent::Eof,
                ChannelMsg::Close => return None,
                _ => continue,
            };
            return Some(event);
        }
    }
}

fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}

/// Every directory from the top of `path` down to `path` itself
///
/// `/srv/app/static` gives `/srv`, `/srv/app`, `/srv/app/static`.
fn ancestors(path: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut current = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        current.push('/');
        current.push_str(part);
        dirs.push(current.clone());
    }
    dirs
}
