//! Command-line arguments and their translation into parameter sets

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use keyhop_content::ContentSource;
use keyhop_core::{Defaults, ExecuteParams, UploadParams};
use keyhop_exec::BatchPolicy;
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "keyhop", version)]
#[command(about = "Run commands and upload files on remote hosts over SSH", long_about = None)]
pub struct Cli {
    /// Config file (default: $KEYHOP_CONFIG, ./keyhop.toml, /etc/keyhop/keyhop.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute commands on a remote host
    #[command(name = "exec")]
    Exec(ExecArgs),
    /// Upload a file or an archive tree to a remote host
    #[command(name = "upload")]
    Upload(UploadArgs),
}

/// Connection flags shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// `host`, `user@host` or `user@host:port`
    #[arg(long)]
    pub host: Option<String>,
    /// Private key file
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,
    /// User when the host address has none
    #[arg(long)]
    pub user: Option<String>,
    /// Port when the host address has none
    #[arg(long)]
    pub port: Option<u16>,
    /// Read the parameter set from a JSON file; flags override its fields
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ExecArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Stop at the first command that does not exit 0
    #[arg(long)]
    pub fail_fast: bool,
    /// Commands to run, in order
    pub commands: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct UploadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// URL, `file://` URL or local path of the content
    #[arg(long)]
    pub content: Option<String>,
    /// Absolute remote path (destination root with --extract)
    #[arg(long)]
    pub path: Option<String>,
    /// Unpack the content as a zip archive under --path
    #[arg(long)]
    pub extract: bool,
}

impl ExecArgs {
    /// Merge flags, the optional params file and config defaults, in that precedence
    ///
    /// # Errors
    /// Returns error if the params file or key file cannot be read
    pub fn into_params(self, defaults: &Defaults) -> Result<ExecuteParams> {
        let mut params: ExecuteParams = read_params(self.connection.params.as_deref())?;
        let connection = self.connection;

        override_with(&mut params.host, connection.host);
        override_with(&mut params.user, connection.user);
        override_with(&mut params.port, connection.port);
        if !self.commands.is_empty() {
            params.commands = Some(serde_json::Value::from(self.commands));
        }
        if self.fail_fast {
            params.policy = Some(BatchPolicy::StopOnFailure);
        }
        override_with(&mut params.private_key, read_key(connection.key.as_deref())?);

        defaults.apply_to_execute(&mut params);
        if params.private_key.is_none() {
            params.private_key = read_key(defaults.key_file.as_deref())?;
        }
        Ok(params)
    }
}

impl UploadArgs {
    /// Merge flags, the optional params file and config defaults, in that precedence
    ///
    /// # Errors
    /// Returns error if the params file or key file cannot be read
    pub fn into_params(self, defaults: &Defaults) -> Result<UploadParams> {
        let mut params: UploadParams = read_params(self.connection.params.as_deref())?;
        let connection = self.connection;

        override_with(&mut params.host, connection.host);
        override_with(&mut params.username, connection.user);
        override_with(&mut params.port, connection.port);
        override_with(&mut params.content, self.content.map(ContentSource::Reference));
        override_with(&mut params.path, self.path);
        if self.extract {
            params.extract = true;
        }
        override_with(&mut params.private_key, read_key(connection.key.as_deref())?);

        defaults.apply_to_upload(&mut params);
        if params.private_key.is_none() {
            params.private_key = read_key(defaults.key_file.as_deref())?;
        }
        Ok(params)
    }
}

fn override_with<T>(field: &mut Option<T>, flag: Option<T>) {
    if flag.is_some() {
        *field = flag;
    }
}

fn read_params<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read params file {}", path.display()))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("failed to parse params file {}", path.display()))
}

fn read_key(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let key = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read private key {}", path.display()))?;
    Ok(Some(key))
}
