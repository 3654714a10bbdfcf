//! Raw parameter sets and their validation
//!
//! Parameters arrive loosely typed (every field optional, `commands` as arbitrary JSON).
//! `prepare` checks them and produces a request that is ready to connect with. All
//! failures here are `ExecError::Config` and happen before any network activity.

use keyhop_content::ContentSource;
use keyhop_exec::upload::{validate_destination_root, validate_file_destination};
use keyhop_exec::{BatchPolicy, ConnectionSpec, ExecError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of the `execute` operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteParams {
    /// `host`, `user@host` or `user@host:port`
    pub host: Option<String>,
    /// Port used when the address carries none
    pub port: Option<u16>,
    /// User used when the address carries none
    pub user: Option<String>,
    /// Private key in OpenSSH or PEM format
    pub private_key: Option<String>,
    /// JSON array of command strings
    pub commands: Option<Value>,
    /// What to do after a command fails (`RunAll` when unset)
    #[serde(default)]
    pub policy: Option<BatchPolicy>,
}

/// A validated `execute` request
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub spec: ConnectionSpec,
    pub commands: Vec<String>,
    pub policy: BatchPolicy,
}

impl ExecuteParams {
    /// Validate the parameters
    ///
    /// # Errors
    /// Returns `ExecError::Config` for a missing host or private key, a missing or empty
    /// command list, any command that is not a string, or an unresolvable address.
    pub fn prepare(self) -> Result<ExecuteRequest, ExecError> {
        let host = required(self.host, "host")?;
        let private_key = required(self.private_key, "private key")?;
        let commands = command_list(self.commands)?;

        let spec =
            ConnectionSpec::from_address(&host, self.user.as_deref(), self.port, private_key)?;
        spec.validate()?;

        Ok(ExecuteRequest {
            spec,
            commands,
            policy: self.policy.unwrap_or_default(),
        })
    }
}

/// Parameters of the `upload` operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadParams {
    /// `host`, `user@host` or `user@host:port`
    pub host: Option<String>,
    /// Port used when the address carries none
    pub port: Option<u16>,
    /// User used when the address carries none
    pub username: Option<String>,
    /// Private key in OpenSSH or PEM format
    pub private_key: Option<String>,
    /// What to upload
    pub content: Option<ContentSource>,
    /// Absolute remote file path, or destination root when `extract` is set
    pub path: Option<String>,
    /// Treat the content as a zip archive and recreate its tree under `path`
    #[serde(default)]
    pub extract: bool,
}

/// A validated `upload` request
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub spec: ConnectionSpec,
    pub content: ContentSource,
    pub path: String,
    pub extract: bool,
}

impl UploadParams {
    /// Validate the parameters
    ///
    /// # Errors
    /// Returns `ExecError::Config` for a missing host, private key, content or path, a
    /// path that is not absolute (or names a directory for a single-file upload), or an
    /// unresolvable address.
    pub fn prepare(self) -> Result<UploadRequest, ExecError> {
        let host = required(self.host, "host")?;
        let private_key = required(self.private_key, "private key")?;
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ExecError::config("content is required"))?;
        let path = required(self.path, "path")?;

        if self.extract {
            validate_destination_root(&path)?;
        } else {
            validate_file_destination(&path)?;
        }

        let spec =
            ConnectionSpec::from_address(&host, self.username.as_deref(), self.port, private_key)?;
        spec.validate()?;

        Ok(UploadRequest {
            spec,
            content,
            path,
            extract: self.extract,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ExecError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ExecError::config(format!("{name} is required")))
}

fn command_list(commands: Option<Value>) -> Result<Vec<String>, ExecError> {
    let Some(Value::Array(items)) = commands else {
        return Err(ExecError::config("commands must be a list of strings"));
    };
    if items.is_empty() {
        return Err(ExecError::config("commands must not be empty"));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(command) => Ok(command),
            other => Err(ExecError::config(format!(
                "command {i} is not a string: {other}"
            ))),
        })
        .collect()
}
