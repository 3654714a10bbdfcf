//! Operator defaults applied to incoming parameter sets

use std::path::PathBuf;

use keyhop_exec::BatchPolicy;
use serde::{Deserialize, Serialize};

use crate::params::{ExecuteParams, UploadParams};

/// Fallbacks for fields a caller left out
///
/// Explicit parameters always win over these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// SSH user when neither the address nor the parameters name one
    pub user: Option<String>,
    /// SSH port when neither the address nor the parameters name one
    pub port: Option<u16>,
    /// Local private key file read when no key is supplied
    pub key_file: Option<PathBuf>,
    /// Stop a command batch at the first failing command
    #[serde(default)]
    pub fail_fast: bool,
}

impl Defaults {
    /// Fill unset fields of `params`
    pub fn apply_to_execute(&self, params: &mut ExecuteParams) {
        if params.user.is_none() {
            params.user.clone_from(&self.user);
        }
        if params.port.is_none() {
            params.port = self.port;
        }
        if params.policy.is_none() && self.fail_fast {
            params.policy = Some(BatchPolicy::StopOnFailure);
        }
    }

    /// Fill unset fields of `params`
    pub fn apply_to_upload(&self, params: &mut UploadParams) {
        if params.username.is_none() {
            params.username.clone_from(&self.user);
        }
        if params.port.is_none() {
            params.port = self.port;
        }
    }
}
