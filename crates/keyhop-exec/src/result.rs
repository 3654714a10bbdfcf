//! Result and parameter types for remote execution

use serde::{Deserialize, Serialize};

use crate::endpoint::{DEFAULT_SSH_PORT, Endpoint};
use crate::error::ExecError;

/// Result of one remote command
///
/// Exit status is data: a non-zero code or a signal is reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Command as submitted
    pub command: String,
    /// stdout, normalized and split into lines
    pub stdout: Vec<String>,
    /// stderr, normalized and split into lines
    pub stderr: Vec<String>,
    /// Exit code, when the process exited normally
    pub exit_code: Option<i32>,
    /// POSIX signal number, when the process was killed by a known signal
    pub exit_signal: Option<i32>,
    /// Signal name as reported by the server (e.g. `KILL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
    /// Why the server refused to start the command, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Whether the server sent any exit notification before closing the channel
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.exit_code.is_some() || self.signal_name.is_some()
    }

    /// Result for a command the server refused to start
    #[must_use]
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            exit_signal: None,
            signal_name: None,
            rejected: Some(reason.into()),
        }
    }
}

/// Map an SSH signal name (`TERM`, `SIGTERM`) to its POSIX number
#[must_use]
pub fn signal_number(name: &str) -> Option<i32> {
    let name = name.strip_prefix("SIG").unwrap_or(name);
    let number = match name {
        "HUP" => 1,
        "INT" => 2,
        "QUIT" => 3,
        "ILL" => 4,
        "TRAP" => 5,
        "ABRT" => 6,
        "BUS" => 7,
        "FPE" => 8,
        "KILL" => 9,
        "USR1" => 10,
        "SEGV" => 11,
        "USR2" => 12,
        "PIPE" => 13,
        "ALRM" => 14,
        "TERM" => 15,
        _ => return None,
    };
    Some(number)
}

/// Everything needed to open one authenticated session
#[derive(Clone)]
pub struct ConnectionSpec {
    /// Host address
    pub host: String,
    /// Port (transport default when `None`)
    pub port: Option<u16>,
    /// Username
    pub user: String,
    /// Private key, PEM/OpenSSH encoded
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSpec")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ConnectionSpec {
    /// Create new connection spec
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        private_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: user.into(),
            private_key: private_key.into(),
        }
    }

    /// Build a spec from a combined address plus separately supplied fallbacks
    ///
    /// User and port found in `address` take precedence over `user` and `port`.
    ///
    /// # Errors
    /// Returns `ExecError::Config` if the address cannot be parsed or no user can be
    /// resolved from either source.
    pub fn from_address(
        address: &str,
        user: Option<&str>,
        port: Option<u16>,
        private_key: impl Into<Vec<u8>>,
    ) -> Result<Self, ExecError> {
        let endpoint = Endpoint::resolve(address)?;

        let user = endpoint
            .user
            .or_else(|| user.map(str::to_string))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ExecError::config("user is required in host address"))?;

        Ok(Self {
            host: endpoint.host,
            port: endpoint.port.or(port),
            user,
            private_key: private_key.into(),
        })
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Port to dial
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// `user@host:port`, used in logs and error messages
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port_or_default())
    }

    /// Check the invariants that must hold before connecting
    ///
    /// # Errors
    /// Returns `ExecError::Config` for an empty host, user or private key
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.host.trim().is_empty() {
            return Err(ExecError::config("host is required"));
        }
        if self.user.trim().is_empty() {
            return Err(ExecError::config("user is required in host address"));
        }
        if self.private_key.iter().all(u8::is_ascii_whitespace) {
            return Err(ExecError::config("private key is required"));
        }
        if self.port == Some(0) {
            return Err(ExecError::config("port must be a positive integer"));
        }
        Ok(())
    }
}

/// One file or directory record extracted from an archive
#[derive(Clone, PartialEq, Eq)]
pub struct UploadEntry {
    /// Path inside the archive, `/`-separated
    pub relative_path: String,
    /// Directory entries carry no content
    pub is_directory: bool,
    /// File bytes (empty for directories)
    pub content: Vec<u8>,
}

impl std::fmt::Debug for UploadEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadEntry")
            .field("relative_path", &self.relative_path)
            .field("is_directory", &self.is_directory)
            .field("len", &self.content.len())
            .finish()
    }
}

impl UploadEntry {
    /// File entry
    pub fn file(relative_path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            is_directory: false,
            content: content.into(),
        }
    }

    /// Directory entry
    pub fn directory(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            is_directory: true,
            content: Vec::new(),
        }
    }
}

/// Outcome of a completed tree upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Remote paths written, in archive order
    pub files: Vec<String>,
    /// Distinct remote directories ensured
    pub directories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: Option<i32>, signal: Option<&str>) -> CommandResult {
        CommandResult {
            command: "true".to_string(),
            stdout: vec![],
            stderr: vec![],
            exit_code,
            exit_signal: signal.and_then(signal_number),
            signal_name: signal.map(str::to_string),
            rejected: None,
        }
    }

    #[test]
    fn test_success_requires_zero_exit() {
        assert!(result(Some(0), None).success());
        assert!(!result(Some(1), None).success());
        assert!(!result(None, Some("KILL")).success());
        assert!(!result(None, None).success());
    }

    #[test]
    fn test_rejected_result_is_failed_and_incomplete() {
        let rejected = CommandResult::rejected("reboot", "administratively prohibited");
        assert!(!rejected.success());
        assert!(!rejected.is_complete());
        assert_eq!(rejected.rejected.as_deref(), Some("administratively prohibited"));

        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["rejected"], "administratively prohibited");
        let exited = serde_json::to_value(result(Some(0), None)).unwrap();
        assert!(exited.get("rejected").is_none());
    }

    #[test]
    fn test_incomplete_without_exit_notice() {
        assert!(!result(None, None).is_complete());
        assert!(result(None, Some("TERM")).is_complete());
    }

    #[test]
    fn test_signal_numbers() {
        assert_eq!(signal_number("KILL"), Some(9));
        assert_eq!(signal_number("SIGTERM"), Some(15));
        assert_eq!(signal_number("WINCH"), None);
    }

    #[test]
    fn test_from_address_prefers_address_user() {
        let spec =
            ConnectionSpec::from_address("root@host:2222", Some("deploy"), Some(22), "k").unwrap();
        assert_eq!(spec.user, "root");
        assert_eq!(spec.port, Some(2222));
    }

    #[test]
    fn test_from_address_falls_back_to_fields() {
        let spec = ConnectionSpec::from_address("host", Some("deploy"), Some(2200), "k").unwrap();
        assert_eq!(spec.user, "deploy");
        assert_eq!(spec.port, Some(2200));
        assert_eq!(spec.target(), "deploy@host:2200");
    }

    #[test]
    fn test_from_address_requires_user() {
        let err = ConnectionSpec::from_address("host", None, None, "k").unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        let spec = ConnectionSpec::new("host", "root", Vec::new());
        assert!(matches!(spec.validate(), Err(ExecError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let spec = ConnectionSpec::new("host", "root", "secret-key-bytes");
        assert!(!format!("{spec:?}").contains("secret-key-bytes"));
    }

    #[test]
    fn test_result_serializes_without_signal_name() {
        let json = serde_json::to_value(result(Some(0), None)).unwrap();
        assert_eq!(json["exit_code"], 0);
        assert!(json["exit_signal"].is_null());
        assert!(json.get("signal_name").is_none());
    }
}
