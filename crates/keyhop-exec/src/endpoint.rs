//! Parsing of combined `user@host:port` addresses

use crate::error::ExecError;

/// Port used when neither the address nor the caller names one
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Discrete connection parameters parsed from an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP literal (IPv6 without brackets)
    pub host: String,
    /// Explicit port, if the address carried one
    pub port: Option<u16>,
    /// User, if the address carried one
    pub user: Option<String>,
}

impl Endpoint {
    /// Parse `[ssh://][user@]host[:port]`
    ///
    /// IPv6 literals with a port must be bracketed (`[::1]:2222`); a bare IPv6 literal
    /// is taken as the host with no port.
    ///
    /// # Errors
    /// Returns `ExecError::Config` if no host can be parsed or the port is not in
    /// `1..=65535`.
    pub fn resolve(address: &str) -> Result<Self, ExecError> {
        let trimmed = address.trim();
        let rest = trimmed.strip_prefix("ssh://").unwrap_or(trimmed);
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.is_empty() {
            return Err(ExecError::config("host is required"));
        }
        if rest.contains(char::is_whitespace) || rest.contains('/') {
            return Err(ExecError::config(format!(
                "couldn't parse host address '{address}'"
            )));
        }

        let (user, host_port) = match rest.rsplit_once('@') {
            Some(("", _)) => {
                return Err(ExecError::config(format!(
                    "empty user in host address '{address}'"
                )));
            }
            Some((user, host_port)) => (Some(user.to_string()), host_port),
            None => (None, rest),
        };

        let (host, port) = split_host_port(host_port, address)?;

        if host.is_empty() {
            return Err(ExecError::config(format!(
                "host variable must specify a host address, got '{address}'"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            user,
        })
    }

    /// Port to dial, falling back to [`DEFAULT_SSH_PORT`]
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }
}

fn split_host_port<'a>(
    host_port: &'a str,
    address: &str,
) -> Result<(&'a str, Option<u16>), ExecError> {
    if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, tail) = bracketed.split_once(']').ok_or_else(|| {
            ExecError::config(format!("unterminated IPv6 literal in '{address}'"))
        })?;
        return match tail {
            "" => Ok((host, None)),
            _ => match tail.strip_prefix(':') {
                Some(port) => Ok((host, Some(parse_port(port, address)?))),
                None => Err(ExecError::config(format!(
                    "couldn't parse host address '{address}'"
                ))),
            },
        };
    }

    // More than one colon without brackets can only be a bare IPv6 literal
    if host_port.matches(':').count() > 1 {
        return Ok((host_port, None));
    }

    match host_port.split_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port, address)?))),
        None => Ok((host_port, None)),
    }
}

fn parse_port(port: &str, address: &str) -> Result<u16, ExecError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ExecError::config(format!(
            "port must be a positive integer in '{address}'"
        ))),
        Ok(port) => Ok(port),
    }
}
