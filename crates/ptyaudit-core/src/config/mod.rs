//! Settings for the audit layer
//!
//! The shim is configured entirely from the environment of the host process,
//! read once when the library is loaded.

use std::fmt;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::error::AuditError;

/// Reserved descriptor carrying the audit log
pub const LOG_FD: RawFd = 100;

/// Environment variable selecting remote log shipping (`host:port`)
pub const REMOTE_ENV: &str = "PTYAUDIT_REMOTE";

/// Environment variable enabling diagnostic output on stderr
pub const DEBUG_ENV: &str = "PTYAUDIT_DEBUG";

/// Upper bound on each connection attempt to the collector
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings resolved from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Remote collector; `None` keeps logging on the local reserved descriptor
    pub remote: Option<Destination>,
    /// Emit diagnostics through tracing
    pub debug: bool,
}

impl Settings {
    /// Read settings from the process environment
    ///
    /// An unset or empty destination means local logging. A destination that
    /// is present but malformed is an error, never a silent fallback.
    pub fn from_env() -> Result<Self, AuditError> {
        let remote = match std::env::var(REMOTE_ENV) {
            Ok(value) if !value.trim().is_empty() => Some(Destination::parse(&value)?),
            _ => None,
        };
        let debug = std::env::var(DEBUG_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Ok(Self { remote, debug })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Remote collector address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Host name or address literal (IPv6 without brackets)
    pub host: String,
    /// TCP port, never zero
    pub port: u16,
}

impl Destination {
    /// Parse a `host:port` string
    ///
    /// The host ends at the first colon unless it is a bracketed IPv6
    /// literal such as `[::1]:514`.
    pub fn parse(value: &str) -> Result<Self, AuditError> {
        let invalid = |reason| AuditError::InvalidDestination {
            value: value.to_string(),
            reason,
        };
        let value_trimmed = value.trim();

        let (host, port) = if let Some(rest) = value_trimmed.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            value_trimmed
                .split_once(':')
                .ok_or_else(|| invalid("missing port"))?
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("port is not a number"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("port out of range"))?;
        if port == 0 {
            return Err(invalid("port must be positive"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
