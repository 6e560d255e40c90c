//! Error kinds surfaced by the audit layer.
//!
//! Every variant maps to a stable, hyphenated kind name so that a fatal report
//! written to the log channel can be told apart by the harness.

use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Error type for audit layer operations
#[derive(Debug, Error)]
pub enum AuditError {
    /// A libc function could not be found further down the load chain
    #[error("failed to resolve symbol `{symbol}`: {reason}")]
    SymbolResolution { symbol: String, reason: String },

    /// The remote destination string is malformed
    #[error("invalid log destination `{value}`: {reason}")]
    InvalidDestination { value: String, reason: &'static str },

    /// The remote collector could not be reached
    #[error("failed to connect to log collector {destination}: {source}")]
    Connect {
        destination: String,
        #[source]
        source: io::Error,
    },

    /// The connected socket could not be moved onto the reserved descriptor
    #[error("failed to place log socket on descriptor {fd}: {source}")]
    LogChannel {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// A negative value was offered to the descriptor tracker
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(RawFd),
}

impl AuditError {
    /// Stable kind name used in fatal reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SymbolResolution { .. } => "symbol-resolution",
            Self::InvalidDestination { .. } => "invalid-destination",
            Self::Connect { .. } => "remote-connect",
            Self::LogChannel { .. } => "log-channel",
            Self::InvalidDescriptor(_) => "invalid-descriptor",
        }
    }

    /// Whether the error must terminate the host process
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidDescriptor(_))
    }
}
