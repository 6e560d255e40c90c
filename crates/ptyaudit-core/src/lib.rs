//! Core library for ptyaudit
//!
//! Everything the preloaded shim needs that does not itself export C symbols:
//! settings, error kinds, the PTY master registry, record rendering, and the
//! log sink with its optional remote transport.

pub mod config;
pub mod error;
pub mod logging;
pub mod pty;
pub mod record;
pub mod sink;
pub mod tracker;

pub use config::{Destination, Settings, LOG_FD};
pub use error::AuditError;
pub use record::Record;
pub use sink::{LogSink, Transport, WriteFn};
pub use tracker::FdTracker;
