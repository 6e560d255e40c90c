//! Process-wide audit state
//!
//! Created once by the load hook and never replaced. Interceptors that run
//! before it exists pass calls through untouched.

use once_cell::sync::OnceCell;
use ptyaudit_core::{logging, AuditError, FdTracker, LogSink, Settings, LOG_FD};

use crate::fatal;
use crate::symbols::{self, Symbols};

static CONTEXT: OnceCell<AuditContext> = OnceCell::new();

/// Tracked masters plus the sink records go to
#[derive(Debug)]
pub(crate) struct AuditContext {
    pub tracker: FdTracker,
    pub sink: LogSink,
}

impl AuditContext {
    pub(crate) fn new(sink: LogSink) -> Self {
        Self {
            tracker: FdTracker::new(),
            sink,
        }
    }

    /// Build the context described by `settings`
    pub(crate) fn from_settings(settings: &Settings, libc: &Symbols) -> Result<Self, AuditError> {
        let sink = LogSink::open(settings.remote.as_ref(), LOG_FD, libc.write)?;
        Ok(Self::new(sink))
    }

    /// The installed context, if the load hook has finished
    pub(crate) fn get() -> Option<&'static AuditContext> {
        CONTEXT.get()
    }

    /// Close and forget every tracked master, returning how many were closed
    pub(crate) fn drain(&self, libc: &Symbols) -> usize {
        let fds = self.tracker.drain();
        for &fd in &fds {
            // SAFETY: plain descriptor close through the original
            if unsafe { (libc.close)(fd) } == -1 {
                tracing::debug!(
                    "Tracked master {} already gone: {}",
                    fd,
                    std::io::Error::last_os_error()
                );
            }
        }
        fds.len()
    }
}

/// Load hook: resolve originals, read settings, open the sink
///
/// Any failure aborts the process.
pub(crate) fn initialize() {
    let libc = symbols::resolved();
    let settings = Settings::from_env().unwrap_or_else(|e| fatal::abort(&e));
    logging::setup_logging(settings.debug);

    let context = AuditContext::from_settings(&settings, libc).unwrap_or_else(|e| fatal::abort(&e));
    tracing::debug!(
        "ptyaudit active in pid {} ({:?} transport on fd {})",
        std::process::id(),
        context.sink.transport(),
        context.sink.fd()
    );
    if CONTEXT.set(context).is_err() {
        tracing::warn!("ptyaudit initialized twice; keeping the first context");
    }
}

/// Unload hook: release every descriptor still tracked
pub(crate) fn shutdown() {
    if let Some(context) = AuditContext::get() {
        let closed = context.drain(symbols::resolved());
        tracing::debug!("ptyaudit unloading; closed {} tracked masters", closed);
    }
}
