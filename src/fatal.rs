//! Fail-closed termination
//!
//! A host must not keep running without a working audit channel. Before
//! aborting, the reason is written to the reserved descriptor as a `fatal`
//! record so the harness can tell causes apart.

use libc::{c_int, c_void, size_t, ssize_t};
use ptyaudit_core::{AuditError, LogSink, Record, LOG_FD};

/// Report `err` on the log channel and abort the process
pub(crate) fn abort(err: &AuditError) -> ! {
    tracing::error!(kind = err.kind(), "ptyaudit cannot start: {}", err);

    // The symbol table may be what failed, so go straight to the kernel
    let sink = LogSink::local(LOG_FD, raw_write);
    let message = err.to_string();
    let _ = sink.emit(&Record::Fatal {
        kind: err.kind(),
        message: &message,
    });

    std::process::abort()
}

unsafe extern "C" fn raw_write(fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
    libc::syscall(libc::SYS_write, fd, buf, count) as ssize_t
}
