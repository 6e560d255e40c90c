//! Interceptor bodies
//!
//! Each hook calls the original first and hands its result back untouched.
//! Observation happens afterwards: tracking PTY masters and emitting records,
//! both only when the original succeeded. `errno` from the original is put
//! back before returning.

mod guard;

use std::ffi::CStr;
use std::os::fd::RawFd;

use libc::{c_char, c_int, c_void, iovec, mode_t, pid_t, size_t, ssize_t, termios, winsize};
use ptyaudit_core::{pty, Record, LOG_FD};

use crate::context::AuditContext;
use crate::symbols::{self, Symbols};

use guard::{HookScope, SavedErrno};

/// Run `observed` if the audit layer is ready on this thread, else `direct`
///
/// `direct` is taken before the context exists and for calls nested inside
/// another hook on the same thread.
pub(crate) fn dispatch<R>(
    observed: impl FnOnce(&Hooks<'_>) -> R,
    direct: impl FnOnce(&Symbols) -> R,
) -> R {
    let libc = symbols::resolved();
    let Some(_scope) = HookScope::enter() else {
        return direct(libc);
    };
    match AuditContext::get() {
        Some(context) => observed(&Hooks::new(libc, context)),
        None => direct(libc),
    }
}

/// Pass-through `close` that still protects the log channel
pub(crate) unsafe fn close_direct(libc: &Symbols, fd: c_int) -> c_int {
    if fd == LOG_FD {
        return 0;
    }
    (libc.close)(fd)
}

/// Interceptors bound to a symbol table and a context
pub(crate) struct Hooks<'a> {
    libc: &'a Symbols,
    context: &'a AuditContext,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(libc: &'a Symbols, context: &'a AuditContext) -> Self {
        Self { libc, context }
    }

    pub(crate) unsafe fn open(&self, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
        let fd = (self.libc.open)(path, flags, mode);
        self.observe_open(fd, path, |path| Record::Open { path });
        fd
    }

    pub(crate) unsafe fn open64(&self, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
        let fd = (self.libc.open64)(path, flags, mode);
        self.observe_open(fd, path, |path| Record::Open { path });
        fd
    }

    pub(crate) unsafe fn openat(
        &self,
        dir: c_int,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> c_int {
        let fd = (self.libc.openat)(dir, path, flags, mode);
        self.observe_open(fd, path, |path| Record::Openat { path });
        fd
    }

    pub(crate) unsafe fn openat64(
        &self,
        dir: c_int,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> c_int {
        let fd = (self.libc.openat64)(dir, path, flags, mode);
        self.observe_open(fd, path, |path| Record::Openat { path });
        fd
    }

    /// `close`, except on the log channel, which reports success and stays open
    pub(crate) unsafe fn close(&self, fd: c_int) -> c_int {
        if fd == self.context.sink.fd() {
            return 0;
        }
        // Forget first so a reused number is never mistaken for the old master
        self.context.tracker.unregister(fd);
        (self.libc.close)(fd)
    }

    pub(crate) unsafe fn getpt(&self) -> c_int {
        let fd = (self.libc.getpt)();
        if fd >= 0 {
            self.observe_master(fd, &Record::Getpt { master: fd });
        }
        fd
    }

    pub(crate) unsafe fn posix_openpt(&self, flags: c_int) -> c_int {
        let fd = (self.libc.posix_openpt)(flags);
        if fd >= 0 {
            self.observe_master(fd, &Record::PosixOpenpt { master: fd });
        }
        fd
    }

    pub(crate) unsafe fn openpty(
        &self,
        master: *mut c_int,
        slave: *mut c_int,
        name: *mut c_char,
        termp: *const termios,
        winp: *const winsize,
    ) -> c_int {
        let ret = (self.libc.openpty)(master, slave, name, termp, winp);
        if ret == 0 && !master.is_null() && !slave.is_null() {
            let name = c_bytes(name);
            self.observe_master(
                *master,
                &Record::Openpty {
                    master: *master,
                    slave: *slave,
                    name,
                },
            );
        }
        ret
    }

    /// `forkpty`; only the parent records, the child never saw the master
    pub(crate) unsafe fn forkpty(
        &self,
        master: *mut c_int,
        name: *mut c_char,
        termp: *const termios,
        winp: *const winsize,
    ) -> pid_t {
        let child = {
            let _hold = self.context.tracker.hold();
            (self.libc.forkpty)(master, name, termp, winp)
        };
        if child > 0 && !master.is_null() {
            let name = c_bytes(name);
            self.observe_master(
                *master,
                &Record::Forkpty {
                    child,
                    master: *master,
                    name,
                },
            );
        }
        child
    }

    pub(crate) unsafe fn write(&self, fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
        let ret = (self.libc.write)(fd, buf, count);
        if ret > 0 && !buf.is_null() && self.context.tracker.contains(fd) {
            let saved = SavedErrno::save();
            let written = (ret as usize).min(count);
            let chunks = [std::slice::from_raw_parts(buf.cast::<u8>(), written)];
            self.emit(&Record::Write { fd, chunks: &chunks });
            saved.restore();
        }
        ret
    }

    pub(crate) unsafe fn writev(&self, fd: c_int, iov: *const iovec, iovcnt: c_int) -> ssize_t {
        let ret = (self.libc.writev)(fd, iov, iovcnt);
        if ret > 0 && !iov.is_null() && self.context.tracker.contains(fd) {
            let saved = SavedErrno::save();
            let chunks = written_chunks(iov, iovcnt, ret as usize);
            self.emit(&Record::Writev {
                fd,
                chunks: &chunks,
            });
            saved.restore();
        }
        ret
    }

    /// `fork`; the parent records the child, the child records nothing
    pub(crate) unsafe fn fork(&self) -> pid_t {
        let child = {
            let _hold = self.context.tracker.hold();
            (self.libc.fork)()
        };
        if child > 0 {
            let saved = SavedErrno::save();
            self.emit(&Record::Fork { child });
            saved.restore();
        }
        child
    }

    unsafe fn observe_open(
        &self,
        fd: c_int,
        path: *const c_char,
        record: impl for<'p> FnOnce(&'p [u8]) -> Record<'p>,
    ) {
        if fd < 0 {
            return;
        }
        let Some(path) = c_bytes(path) else {
            return;
        };
        if pty::is_multiplexer_path(path) {
            self.observe_master(fd, &record(path));
        }
    }

    /// Track a freshly created master and log its creation
    fn observe_master(&self, fd: RawFd, record: &Record<'_>) {
        let saved = SavedErrno::save();
        if fd == self.context.sink.fd() {
            tracing::warn!("Master landed on the log channel fd {}; not tracking", fd);
        } else if let Err(e) = self.context.tracker.register(fd) {
            tracing::warn!("Failed to track master: {}", e);
        }
        self.emit(record);
        saved.restore();
    }

    fn emit(&self, record: &Record<'_>) {
        if let Err(e) = self.context.sink.emit(record) {
            tracing::debug!("Failed to emit {} record: {}", record.event(), e);
        }
    }
}

/// Bytes of a NUL-terminated string, or `None` for a null pointer
unsafe fn c_bytes<'p>(ptr: *const c_char) -> Option<&'p [u8]> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_bytes())
    }
}

/// The first `total` bytes spread over `iov`, one slice per touched buffer
unsafe fn written_chunks<'p>(iov: *const iovec, iovcnt: c_int, mut total: usize) -> Vec<&'p [u8]> {
    let count = iovcnt.max(0) as usize;
    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        if total == 0 {
            break;
        }
        let entry = &*iov.add(i);
        let len = entry.iov_len.min(total);
        if len > 0 && !entry.iov_base.is_null() {
            chunks.push(std::slice::from_raw_parts(entry.iov_base.cast::<u8>(), len));
        }
        total -= len;
    }
    chunks
}
