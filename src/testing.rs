//! Fake originals for exercising interceptors without touching real PTYs
//!
//! Behaviour is configured per thread so tests can run in parallel.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::fd::{IntoRawFd, RawFd};

use libc::{c_char, c_int, c_void, iovec, mode_t, pid_t, size_t, ssize_t, termios, winsize};
use ptyaudit_core::LogSink;

use crate::context::AuditContext;
use crate::symbols::Symbols;

/// What the fake originals return and what they saw
#[derive(Debug, Clone)]
pub(crate) struct Fake {
    /// Result of open/openat/getpt/posix_openpt
    pub fd: c_int,
    /// Result of openpty/forkpty and the values they store
    pub pty_result: c_int,
    pub master: c_int,
    pub slave: c_int,
    pub name: Option<CString>,
    /// `None` reports everything as written
    pub written: Option<ssize_t>,
    pub fork_result: pid_t,
    pub close_result: c_int,
    /// errno set whenever a fake reports failure
    pub errno: c_int,
    pub closed: Vec<c_int>,
    pub calls: Vec<&'static str>,
}

impl Default for Fake {
    fn default() -> Self {
        Self {
            fd: 10,
            pty_result: 0,
            master: 11,
            slave: 12,
            name: Some(CString::new("/dev/pts/3").unwrap()),
            written: None,
            fork_result: 4000,
            close_result: 0,
            errno: libc::EIO,
            closed: Vec::new(),
            calls: Vec::new(),
        }
    }
}

thread_local! {
    static FAKE: RefCell<Fake> = RefCell::new(Fake::default());
}

/// Replace this thread's fake configuration
pub(crate) fn configure(fake: Fake) {
    FAKE.with(|f| *f.borrow_mut() = fake);
}

/// Snapshot of this thread's fake state
pub(crate) fn state() -> Fake {
    FAKE.with(|f| f.borrow().clone())
}

fn record_call(name: &'static str) -> Fake {
    FAKE.with(|f| {
        let mut f = f.borrow_mut();
        f.calls.push(name);
        f.clone()
    })
}

fn fail_if_negative<T: PartialOrd + Default>(value: T, errno: c_int) -> T {
    if value < T::default() {
        unsafe { *libc::__errno_location() = errno };
    }
    value
}

unsafe extern "C" fn fake_open(_path: *const c_char, _flags: c_int, _mode: mode_t) -> c_int {
    let f = record_call("open");
    fail_if_negative(f.fd, f.errno)
}

unsafe extern "C" fn fake_open64(_path: *const c_char, _flags: c_int, _mode: mode_t) -> c_int {
    let f = record_call("open64");
    fail_if_negative(f.fd, f.errno)
}

unsafe extern "C" fn fake_openat(
    _dir: c_int,
    _path: *const c_char,
    _flags: c_int,
    _mode: mode_t,
) -> c_int {
    let f = record_call("openat");
    fail_if_negative(f.fd, f.errno)
}

unsafe extern "C" fn fake_openat64(
    _dir: c_int,
    _path: *const c_char,
    _flags: c_int,
    _mode: mode_t,
) -> c_int {
    let f = record_call("openat64");
    fail_if_negative(f.fd, f.errno)
}

unsafe extern "C" fn fake_close(fd: c_int) -> c_int {
    record_call("close");
    let f = FAKE.with(|f| {
        let mut f = f.borrow_mut();
        f.closed.push(fd);
        f.clone()
    });
    fail_if_negative(f.close_result, f.errno)
}

unsafe extern "C" fn fake_getpt() -> c_int {
    let f = record_call("getpt");
    fail_if_negative(f.fd, f.errno)
}

unsafe extern "C" fn fake_posix_openpt(_flags: c_int) -> c_int {
    let f = record_call("posix_openpt");
    fail_if_negative(f.fd, f.errno)
}

unsafe fn store_name(name: *mut c_char, f: &Fake) {
    if let (false, Some(value)) = (name.is_null(), f.name.as_ref()) {
        let bytes = value.as_bytes_with_nul();
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), name, bytes.len());
    }
}

unsafe extern "C" fn fake_openpty(
    master: *mut c_int,
    slave: *mut c_int,
    name: *mut c_char,
    _termp: *const termios,
    _winp: *const winsize,
) -> c_int {
    let f = record_call("openpty");
    if f.pty_result == 0 {
        *master = f.master;
        *slave = f.slave;
        store_name(name, &f);
    }
    fail_if_negative(f.pty_result, f.errno)
}

unsafe extern "C" fn fake_forkpty(
    master: *mut c_int,
    name: *mut c_char,
    _termp: *const termios,
    _winp: *const winsize,
) -> pid_t {
    let f = record_call("forkpty");
    if f.fork_result > 0 {
        *master = f.master;
        store_name(name, &f);
    }
    fail_if_negative(f.fork_result, f.errno)
}

unsafe extern "C" fn fake_write(_fd: c_int, _buf: *const c_void, count: size_t) -> ssize_t {
    let f = record_call("write");
    fail_if_negative(f.written.unwrap_or(count as ssize_t), f.errno)
}

unsafe extern "C" fn fake_writev(_fd: c_int, iov: *const iovec, iovcnt: c_int) -> ssize_t {
    let f = record_call("writev");
    let total: usize = (0..iovcnt.max(0) as usize)
        .map(|i| (*iov.add(i)).iov_len)
        .sum();
    fail_if_negative(f.written.unwrap_or(total as ssize_t), f.errno)
}

unsafe extern "C" fn fake_fork() -> pid_t {
    let f = record_call("fork");
    fail_if_negative(f.fork_result, f.errno)
}

/// Symbol table pointing at the fakes
pub(crate) fn fake_symbols() -> Symbols {
    Symbols {
        open: fake_open,
        open64: fake_open64,
        openat: fake_openat,
        openat64: fake_openat64,
        close: fake_close,
        getpt: fake_getpt,
        openpty: fake_openpty,
        forkpty: fake_forkpty,
        posix_openpt: fake_posix_openpt,
        write: fake_write,
        writev: fake_writev,
        fork: fake_fork,
    }
}

/// Context whose sink is a temp file, with the file kept alive alongside
pub(crate) struct TestContext {
    pub context: AuditContext,
    pub log_fd: RawFd,
    file: tempfile::NamedTempFile,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log_fd = file.reopen().unwrap().into_raw_fd();
        Self {
            context: AuditContext::new(LogSink::local(log_fd, libc::write)),
            log_fd,
            file,
        }
    }

    /// Every record written so far, one entry per line
    pub(crate) fn lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.file.path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        unsafe { libc::close(self.log_fd) };
    }
}
