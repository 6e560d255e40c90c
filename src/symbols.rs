//! Real libc functions behind the intercepted names
//!
//! Resolved with `dlsym(RTLD_NEXT, ..)`, which finds the next definition of a
//! name after this library in the load order, i.e. the one the host would have
//! called without us.

use std::ffi::{c_void, CStr};

use libc::{c_char, c_int, iovec, mode_t, pid_t, ssize_t, termios, winsize};
use once_cell::sync::OnceCell;
use ptyaudit_core::{AuditError, WriteFn};

use crate::fatal;

pub(crate) type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;
pub(crate) type OpenatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, mode_t) -> c_int;
pub(crate) type CloseFn = unsafe extern "C" fn(c_int) -> c_int;
pub(crate) type GetptFn = unsafe extern "C" fn() -> c_int;
pub(crate) type OpenptyFn = unsafe extern "C" fn(
    *mut c_int,
    *mut c_int,
    *mut c_char,
    *const termios,
    *const winsize,
) -> c_int;
pub(crate) type ForkptyFn =
    unsafe extern "C" fn(*mut c_int, *mut c_char, *const termios, *const winsize) -> pid_t;
pub(crate) type PosixOpenptFn = unsafe extern "C" fn(c_int) -> c_int;
pub(crate) type WritevFn = unsafe extern "C" fn(c_int, *const iovec, c_int) -> ssize_t;
pub(crate) type ForkFn = unsafe extern "C" fn() -> pid_t;

static SYMBOLS: OnceCell<Symbols> = OnceCell::new();

/// Table of original function pointers
#[derive(Debug, Clone, Copy)]
pub(crate) struct Symbols {
    pub open: OpenFn,
    pub open64: OpenFn,
    pub openat: OpenatFn,
    pub openat64: OpenatFn,
    pub close: CloseFn,
    pub getpt: GetptFn,
    pub openpty: OpenptyFn,
    pub forkpty: ForkptyFn,
    pub posix_openpt: PosixOpenptFn,
    pub write: WriteFn,
    pub writev: WritevFn,
    pub fork: ForkFn,
}

impl Symbols {
    /// Look up every original, failing on the first missing one
    pub(crate) fn resolve() -> Result<Self, AuditError> {
        // SAFETY: each name is paired with the C prototype it is declared with
        unsafe {
            Ok(Self {
                open: next(c"open")?,
                open64: next(c"open64")?,
                openat: next(c"openat")?,
                openat64: next(c"openat64")?,
                close: next(c"close")?,
                getpt: next(c"getpt")?,
                openpty: next(c"openpty")?,
                forkpty: next(c"forkpty")?,
                posix_openpt: next(c"posix_openpt")?,
                write: next(c"write")?,
                writev: next(c"writev")?,
                fork: next(c"fork")?,
            })
        }
    }
}

/// The resolved table, resolving it on first use
///
/// A library constructor that runs before ours may already call into an
/// interceptor, so this cannot rely on our own load hook having run.
/// Resolution failure aborts the process.
pub(crate) fn resolved() -> &'static Symbols {
    SYMBOLS.get_or_init(|| Symbols::resolve().unwrap_or_else(|e| fatal::abort(&e)))
}

/// Find the next definition of `name` and reinterpret it as `F`
///
/// # Safety
///
/// `F` must be a function pointer type matching the symbol's real prototype.
unsafe fn next<F: Copy>(name: &'static CStr) -> Result<F, AuditError> {
    const {
        assert!(
            std::mem::size_of::<F>() == std::mem::size_of::<*mut c_void>(),
            "symbol type must be a function pointer"
        )
    };

    // Clear any stale error so the message below belongs to this lookup
    libc::dlerror();
    let ptr = libc::dlsym(libc::RTLD_NEXT, name.as_ptr());
    if ptr.is_null() {
        let err = libc::dlerror();
        let reason = if err.is_null() {
            "symbol resolved to null".to_string()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        };
        return Err(AuditError::SymbolResolution {
            symbol: name.to_string_lossy().into_owned(),
            reason,
        });
    }

    Ok(std::mem::transmute_copy::<*mut c_void, F>(&ptr))
}
