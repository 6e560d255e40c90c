//! Per-thread reentrancy guard and errno preservation

use std::cell::Cell;

use libc::c_int;

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running an interceptor
///
/// Any intercepted call made while a scope is alive (our own diagnostics, name
/// resolution, a libc function calling another hooked function) must go
/// straight to the original.
pub(crate) struct HookScope {
    _private: (),
}

impl HookScope {
    /// Enter a scope, or `None` if this thread is already inside one
    ///
    /// Also `None` while thread-local storage is being torn down.
    pub(crate) fn enter() -> Option<Self> {
        ACTIVE
            .try_with(|active| {
                if active.replace(true) {
                    None
                } else {
                    Some(Self { _private: () })
                }
            })
            .ok()
            .flatten()
    }
}

impl Drop for HookScope {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.set(false));
    }
}

/// `errno` captured right after the original call
pub(crate) struct SavedErrno(c_int);

impl SavedErrno {
    pub(crate) fn save() -> Self {
        // SAFETY: __errno_location always returns this thread's errno slot
        Self(unsafe { *libc::__errno_location() })
    }

    pub(crate) fn restore(self) {
        // SAFETY: as above
        unsafe { *libc::__errno_location() = self.0 };
    }
}
