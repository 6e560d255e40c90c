//! Exported C symbols
//!
//! With `LD_PRELOAD` these definitions shadow the libc ones for the whole host
//! process. Bodies only route into [`crate::hooks`]. The load and unload hooks
//! are registered through `.init_array` / `.fini_array`.

use libc::{c_char, c_int, c_void, iovec, mode_t, pid_t, size_t, ssize_t, termios, winsize};

use crate::context;
use crate::hooks::{self, close_direct};

#[used]
#[link_section = ".init_array"]
static LOAD_HOOK: extern "C" fn() = on_load;

#[used]
#[link_section = ".fini_array"]
static UNLOAD_HOOK: extern "C" fn() = on_unload;

extern "C" fn on_load() {
    context::initialize();
}

extern "C" fn on_unload() {
    context::shutdown();
}

#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    hooks::dispatch(
        |h| h.open(path, flags, mode),
        |libc| (libc.open)(path, flags, mode),
    )
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    hooks::dispatch(
        |h| h.open64(path, flags, mode),
        |libc| (libc.open64)(path, flags, mode),
    )
}

#[no_mangle]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    hooks::dispatch(
        |h| h.openat(dirfd, path, flags, mode),
        |libc| (libc.openat)(dirfd, path, flags, mode),
    )
}

#[no_mangle]
pub unsafe extern "C" fn openat64(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    hooks::dispatch(
        |h| h.openat64(dirfd, path, flags, mode),
        |libc| (libc.openat64)(dirfd, path, flags, mode),
    )
}

#[no_mangle]
pub unsafe extern "C" fn close(fd: c_int) -> c_int {
    hooks::dispatch(|h| h.close(fd), |libc| close_direct(libc, fd))
}

#[no_mangle]
pub unsafe extern "C" fn getpt() -> c_int {
    hooks::dispatch(|h| h.getpt(), |libc| (libc.getpt)())
}

#[no_mangle]
pub unsafe extern "C" fn openpty(
    master: *mut c_int,
    slave: *mut c_int,
    name: *mut c_char,
    termp: *const termios,
    winp: *const winsize,
) -> c_int {
    hooks::dispatch(
        |h| h.openpty(master, slave, name, termp, winp),
        |libc| (libc.openpty)(master, slave, name, termp, winp),
    )
}

#[no_mangle]
pub unsafe extern "C" fn forkpty(
    master: *mut c_int,
    name: *mut c_char,
    termp: *const termios,
    winp: *const winsize,
) -> pid_t {
    hooks::dispatch(
        |h| h.forkpty(master, name, termp, winp),
        |libc| (libc.forkpty)(master, name, termp, winp),
    )
}

#[no_mangle]
pub unsafe extern "C" fn posix_openpt(flags: c_int) -> c_int {
    hooks::dispatch(|h| h.posix_openpt(flags), |libc| (libc.posix_openpt)(flags))
}

#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
    hooks::dispatch(
        |h| h.write(fd, buf, count),
        |libc| (libc.write)(fd, buf, count),
    )
}

#[no_mangle]
pub unsafe extern "C" fn writev(fd: c_int, iov: *const iovec, iovcnt: c_int) -> ssize_t {
    hooks::dispatch(
        |h| h.writev(fd, iov, iovcnt),
        |libc| (libc.writev)(fd, iov, iovcnt),
    )
}

#[no_mangle]
pub unsafe extern "C" fn fork() -> pid_t {
    hooks::dispatch(|h| h.fork(), |libc| (libc.fork)())
}
