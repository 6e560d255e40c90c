//! ptyaudit: preloadable audit shim for pseudo-terminal traffic
//!
//! Loaded into a host process with `LD_PRELOAD`, this library wraps the libc
//! functions that create PTY masters and the write calls that feed them. Every
//! master the host creates is remembered, and every successful write to one is
//! logged as a line on descriptor 100, or shipped to a TCP collector when
//! `PTYAUDIT_REMOTE=host:port` is set.
//!
//! # Security Model
//!
//! The layer is **fail-closed**: if it cannot find the real libc functions or
//! reach the configured collector, it reports why on the log channel and
//! aborts the host rather than letting it run unaudited. The host cannot close
//! the log channel; `close(100)` reports success and leaves it open.
//!
//! # Architecture
//!
//! - **Symbols**: originals resolved once with `dlsym(RTLD_NEXT, ..)`
//! - **Context**: tracked masters and the log sink, created by the load hook
//! - **Hooks**: per-call observation, always returning the original's result
//! - **Exports**: the `extern "C"` names the dynamic linker binds to

#![warn(clippy::all)]
// Load hooks and exports are compiled out of unit tests
#![cfg_attr(test, allow(dead_code))]

mod context;
mod fatal;
mod hooks;
mod symbols;

#[cfg(not(test))]
mod exports;

#[cfg(test)]
mod testing;
