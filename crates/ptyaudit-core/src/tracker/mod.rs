//! Registry of descriptors believed to be PTY masters

use std::collections::HashSet;
use std::os::fd::RawFd;

use parking_lot::{Mutex, MutexGuard};

use crate::error::AuditError;

/// Set of descriptors currently treated as PTY master endpoints
///
/// Growable and internally synchronized; safe to share across host threads.
#[derive(Debug, Default)]
pub struct FdTracker {
    fds: Mutex<HashSet<RawFd>>,
}

/// Exclusive hold on the tracker, released on drop
///
/// Taken around `fork` so that the child never starts with the lock owned by
/// a thread that does not exist on its side.
pub struct TrackerHold<'a> {
    _guard: MutexGuard<'a, HashSet<RawFd>>,
}

impl FdTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `fd`
    ///
    /// Returns `true` if the descriptor was not already tracked.
    pub fn register(&self, fd: RawFd) -> Result<bool, AuditError> {
        if fd < 0 {
            return Err(AuditError::InvalidDescriptor(fd));
        }
        Ok(self.fds.lock().insert(fd))
    }

    /// Stop tracking `fd`; untracked values are ignored
    pub fn unregister(&self, fd: RawFd) -> bool {
        self.fds.lock().remove(&fd)
    }

    /// Whether `fd` is tracked
    pub fn contains(&self, fd: RawFd) -> bool {
        self.fds.lock().contains(&fd)
    }

    /// Number of tracked descriptors
    pub fn len(&self) -> usize {
        self.fds.lock().len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.fds.lock().is_empty()
    }

    /// Remove and return every tracked descriptor, in ascending order
    pub fn drain(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self.fds.lock().drain().collect();
        fds.sort_unstable();
        fds
    }

    /// Lock the tracker until the returned hold is dropped
    ///
    /// Held across `fork`, so the child releases a lock taken by its parent.
    /// That is sound while no other thread is parked on the tracker when the
    /// fork happens, since waking one goes through `parking_lot`'s global
    /// parking table, which another parent thread may have held.
    pub fn hold(&self) -> TrackerHold<'_> {
        TrackerHold {
            _guard: self.fds.lock(),
        }
    }
}
