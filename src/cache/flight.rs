use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// Per-cache-path generation locks.
///
/// Holding the guard for a path makes other misses on the same path wait, after which they find
/// the artifact already written. Locks for idle paths are dropped as soon as their last holder
/// releases them.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<PathBuf, Weak<Mutex<()>>>>,
}

/// Holds one path's generation lock until dropped.
pub struct FlightGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `key` is free, then hold it.
    pub fn lock(&self, key: &Path) -> FlightGuard {
        let lock = self.slot(key);
        FlightGuard {
            _guard: lock.lock_arc(),
        }
    }

    /// Number of paths with a live lock.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn slot(&self, key: &Path) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        slots.retain(|_, w| w.strong_count() > 0);
        if let Some(lock) = slots.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(Mutex::new(()));
        slots.insert(key.to_path_buf(), Arc::downgrade(&lock));
        lock
    }
}

impl std::fmt::Debug for FlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGuard").finish_non_exhaustive()
    }
}
