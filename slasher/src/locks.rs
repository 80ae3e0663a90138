use parking_lot::{lock_api::ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Guard held for the duration of a keyed critical section.
pub type KeyGuard = ArcMutexGuard<RawMutex, ()>;

/// A lazily-populated set of mutexes, one per `u64` key.
///
/// Guards own a reference to their mutex, so they are released on every exit path including
/// early returns via `?`.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, key: u64) -> Arc<Mutex<()>> {
        self.locks.lock().entry(key).or_default().clone()
    }

    pub fn lock(&self, key: u64) -> KeyGuard {
        self.mutex_for(key).lock_arc()
    }

    /// Lock every key in `keys`, in ascending order.
    ///
    /// All callers acquiring more than one key must go through here so that the acquisition order
    /// is globally consistent.
    pub fn lock_many(&self, keys: impl IntoIterator<Item = u64>) -> Vec<KeyGuard> {
        let mut keys = keys.into_iter().collect::<Vec<_>>();
        keys.sort_unstable();
        keys.dedup();
        keys.into_iter().map(|key| self.lock(key)).collect()
    }

    /// Forget the mutexes for keys below `min_key` that nobody currently holds or waits on.
    pub fn prune_below(&self, min_key: u64) {
        self.locks
            .lock()
            .retain(|key, mutex| *key >= min_key || Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
