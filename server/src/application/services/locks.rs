//! Per-record mutual exclusion for lifecycle operations.
//!
//! Start, stop, delete, settings updates and world uploads on the same server
//! run one at a time; operations on different servers proceed in parallel.
//! An entry lives only while some caller holds or waits for it, so ids that
//! never resolve to a record leave nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use mchost_common::ServerId;
use tokio::sync::OwnedMutexGuard;

type RecordLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = Arc<Mutex<HashMap<ServerId, RecordLock>>>;

/// Registry of one async mutex per server id.
#[derive(Debug, Default)]
pub struct RecordLocks {
    inner: LockMap,
}

/// Exclusive access to one record. Dropping it releases the record and
/// removes the registry entry when nobody else is waiting.
#[derive(Debug)]
pub struct RecordGuard {
    id: ServerId,
    guard: Option<OwnedMutexGuard<()>>,
    map: LockMap,
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so a count of one means
        // no holder and no waiter.
        if map.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.id);
        }
    }
}

impl RecordLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Access is released when the guard drops.
    pub async fn acquire(&self, id: ServerId) -> RecordGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(id).or_default())
        };
        let guard = lock.lock_owned().await;
        RecordGuard {
            id,
            guard: Some(guard),
            map: Arc::clone(&self.inner),
        }
    }

    /// Number of ids currently held or waited on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
