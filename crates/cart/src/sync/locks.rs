//! Per-entry mutation ordering.

use std::collections::HashMap;
use std::sync::Arc;

use kubti_core::EntryKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per cart entry.
///
/// `tokio::sync::Mutex` queues waiters in FIFO order, so mutations on the
/// same entry complete in the order they were issued. Entries nobody holds
/// are dropped from the map on the next acquire.
#[derive(Debug, Default)]
pub struct EntryLocks {
    locks: Mutex<HashMap<EntryKey, Arc<Mutex<()>>>>,
}

impl EntryLocks {
    pub async fn acquire(&self, key: &EntryKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
