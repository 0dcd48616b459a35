//! Keyed async locks.
//!
//! Events for different offers may be processed concurrently, but two events for the same offer must never
//! interleave: the second one has to see what the first one wrote. [`OfferLocks`] hands out one async mutex per key.
//! Entries are dropped from the map once nobody holds or waits on them.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct OfferLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl OfferLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds the lock for `key`, and returns a guard that releases it on drop.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Only the map holds a reference to an idle lock
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        if lock.try_lock().is_err() {
            trace!("🔄️ Waiting for the lock on offer {key}");
        }
        lock.lock_owned().await
    }

    /// The number of keys that are currently locked or being waited on.
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.values().filter(|l| Arc::strong_count(l) > 1).count()
    }
}
