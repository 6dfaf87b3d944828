//! Per-key async lock registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of named async mutexes.
///
/// Writers that must not interleave on the same key (one session, one
/// `(task_id, agent_id)` pair) acquire the key's mutex first; writers on
/// unrelated keys proceed in parallel. Entries are created on demand and
/// dropped once no task holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting behind any current holder.
    ///
    /// The guard is owned so it can be held across await points for the
    /// duration of a read-modify-write sequence.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            // Strong count 1 means only the registry still references the
            // lock; nobody holds or waits on it.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(key.to_owned()).or_default())
        };
        slot.lock_owned().await
    }
}
