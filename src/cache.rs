//! Process-lifetime memo store.
//!
//! Entries are written once per key and never invalidated; restarting the
//! process is the only way to refresh them. Failed initialisations are not
//! stored, so the next caller retries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Memo<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the stored value for `key`, running `init` on a miss.
    ///
    /// The lock is held across `init`, so concurrent callers for a cold key
    /// wait for the first one instead of computing it again.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(value) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache = self.name, ?key, "cache hit");
            return Ok(Arc::clone(value));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache = self.name, ?key, "cache miss");

        let value = Arc::new(init().await?);
        entries.insert(key, Arc::clone(&value));
        Ok(value)
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
