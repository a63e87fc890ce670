//! # Keyed Locks
//!
//! One async mutex per key, created on first use and dropped once nobody
//! holds or waits on it. The Serialized upsert strategy takes the lock for
//! `(uid, product_id)` around its read-then-write so two adds for the same
//! pair never interleave inside this process.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of per-key async mutexes.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        KeyedLocks::default()
    }

    /// Waits for exclusive access to `key`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            // Drop entries nobody else references.
            map.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Lock key for a user's row of a given product.
pub fn pair_key(table: &str, uid: &str, product_id: &str) -> String {
    format!("{}:{}:{}", table, uid, product_id)
}
