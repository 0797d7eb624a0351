//! In-process backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use laxsched_core::cache_keys::COUNTER_TTL;

/// Lifetime applied by [`MemoryStore::set`] when the caller gives none.
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheRecord {
    value: Value,
    expires_at: Instant,
}

impl CacheRecord {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Map-backed store. Expired entries are evicted lazily when read or
/// enumerated.
///
/// Clones share the same map. Time comes from `tokio::time`, so tests can
/// drive expiry with a paused clock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, CacheRecord>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheRecord>> {
        // A panic while holding the lock cannot leave a record half-written.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut data = self.lock();
        let now = Instant::now();
        match data.get(key) {
            Some(record) if record.is_expired(now) => {
                data.remove(key);
                None
            }
            Some(record) => Some(record.value.clone()),
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(DEFAULT_TTL);
        self.lock()
            .insert(key.to_owned(), CacheRecord { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut data = self.lock();
        let now = Instant::now();
        data.retain(|_, record| !record.is_expired(now));
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Increment a counter. Absent or non-numeric values start from zero;
    /// every increment refreshes the week-long counter TTL.
    pub fn incr(&self, key: &str) -> i64 {
        let mut data = self.lock();
        let now = Instant::now();
        let current = data
            .get(key)
            .filter(|record| !record.is_expired(now))
            .and_then(|record| record.value.as_i64())
            .unwrap_or(0);
        let next = current.saturating_add(1);
        data.insert(
            key.to_owned(),
            CacheRecord {
                value: Value::from(next),
                expires_at: now + COUNTER_TTL,
            },
        );
        next
    }

    pub fn clear_prefix(&self, prefix: &str) -> usize {
        let mut data = self.lock();
        let now = Instant::now();
        data.retain(|_, record| !record.is_expired(now));
        let before = data.len();
        data.retain(|k, _| !k.starts_with(prefix));
        before - data.len()
    }
}
