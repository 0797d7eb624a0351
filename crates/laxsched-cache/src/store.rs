use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use laxsched_core::AppConfig;

use crate::error::CacheError;
use crate::memory::MemoryStore;
use crate::remote::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Remote,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub mode: CacheMode,
    pub key_count: usize,
}

#[derive(Debug, Clone)]
enum Backend {
    Remote(RemoteStore),
    Memory(MemoryStore),
}

/// Handle to the process-wide cache. Cheap to clone; clones share the
/// backend.
#[derive(Debug, Clone)]
pub struct CacheStore {
    backend: Backend,
}

impl CacheStore {
    /// Select the backend from configuration: remote when credentials are
    /// present, otherwise in-process.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Http`] if the remote HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, CacheError> {
        match &config.remote_cache {
            Some(credentials) => {
                tracing::info!(url = %credentials.url, "cache: using remote key/value service");
                Ok(Self::remote(RemoteStore::new(
                    &credentials.url,
                    &credentials.token,
                    config.request_timeout_secs,
                )?))
            }
            None => {
                tracing::info!("cache: no remote credentials configured; using in-process store");
                Ok(Self::in_memory())
            }
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    #[must_use]
    pub fn remote(store: RemoteStore) -> Self {
        Self {
            backend: Backend::Remote(store),
        }
    }

    #[must_use]
    pub fn mode(&self) -> CacheMode {
        match self.backend {
            Backend::Remote(_) => CacheMode::Remote,
            Backend::Memory(_) => CacheMode::Memory,
        }
    }

    /// Read a value. Expired keys read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote service is unreachable or
    /// answers with an error.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.get(key).await,
            Backend::Memory(store) => Ok(store.get(key)),
        }
    }

    /// Write a value. `ttl: None` uses the backend default (the in-process
    /// store applies 12 hours; the remote service keeps the key until
    /// deleted).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote write fails.
    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.set(key, value, ttl).await,
            Backend::Memory(store) => {
                store.set(key, value.clone(), ttl);
                Ok(())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.delete(key).await,
            Backend::Memory(store) => {
                store.delete(key);
                Ok(())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote enumeration fails.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.keys_with_prefix(prefix).await,
            Backend::Memory(store) => Ok(store.keys_with_prefix(prefix)),
        }
    }

    /// Increment a counter; an absent key starts at 1 with a week-long TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote increment fails.
    pub async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.incr(key).await,
            Backend::Memory(store) => Ok(store.incr(key)),
        }
    }

    /// Remove every key under `prefix` and return how many were removed.
    /// Best effort under concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote enumeration or delete fails.
    pub async fn clear_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        match &self.backend {
            Backend::Remote(store) => store.clear_prefix(prefix).await,
            Backend::Memory(store) => Ok(store.clear_prefix(prefix)),
        }
    }

    /// Read and deserialize a value. A value of the wrong shape is an error,
    /// not an absent key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Deserialize`] if the stored value does not match
    /// `T`, or any backend error from [`CacheStore::get`].
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::Deserialize {
                    context: format!("cached value for {key}"),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// Serialize and write a value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Deserialize`] if `value` cannot be serialized,
    /// or any backend error from [`CacheStore::set`].
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value).map_err(|e| CacheError::Deserialize {
            context: format!("value for {key}"),
            source: e,
        })?;
        self.set(key, &value, ttl).await
    }

    /// Backend mode and number of live keys.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the remote enumeration fails.
    pub async fn status(&self) -> Result<CacheStatus, CacheError> {
        let key_count = self.keys_with_prefix("").await?.len();
        Ok(CacheStatus {
            mode: self.mode(),
            key_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn typed_round_trip_through_memory_backend() {
        let cache = CacheStore::in_memory();
        cache
            .set_json("games:lastUpdated", &"2026-03-14T17:00:00Z", None)
            .await
            .unwrap();
        let back: Option<String> = cache.get_json("games:lastUpdated").await.unwrap();
        assert_eq!(back.as_deref(), Some("2026-03-14T17:00:00Z"));
    }

    #[tokio::test]
    async fn get_json_reports_shape_mismatch() {
        let cache = CacheStore::in_memory();
        cache.set("k", &json!({"not": "a list"}), None).await.unwrap();
        let result = cache.get_json::<Vec<String>>("k").await;
        assert!(matches!(result, Err(CacheError::Deserialize { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_key_reads_absent_through_facade() {
        let cache = CacheStore::in_memory();
        cache
            .set("k", &json!(1), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn status_reports_memory_mode_and_count() {
        let cache = CacheStore::in_memory();
        cache.set("a", &json!(1), None).await.unwrap();
        cache.set("b", &json!(2), None).await.unwrap();
        let status = cache.status().await.unwrap();
        assert_eq!(status.mode, CacheMode::Memory);
        assert_eq!(status.key_count, 2);
    }

    #[tokio::test]
    async fn incr_through_facade() {
        let cache = CacheStore::in_memory();
        assert_eq!(cache.incr("clicks:fubo:g1").await.unwrap(), 1);
        assert_eq!(cache.incr("clicks:fubo:g1").await.unwrap(), 2);
    }
}
