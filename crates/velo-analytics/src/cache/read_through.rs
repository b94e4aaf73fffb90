//! Read-through caching around fallible computations.
//!
//! A lookup that fails, or returns a payload that no longer decodes, counts
//! as a miss. A failed write is logged and dropped. Neither ever fails the
//! caller; only the computation's own error does, and that error is never
//! cached.

use super::r#trait::CacheStore;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use velo_common_log::spans::record_cache_outcome;

/// Serves query results from a cache store, computing and storing them on a
/// miss.
#[derive(Clone)]
pub struct ReadThrough {
    cache: Arc<dyn CacheStore>,
}

impl ReadThrough {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Look up `key`, running `compute` on a miss.
    ///
    /// `Ok(None)` from `compute` means "not found" and is cached like any
    /// other result, so a repeated lookup for a missing record is a hit.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, E>> + Send,
    {
        self.fetch_value(key, ttl, compute).await
    }

    /// Look up `key`, running `compute` on a miss. For computations that
    /// always produce a value, such as counts and lists.
    pub async fn fetch_value<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(cached) = self.lookup::<T>(key).await {
            record_cache_outcome("hit");
            return Ok(cached);
        }
        record_cache_outcome("miss");

        let value = compute().await?;
        self.write(key, &value, ttl).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match self.cache.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = key, backend = self.cache.backend(), error = %e, "Cache read failed, computing");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(key = key, "Serving cached result");
                Some(value)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cached payload did not decode, computing");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = key, error = %e, "Result did not serialize, not caching");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &payload, ttl).await {
            warn!(key = key, backend = self.cache.backend(), error = %e, "Cache write failed");
        }
    }
}
