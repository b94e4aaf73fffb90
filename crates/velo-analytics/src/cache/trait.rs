//! Cache store trait definition.

use async_trait::async_trait;
use std::time::Duration;

/// Cache operation result.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A key to serialized-payload store with per-entry expiry.
///
/// Payloads are opaque strings. Nothing is transactional across keys, and a
/// `get` followed by a `set` on the same key is not atomic.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the payload stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `payload` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()>;

    /// Check if key exists.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Get time to live for key.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheStats;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
