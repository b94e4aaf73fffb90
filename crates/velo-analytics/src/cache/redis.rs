//! Redis cache implementation.

use super::r#trait::{CacheError, CacheResult, CacheStats, CacheStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Redis cache shared across processes.
///
/// Holds one multiplexed connection that reconnects on its own. Every command
/// is bounded by `op_timeout` so a stalled server degrades to a cache fault
/// rather than a stalled query.
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: Option<String>,
    op_timeout: Duration,
    stats: CacheStatsInner,
}

#[derive(Default)]
struct CacheStatsInner {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCache {
    /// Connect to Redis at `url`. Keys are stored as `{prefix}:{key}` when a
    /// non-empty prefix is given.
    pub async fn connect(url: &str, prefix: Option<&str>, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(op_timeout))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            op_timeout,
            stats: CacheStatsInner::default(),
        })
    }

    /// Build a full key with prefix.
    fn key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
            .map_err(map_redis_error)
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}

fn map_redis_error(e: redis::RedisError) -> CacheError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Backend(e.to_string())
    }
}

/// Expiry in whole milliseconds, never zero.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);

        let result: Option<String> = self.bounded(conn.get(&full_key)).await?;

        match &result {
            Some(_) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Redis cache hit");
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Redis cache miss");
            }
        }
        Ok(result)
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);

        let _: () = self
            .bounded(
                redis::cmd("SET")
                    .arg(&full_key)
                    .arg(payload)
                    .arg("PX")
                    .arg(expiry_millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;

        debug!(key = key, ttl_secs = ttl.as_secs(), "Redis cache set");
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);
        self.bounded(conn.exists(&full_key)).await
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);

        let millis: i64 = self
            .bounded(redis::cmd("PTTL").arg(&full_key).query_async(&mut conn))
            .await?;

        // -2 means missing, -1 means no expiry
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            size: 0,
            evictions: 0,
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_never_zero() {
        assert_eq!(expiry_millis(Duration::ZERO), 1);
        assert_eq!(expiry_millis(Duration::from_micros(10)), 1);
        assert_eq!(expiry_millis(Duration::from_secs(3600)), 3_600_000);
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisCache::connect("not a url", None, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }
}
