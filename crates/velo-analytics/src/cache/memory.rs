//! In-memory cache implementation.

use super::r#trait::{CacheResult, CacheStats, CacheStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// In-memory cache entry.
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory cache for a single process.
///
/// Expired entries are dropped lazily on read, and swept when the cache
/// reaches capacity. If nothing has expired, the entry closest to expiry is
/// evicted.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    stats: CacheStatsInner,
}

#[derive(Default)]
struct CacheStatsInner {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            stats: CacheStatsInner::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make room for one new entry.
    fn evict_if_needed(&self, incoming: &str) {
        if self.entries.len() < self.max_entries || self.entries.contains_key(incoming) {
            return;
        }

        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let swept = before.saturating_sub(self.entries.len()) as u64;
        if swept > 0 {
            self.stats.evictions.fetch_add(swept, Ordering::Relaxed);
            debug!(swept, "Cache swept expired entries");
        }

        if self.entries.len() < self.max_entries {
            return;
        }

        let soonest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = soonest {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache evicted entry");
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.payload.clone()));

        let found = match lookup {
            Some(Some(payload)) => Some(payload),
            Some(None) => {
                // Expired
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                None
            }
            None => None,
        };

        match &found {
            Some(_) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Cache hit");
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Cache miss");
            }
        }
        Ok(found)
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> CacheResult<()> {
        self.evict_if_needed(key);

        let entry = CacheEntry {
            payload: payload.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        debug!(key = key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now))
            .unwrap_or(false))
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let now = Instant::now();
        Ok(self.entries.get(key).and_then(|entry| {
            entry
                .is_live(now)
                .then(|| entry.expires_at.saturating_duration_since(now))
        }))
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            size: self.entries.len() as u64,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new(100);

        cache.set("key1", "\"value1\"", Duration::from_secs(60)).await.unwrap();
        let value = cache.get("key1").await.unwrap();
        assert_eq!(value.as_deref(), Some("\"value1\""));

        assert!(cache.exists("key1").await.unwrap());
        assert!(!cache.exists("key2").await.unwrap());
        assert_eq!(cache.get("key2").await.unwrap(), None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_set_replaces_payload() {
        let cache = MemoryCache::new(10);
        cache.set("k", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryCache::new(10);
        cache.set("k", "null", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("null"));
        assert_eq!(cache.ttl("k").await.unwrap(), Some(Duration::from_secs(2)));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.ttl("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_sweeps_expired_first() {
        let cache = MemoryCache::new(2);
        cache.set("short", "1", Duration::from_secs(1)).await.unwrap();
        cache.set("long", "2", Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("new", "3", Duration::from_secs(100)).await.unwrap();

        assert!(cache.exists("long").await.unwrap());
        assert!(cache.exists("new").await.unwrap());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_soonest_expiry() {
        let cache = MemoryCache::new(2);
        cache.set("a", "1", Duration::from_secs(10)).await.unwrap();
        cache.set("b", "2", Duration::from_secs(1000)).await.unwrap();
        cache.set("c", "3", Duration::from_secs(1000)).await.unwrap();

        assert!(!cache.exists("a").await.unwrap());
        assert!(cache.exists("b").await.unwrap());
        assert!(cache.exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_keeps_others() {
        let cache = MemoryCache::new(2);
        cache.set("a", "1", Duration::from_secs(10)).await.unwrap();
        cache.set("b", "2", Duration::from_secs(10)).await.unwrap();
        cache.set("a", "3", Duration::from_secs(10)).await.unwrap();

        assert_eq!(cache.get("b").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.stats().await.evictions, 0);
    }
}
