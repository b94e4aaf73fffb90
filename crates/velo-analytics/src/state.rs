//! Shared service state.

use crate::analytics::Analytics;
use crate::cache::{CacheStats, CacheStore, MemoryCache, RedisCache};
use crate::config::{AppConfig, CacheBackend, CacheConfig};
use crate::db::{check_health, create_pool, DbHealth};
use crate::store::{JourneyStore, PgStore};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HEALTH_PROBE_KEY: &str = "health:probe";

/// Everything an analytics caller needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub analytics: Analytics,
    pool: Option<PgPool>,
}

/// Cache reachability.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub is_healthy: bool,
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
    pub message: Option<String>,
}

/// Health of both collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Absent when the service runs without a database.
    pub database: Option<DbHealth>,
    pub cache: CacheHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.cache.is_healthy && self.database.as_ref().map_or(true, |db| db.is_healthy)
    }
}

/// Build the configured cache store.
///
/// An unreachable Redis server falls back to the memory backend so that the
/// service keeps answering from the database.
pub async fn build_cache(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match (config.backend, config.redis_url.as_deref()) {
        (CacheBackend::Redis, Some(url)) => {
            match RedisCache::connect(url, Some(&config.key_prefix), config.op_timeout()).await {
                Ok(cache) => {
                    info!(prefix = %config.key_prefix, "Redis cache connected");
                    return Arc::new(cache);
                }
                Err(e) => {
                    warn!(error = %e, "Redis cache unavailable, falling back to memory cache");
                }
            }
        }
        (CacheBackend::Redis, None) => {
            warn!("Redis cache selected without cache.redis_url, using memory cache");
        }
        (CacheBackend::Memory, _) => {}
    }

    info!(max_entries = config.max_entries, "Memory cache created");
    Arc::new(MemoryCache::new(config.max_entries))
}

impl AppState {
    /// Connect to Postgres and the configured cache.
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let pool = create_pool(&config.database)
            .await
            .context("Failed to connect to the database")?;

        let store = PgStore::new(pool.clone())
            .with_slow_query_threshold(config.database.slow_query_threshold())
            .with_statement_timeout(config.database.statement_timeout());

        let mut state = Self::with_store(config, Arc::new(store)).await;
        state.pool = Some(pool);
        Ok(state)
    }

    /// Use `store` in place of Postgres, with the configured cache.
    pub async fn with_store(config: &AppConfig, store: Arc<dyn JourneyStore>) -> Self {
        let cache = build_cache(&config.cache).await;
        info!(
            store = store.backend(),
            cache = cache.backend(),
            "Analytics ready"
        );

        Self {
            config: Arc::new(config.clone()),
            analytics: Analytics::from_config(store, cache, config),
            pool: None,
        }
    }

    /// Check the database (when connected) and the cache.
    pub async fn health(&self, timeout: Duration) -> HealthReport {
        let database = match &self.pool {
            Some(pool) => Some(check_health(pool, timeout).await),
            None => None,
        };

        let cache = self.analytics.cache();
        let probe = tokio::time::timeout(timeout, cache.exists(HEALTH_PROBE_KEY)).await;
        let message = match probe {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("Cache timeout".to_string()),
        };
        let CacheStats {
            hits, misses, size, ..
        } = cache.stats().await;

        HealthReport {
            database,
            cache: CacheHealth {
                backend: cache.backend(),
                is_healthy: message.is_none(),
                hits,
                misses,
                size,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_redis_without_url_falls_back_to_memory() {
        let config = CacheConfig {
            backend: CacheBackend::Redis,
            ..CacheConfig::default()
        };
        assert_eq!(build_cache(&config).await.backend(), "memory");
    }

    #[tokio::test]
    async fn test_health_without_database() {
        let state = AppState::with_store(&AppConfig::default(), Arc::new(MemoryStore::new())).await;
        let report = state.health(Duration::from_secs(1)).await;
        assert!(report.database.is_none());
        assert_eq!(report.cache.backend, "memory");
        assert!(report.is_healthy());
    }
}
