//! Configuration validation.

use super::types::{AppConfig, CacheBackend};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid database URL: expected postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("Invalid pool size: min {min} exceeds max {max}, or max is zero")]
    InvalidPoolSize { min: u32, max: u32 },

    #[error("Redis cache selected but cache.redis_url is not set")]
    MissingRedisUrl,

    #[error("cache.max_entries must be positive")]
    ZeroCacheCapacity,

    #[error("cache.op_timeout_ms must be positive")]
    ZeroCacheTimeout,

    #[error("ttl.{0} must be positive")]
    ZeroTtl(&'static str),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Validate configuration, reporting every problem found.
///
/// An empty database URL passes; it is only required when connecting.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let url = &config.database.url;
    if !url.is_empty() && !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        errors.push(ConfigError::InvalidDatabaseUrl);
    }

    let (min, max) = (config.database.min_connections, config.database.max_connections);
    if max == 0 || min > max {
        errors.push(ConfigError::InvalidPoolSize { min, max });
    }

    if config.cache.backend == CacheBackend::Redis
        && config.cache.redis_url.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ConfigError::MissingRedisUrl);
    }
    if config.cache.max_entries == 0 {
        errors.push(ConfigError::ZeroCacheCapacity);
    }
    if config.cache.op_timeout_ms == 0 {
        errors.push(ConfigError::ZeroCacheTimeout);
    }

    let ttl = &config.ttl;
    for (name, secs) in [
        ("count_secs", ttl.count_secs),
        ("listing_secs", ttl.listing_secs),
        ("detail_secs", ttl.detail_secs),
        ("analytics_secs", ttl.analytics_secs),
    ] {
        if secs == 0 {
            errors.push(ConfigError::ZeroTtl(name));
        }
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
