//! Configuration types.

use crate::db::DbConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use velo_common_log::LogConfig;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DbConfig,
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Entry lifetimes per query family.
    #[serde(default)]
    pub ttl: TtlConfig,
    /// Aggregation tuning.
    #[serde(default)]
    pub analytics: AggregationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which cache store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Per-process map.
    #[default]
    Memory,
    /// Shared Redis server.
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis URL, required for the redis backend.
    pub redis_url: Option<String>,
    /// Prepended to every Redis key as `{prefix}:`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Capacity of the memory backend.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Bound on a single Redis command.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
}

fn default_key_prefix() -> String {
    "velo".to_string()
}

fn default_max_entries() -> usize {
    10_000
}

fn default_op_timeout() -> u64 {
    250
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            max_entries: default_max_entries(),
            op_timeout_ms: default_op_timeout(),
        }
    }
}

impl CacheConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

/// Cache entry lifetimes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlConfig {
    /// Station and journey counts.
    #[serde(default = "default_count_ttl")]
    pub count_secs: u64,
    /// Station and journey listings.
    #[serde(default = "default_long_ttl")]
    pub listing_secs: u64,
    /// Station summaries and single journeys.
    #[serde(default = "default_long_ttl")]
    pub detail_secs: u64,
    /// Monthly flow, destinations and irregular percentages.
    #[serde(default = "default_long_ttl")]
    pub analytics_secs: u64,
}

fn default_count_ttl() -> u64 {
    3600
}

fn default_long_ttl() -> u64 {
    360_000
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            count_secs: default_count_ttl(),
            listing_secs: default_long_ttl(),
            detail_secs: default_long_ttl(),
            analytics_secs: default_long_ttl(),
        }
    }
}

impl TtlConfig {
    pub fn count(&self) -> Duration {
        Duration::from_secs(self.count_secs)
    }

    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_secs(self.detail_secs)
    }

    pub fn analytics(&self) -> Duration {
        Duration::from_secs(self.analytics_secs)
    }
}

/// Aggregation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Allowed gap between recorded duration and elapsed time.
    #[serde(default = "default_irregular_threshold")]
    pub irregular_threshold_secs: u32,
}

fn default_irregular_threshold() -> u32 {
    300
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            irregular_threshold_secs: default_irregular_threshold(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact, json).
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Logging setup from this section, overridden by `VELO_LOG_*`.
    pub fn to_log_config(&self) -> LogConfig {
        let mut config = LogConfig::new(&self.level, &self.format);
        config.file_path = self.file.clone();
        config.with_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_defaults() {
        let ttl = TtlConfig::default();
        assert_eq!(ttl.count(), Duration::from_secs(3600));
        assert_eq!(ttl.listing(), Duration::from_secs(360_000));
        assert_eq!(ttl.analytics(), Duration::from_secs(360_000));
    }

    #[test]
    fn test_cache_backend_parses_lowercase() {
        let config: CacheConfig = serde_json::from_str(r#"{"backend":"redis","redis_url":"redis://localhost"}"#).unwrap();
        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.key_prefix, "velo");
        assert_eq!(config.op_timeout(), Duration::from_millis(250));
    }
}
