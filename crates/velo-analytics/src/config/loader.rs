//! Configuration loading utilities.

use super::types::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

const DEFAULTS: &str = include_str!("defaults.toml");

/// Load configuration from various sources.
///
/// Later sources override earlier ones: embedded defaults, then the optional
/// config file, then `{prefix}__SECTION__KEY` environment variables.
pub struct ConfigLoader {
    config_path: Option<String>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: "VELO".to_string(),
        }
    }

    /// Set config file path.
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration.
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml));

        if let Some(path) = &self.config_path {
            if Path::new(path).exists() {
                info!(path = %path, "Loading config file");
                builder = builder.add_source(config::File::with_name(path));
            } else {
                info!(path = %path, "Config file not found, using defaults");
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CacheBackend;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config = ConfigLoader::new()
            .with_env_prefix("VELO_TEST_UNSET_PREFIX")
            .load()
            .unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.ttl.count_secs, 3600);
        assert_eq!(config.analytics.irregular_threshold_secs, 300);
        assert!(config.database.url.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ttl]\ncount_secs = 60\n\n[cache]\nbackend = \"redis\"\nredis_url = \"redis://127.0.0.1\"").unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("VELO_TEST_UNSET_PREFIX")
            .with_config_path(file.path().to_string_lossy())
            .load()
            .unwrap();
        assert_eq!(config.ttl.count_secs, 60);
        assert_eq!(config.ttl.listing_secs, 360_000);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://127.0.0.1"));
    }
}
