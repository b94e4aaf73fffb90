//! Cached analytics over stations and journeys.
//!
//! Every operation except the per-station journey listings resolves its
//! parameters to a cache key, then goes through [`ReadThrough`]: a hit is
//! served as stored, a miss runs the store queries and stores the result.

pub mod destinations;
pub mod flow;
pub mod irregular;
pub mod journeys;
pub mod stations;

use crate::cache::{CacheStore, ReadThrough};
use crate::config::{AppConfig, TtlConfig};
use crate::store::JourneyStore;
use std::sync::Arc;

/// Entry point for every analytics query.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn JourneyStore>,
    cache: ReadThrough,
    ttl: TtlConfig,
    irregular_threshold_secs: u32,
}

impl Analytics {
    pub fn new(store: Arc<dyn JourneyStore>, cache: Arc<dyn CacheStore>, ttl: TtlConfig) -> Self {
        Self {
            store,
            cache: ReadThrough::new(cache),
            ttl,
            irregular_threshold_secs: 300,
        }
    }

    /// Threshold used by station summaries and by default irregular queries.
    pub fn with_irregular_threshold(mut self, threshold_secs: u32) -> Self {
        self.irregular_threshold_secs = threshold_secs;
        self
    }

    pub fn from_config(store: Arc<dyn JourneyStore>, cache: Arc<dyn CacheStore>, config: &AppConfig) -> Self {
        Self::new(store, cache, config.ttl).with_irregular_threshold(config.analytics.irregular_threshold_secs)
    }

    pub fn irregular_threshold_secs(&self) -> u32 {
        self.irregular_threshold_secs
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        self.cache.store()
    }
}
