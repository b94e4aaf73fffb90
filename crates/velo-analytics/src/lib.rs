//! Velo journey analytics
//!
//! Read-through cached analytics over a bike-share dataset of stations and
//! the journeys between them.
//!
//! # Architecture
//!
//! - **Query**: typed parameter records, pagination and search resolution
//! - **Cache**: key construction, memory and Redis stores, read-through
//! - **Store**: one query method per family, Postgres or in memory
//! - **Analytics**: the cached operations and the aggregation between queries

#![warn(clippy::all)]

pub mod analytics;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod state;
pub mod store;

pub use analytics::Analytics;
pub use config::AppConfig;
pub use error::{AnalyticsError, AnalyticsResult};
pub use state::AppState;
