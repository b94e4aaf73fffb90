//! Database connection management.
//!
//! Pool setup with a per-statement timeout, health checks and slow query
//! logging for the Postgres store.

pub mod config;
pub mod health;
pub mod instrumentation;
pub mod pool;

pub use config::DbConfig;
pub use health::{check_health, DbHealth};
pub use instrumentation::QueryTimer;
pub use pool::{create_pool, pool_stats, verify_connection, PoolStats};
