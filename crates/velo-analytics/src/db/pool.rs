//! Database pool management.

use super::config::DbConfig;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use tracing::info;

/// Create a database connection pool.
///
/// Every connection carries `statement_timeout`, so a runaway aggregation is
/// cancelled by the server instead of holding a connection.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    if config.url.is_empty() {
        bail!("database.url is not set");
    }
    info!("Creating database connection pool...");

    let statement_timeout_ms = config.statement_timeout().as_millis().to_string();
    let connect_options = PgConnectOptions::from_str(&config.url)
        .context("Invalid database URL")?
        .statement_cache_capacity(config.statement_cache_size)
        .options([("statement_timeout", statement_timeout_ms.as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .max_lifetime(Some(config.max_lifetime()))
        .connect_with(connect_options)
        .await
        .context("Failed to create database pool")?;

    verify_connection(&pool).await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        statement_timeout_secs = config.statement_timeout_secs,
        "Database pool created"
    );

    Ok(pool)
}

/// Verify database connection.
pub async fn verify_connection(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database connection verification failed")?;

    info!("Database connection verified");
    Ok(())
}

/// Get pool statistics.
pub fn pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle();
    PoolStats {
        size,
        idle,
        active: size.saturating_sub(idle as u32),
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub active: u32,
}
