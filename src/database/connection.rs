//! Pool construction honoring the configured connection limits.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Result, TaskError};

/// Build a connection pool from configuration. The URL comes from
/// `DatabaseConfig::database_url`, so `DATABASE_URL` in the environment
/// takes precedence over the component fields.
pub async fn establish_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .max_lifetime(config.max_lifetime())
        .idle_timeout(config.idle_timeout())
        .connect(&config.database_url())
        .await
        .map_err(|e| TaskError::wrap_db("establish_pool.connect", e))?;

    info!(
        host = %config.host,
        database = %config.database,
        max_connections = config.max_connections,
        "database pool established"
    );
    Ok(pool)
}

/// Cheap liveness probe for startup checks.
pub async fn health_check(pool: &PgPool) -> Result<bool> {
    let health: i32 = sqlx::query_scalar("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| TaskError::wrap_db("health_check", e))?;
    Ok(health == 1)
}
