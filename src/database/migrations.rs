//! Schema migrations embedded at compile time.

use sqlx::PgPool;
use tracing::info;

use crate::error::{Result, TaskError};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply any pending migrations. Idempotent; safe to call at every startup.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR.run(pool).await.map_err(|e| TaskError::Database {
        operation: "run_migrations".to_string(),
        message: e.to_string(),
    })?;
    info!("database migrations applied");
    Ok(())
}
