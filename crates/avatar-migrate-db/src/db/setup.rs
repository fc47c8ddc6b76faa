//! Database connection setup

use avatar_migrate_core::{MigrationConfig, MigrationError, MigrationResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Open the single connection every stage shares.
///
/// The pool is capped at one connection so all queries and updates run one after
/// another on the same session.
pub async fn connect_database(config: &MigrationConfig) -> MigrationResult<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .map_err(MigrationError::Connection)?;

    tracing::info!(table = %config.table, "Database connected successfully");
    Ok(pool)
}
