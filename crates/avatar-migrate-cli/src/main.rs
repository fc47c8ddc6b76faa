//! avatar-migrate: move avatar objects from the legacy bucket to the production bucket
//! and repoint the database rows at them.
//!
//! Configured entirely from the environment (and `.env`). Exit codes: 0 success,
//! 1 any stage error, 2 legacy references still present so nothing was deleted.

use avatar_migrate_cli::{init_tracing, report_lines, LogSettings};
use avatar_migrate_core::{MigrationConfig, MigrationError, MigrationResult};
use avatar_migrate_db::{connect_database, PostgresAssetRepository};
use avatar_migrate_pipeline::{run_migration, MigrationOutcome};
use avatar_migrate_storage::create_storage;

#[tokio::main]
async fn main() {
    // `.env` first so RUST_LOG and LOG_FORMAT from it reach the subscriber
    dotenvy::dotenv().ok();

    let log_settings = LogSettings::from_lookup(|key| std::env::var(key).ok());
    if let Err(e) = init_tracing(&log_settings) {
        eprintln!("{e:#}");
    }

    let exit_code = match run().await {
        Ok((config, outcome)) => {
            for line in report_lines(&outcome, &config) {
                println!("{line}");
            }
            outcome.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, error_code = e.error_code(), "Startup failed");
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> MigrationResult<(MigrationConfig, MigrationOutcome)> {
    let config = MigrationConfig::from_env()?;

    let pool = connect_database(&config).await?;
    let repository = PostgresAssetRepository::new(pool.clone(), config.table.clone())?;
    let storage = create_storage(&config)
        .await
        .map_err(|e| MigrationError::Storage(e.to_string()))?;

    tracing::info!(
        table = %repository.table(),
        backend = %storage.backend_type(),
        "Connected to database and object storage"
    );

    let outcome = run_migration(&repository, storage.as_ref(), &config).await;
    pool.close().await;

    Ok((config, outcome))
}
