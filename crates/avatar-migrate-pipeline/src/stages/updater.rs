//! Stage 3: point each selected row at its migrated key.

use avatar_migrate_core::{AssetRecord, MigrationConfig, MigrationResult};
use avatar_migrate_db::AssetRepository;

/// Counts from one updater run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub updated: usize,
    /// Rows already carrying their target path; no write was issued for them.
    pub unchanged: usize,
}

/// Rewrite each record's path to `new_prefix + filename`, one committed update per row.
///
/// Updates run in list order on the single connection. A failure stops the stage and
/// leaves every earlier row updated.
#[tracing::instrument(skip_all, fields(stage = "update", records = records.len()))]
pub async fn update_paths(
    repository: &dyn AssetRepository,
    config: &MigrationConfig,
    records: &[AssetRecord],
) -> MigrationResult<UpdateOutcome> {
    let mut outcome = UpdateOutcome::default();

    for record in records {
        if record.is_migrated(&config.new_prefix) {
            tracing::debug!(id = record.id, path = %record.path, "Path already migrated");
            outcome.unchanged += 1;
            continue;
        }

        let new_path = record.migrated_path(&config.new_prefix);

        if config.dry_run {
            tracing::info!(
                id = record.id,
                old_path = %record.path,
                new_path = %new_path,
                "Dry run: would update path"
            );
            continue;
        }

        repository.update_path(record.id, &new_path).await.map_err(|e| {
            tracing::error!(error = %e, id = record.id, "Path update failed");
            e
        })?;
        outcome.updated += 1;

        tracing::debug!(id = record.id, old_path = %record.path, new_path = %new_path, "Path updated");
    }

    tracing::info!(
        updated = outcome.updated,
        unchanged = outcome.unchanged,
        "Updated record paths"
    );
    Ok(outcome)
}
