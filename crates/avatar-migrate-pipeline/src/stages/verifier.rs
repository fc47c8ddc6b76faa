//! Stage 4: whole-table safety check, then removal of the legacy objects.

use std::collections::HashSet;

use avatar_migrate_core::{AssetRecord, MigrationConfig, MigrationError, MigrationResult};
use avatar_migrate_db::AssetRepository;
use avatar_migrate_storage::Storage;
use futures::stream::{self, TryStreamExt};

use super::selector::select_by_prefix;

/// Proof that the safety check found no legacy references. Only
/// [`verify_no_legacy_references`] can create one, and deleting requires it.
#[derive(Debug)]
pub struct CleanTable {
    _private: (),
}

/// Result of the safety check.
#[derive(Debug)]
pub enum Verification {
    Clean(CleanTable),
    /// Records anywhere in the table still carrying the legacy prefix.
    Dirty(Vec<AssetRecord>),
}

/// Re-select the legacy prefix over the entire table.
///
/// In dry-run mode the rows of `batch` are still legacy-prefixed because nothing was
/// rewritten, so they are left out; anything else found would block a real run.
#[tracing::instrument(skip_all, fields(stage = "verify"))]
pub async fn verify_no_legacy_references(
    repository: &dyn AssetRepository,
    config: &MigrationConfig,
    batch: &[AssetRecord],
) -> MigrationResult<Verification> {
    let mut leftovers = select_by_prefix(repository, &config.legacy_prefix).await?;

    if config.dry_run {
        let batch_ids: HashSet<i64> = batch.iter().map(|record| record.id).collect();
        leftovers.retain(|record| !batch_ids.contains(&record.id));
    }

    if leftovers.is_empty() {
        tracing::info!(prefix = %config.legacy_prefix, "No legacy references remain");
        Ok(Verification::Clean(CleanTable { _private: () }))
    } else {
        tracing::warn!(
            prefix = %config.legacy_prefix,
            count = leftovers.len(),
            ids = ?leftovers.iter().map(|r| r.id).collect::<Vec<_>>(),
            "Legacy references remain, skipping delete"
        );
        Ok(Verification::Dirty(leftovers))
    }
}

/// Delete the original legacy object of every record in the batch captured by the
/// selector. Returns the number of objects deleted.
#[tracing::instrument(skip_all, fields(stage = "delete", records = records.len()))]
pub async fn delete_legacy_objects(
    storage: &dyn Storage,
    config: &MigrationConfig,
    records: &[AssetRecord],
    _clean: &CleanTable,
) -> MigrationResult<usize> {
    if config.dry_run {
        for record in records {
            tracing::info!(
                id = record.id,
                bucket = %config.legacy_bucket,
                key = %record.path,
                "Dry run: would delete legacy object"
            );
        }
        return Ok(0);
    }

    stream::iter(records.iter().map(Ok::<_, MigrationError>))
        .try_for_each_concurrent(config.concurrency, |record| async move {
            storage
                .delete(&config.legacy_bucket, &record.path)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, id = record.id, key = %record.path, "Delete failed");
                    MigrationError::Delete {
                        id: record.id,
                        key: record.path.clone(),
                        message: e.to_string(),
                    }
                })
        })
        .await?;

    tracing::info!(deleted = records.len(), "Deleted legacy objects");
    Ok(records.len())
}
