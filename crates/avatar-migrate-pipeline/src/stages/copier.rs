//! Stage 2: server-side copy of every selected object into the production bucket.

use std::collections::BTreeMap;

use avatar_migrate_core::{AssetRecord, MigrationConfig, MigrationError, MigrationResult};
use avatar_migrate_storage::Storage;
use futures::stream::{self, TryStreamExt};

/// Copy `legacy_bucket/record.path` to `production_bucket/new_prefix + filename` for
/// each record. Returns the number of objects copied.
///
/// Nothing is copied if two records would land on the same key. Otherwise the first
/// failure stops the stage and objects copied before it stay in place.
#[tracing::instrument(skip_all, fields(stage = "copy", records = records.len()))]
pub async fn copy_objects(
    storage: &dyn Storage,
    config: &MigrationConfig,
    records: &[AssetRecord],
) -> MigrationResult<usize> {
    ensure_distinct_targets(config, records)?;

    if config.dry_run {
        for record in records {
            tracing::info!(
                id = record.id,
                from = %format!("{}/{}", config.legacy_bucket, record.path),
                to = %format!("{}/{}", config.production_bucket, record.migrated_path(&config.new_prefix)),
                "Dry run: would copy object"
            );
        }
        return Ok(0);
    }

    stream::iter(records.iter().map(Ok::<_, MigrationError>))
        .try_for_each_concurrent(config.concurrency, |record| async move {
            copy_one(storage, config, record).await
        })
        .await?;

    tracing::info!(copied = records.len(), "Copied objects to production bucket");
    Ok(records.len())
}

/// Reject a batch in which records from different legacy directories share a filename,
/// since their migrated keys would collide in the production bucket.
pub fn ensure_distinct_targets(
    config: &MigrationConfig,
    records: &[AssetRecord],
) -> MigrationResult<()> {
    let mut targets: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records {
        targets
            .entry(record.migrated_path(&config.new_prefix))
            .or_default()
            .push(record.id);
    }

    match targets.into_iter().find(|(_, ids)| ids.len() > 1) {
        Some((key, ids)) => {
            tracing::error!(key = %key, ids = ?ids, "Records share a migrated key");
            Err(MigrationError::DuplicateTarget { key, ids })
        }
        None => Ok(()),
    }
}

async fn copy_one(
    storage: &dyn Storage,
    config: &MigrationConfig,
    record: &AssetRecord,
) -> MigrationResult<()> {
    let to_key = record.migrated_path(&config.new_prefix);

    storage
        .copy(
            &config.legacy_bucket,
            &record.path,
            &config.production_bucket,
            &to_key,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                id = record.id,
                key = %record.path,
                "Copy failed"
            );
            MigrationError::Copy {
                id: record.id,
                from: format!("{}/{}", config.legacy_bucket, record.path),
                to: format!("{}/{}", config.production_bucket, to_key),
                message: e.to_string(),
            }
        })
}
