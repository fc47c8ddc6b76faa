//! Stage 1: find every record still pointing at the legacy prefix.

use avatar_migrate_core::{AssetRecord, MigrationResult};
use avatar_migrate_db::AssetRepository;

/// All records whose path starts with `prefix`, ascending by id.
///
/// Read-only. An empty result is valid and turns the later stages into no-ops.
#[tracing::instrument(skip(repository), fields(stage = "select"))]
pub async fn select_by_prefix(
    repository: &dyn AssetRepository,
    prefix: &str,
) -> MigrationResult<Vec<AssetRecord>> {
    let mut records = repository.find_by_path_prefix(prefix).await?;

    records.retain(|record| record.path.starts_with(prefix));
    records.sort_by_key(|record| record.id);

    tracing::info!(prefix = %prefix, count = records.len(), "Selected records");
    Ok(records)
}
