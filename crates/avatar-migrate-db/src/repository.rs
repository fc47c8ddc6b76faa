//! Repository trait abstraction for the pipeline
//!
//! The pipeline only needs three operations from the avatar table. Keeping them behind a
//! trait lets every stage run against an in-memory repository in tests.

use async_trait::async_trait;
use avatar_migrate_core::{AssetRecord, MigrationResult};

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Every record whose path starts with `prefix` (literal match), ordered by id ascending.
    ///
    /// Scans the whole table; callers rely on this for the pre-delete safety check.
    async fn find_by_path_prefix(&self, prefix: &str) -> MigrationResult<Vec<AssetRecord>>;

    /// Get a single record by id
    async fn find_by_id(&self, id: i64) -> MigrationResult<Option<AssetRecord>>;

    /// Persist `path` for record `id`. Each call commits on its own.
    async fn update_path(&self, id: i64, path: &str) -> MigrationResult<()>;
}
