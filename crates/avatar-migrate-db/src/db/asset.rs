//! Asset repository: reads and rewrites the `path` column of the avatar table.

use async_trait::async_trait;
use avatar_migrate_core::config::is_valid_table_name;
use avatar_migrate_core::paths::prefix_pattern;
use avatar_migrate_core::{AssetRecord, MigrationError, MigrationResult};
use sqlx::{PgPool, Postgres};

use crate::repository::AssetRepository;

/// Repository for the avatar table.
#[derive(Clone)]
pub struct PostgresAssetRepository {
    pool: PgPool,
    table: String,
}

impl PostgresAssetRepository {
    /// `table` is interpolated into SQL, so it must be a plain identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> MigrationResult<Self> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(MigrationError::Config(format!(
                "Invalid table name: {}",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl AssetRepository for PostgresAssetRepository {
    #[tracing::instrument(skip(self), fields(db.table = %self.table))]
    async fn find_by_path_prefix(&self, prefix: &str) -> MigrationResult<Vec<AssetRecord>> {
        let query = format!(
            r#"
            SELECT id::bigint AS id, path
            FROM {}
            WHERE path LIKE $1 ESCAPE '\'
            ORDER BY id ASC
            "#,
            self.table
        );

        let rows = sqlx::query_as::<Postgres, AssetRecord>(&query)
            .bind(prefix_pattern(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(MigrationError::Query)?;

        tracing::debug!(count = rows.len(), "Selected records by path prefix");
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.table))]
    async fn find_by_id(&self, id: i64) -> MigrationResult<Option<AssetRecord>> {
        let query = format!(
            "SELECT id::bigint AS id, path FROM {} WHERE id = $1",
            self.table
        );

        sqlx::query_as::<Postgres, AssetRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(MigrationError::Query)
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.table))]
    async fn update_path(&self, id: i64, path: &str) -> MigrationResult<()> {
        let query = format!("UPDATE {} SET path = $1 WHERE id = $2", self.table);

        let result = sqlx::query(&query)
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|source| MigrationError::Update { id, source })?;

        if result.rows_affected() == 0 {
            return Err(MigrationError::AssetNotFound(id));
        }

        Ok(())
    }
}
