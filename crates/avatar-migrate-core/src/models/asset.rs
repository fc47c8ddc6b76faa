//! Asset record model: one row of the avatar table.

use crate::paths;

/// A database row pairing an identifier with the object key it references.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AssetRecord {
    pub id: i64,
    pub path: String,
}

impl AssetRecord {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// Final path segment, used as the object name under the new prefix.
    pub fn filename(&self) -> &str {
        paths::basename(&self.path)
    }

    /// Path this record is rewritten to under `new_prefix`.
    pub fn migrated_path(&self, new_prefix: &str) -> String {
        paths::rewrite_path(&self.path, new_prefix)
    }

    pub fn is_migrated(&self, new_prefix: &str) -> bool {
        self.path == self.migrated_path(new_prefix)
    }
}
