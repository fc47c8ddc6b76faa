//! Error types module
//!
//! All pipeline failures are unified under `MigrationError`. Stages never terminate the
//! process themselves; they return one of these values and the orchestrator maps it to
//! an exit code through [`MigrationError::exit_code`].

use sqlx::Error as SqlxError;

/// Exit code for a run that completed every stage.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for any stage-local failure (connection, query, copy, update, delete).
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for the safety check: legacy references remain, nothing was deleted.
pub const EXIT_LEGACY_REFERENCES_REMAIN: i32 = 2;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes the operator must act on
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database connection failed: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database query failed: {0}")]
    Query(#[source] SqlxError),

    #[error("Failed to update path for asset {id}: {source}")]
    Update {
        id: i64,
        #[source]
        source: SqlxError,
    },

    #[error("Asset {0} not found while updating its path")]
    AssetNotFound(i64),

    #[error("Storage setup failed: {0}")]
    Storage(String),

    #[error("Failed to copy {from} to {to} for asset {id}: {message}")]
    Copy {
        id: i64,
        from: String,
        to: String,
        message: String,
    },

    #[error("Assets {ids:?} would all be copied to {key}")]
    DuplicateTarget { key: String, ids: Vec<i64> },

    #[error("Failed to delete {key} for asset {id}: {message}")]
    Delete {
        id: i64,
        key: String,
        message: String,
    },

    #[error("{} record(s) still reference the legacy prefix {prefix}: {ids:?}", ids.len())]
    LegacyReferencesRemain { prefix: String, ids: Vec<i64> },
}

impl MigrationError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::LegacyReferencesRemain { .. } => EXIT_LEGACY_REFERENCES_REMAIN,
            _ => EXIT_FAILURE,
        }
    }

    /// Machine-readable error code (e.g., "COPY_FAILED"), used as a log field.
    pub fn error_code(&self) -> &'static str {
        match self {
            MigrationError::Config(_) => "CONFIG_ERROR",
            MigrationError::Connection(_) => "CONNECTION_FAILED",
            MigrationError::Query(_) => "QUERY_FAILED",
            MigrationError::Update { .. } => "UPDATE_FAILED",
            MigrationError::AssetNotFound(_) => "ASSET_NOT_FOUND",
            MigrationError::Storage(_) => "STORAGE_SETUP_FAILED",
            MigrationError::Copy { .. } => "COPY_FAILED",
            MigrationError::DuplicateTarget { .. } => "DUPLICATE_TARGET",
            MigrationError::Delete { .. } => "DELETE_FAILED",
            MigrationError::LegacyReferencesRemain { .. } => "LEGACY_REFERENCES_REMAIN",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            MigrationError::LegacyReferencesRemain { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Identifier of the asset the failure is attached to, if any.
    pub fn asset_id(&self) -> Option<i64> {
        match self {
            MigrationError::Update { id, .. }
            | MigrationError::Copy { id, .. }
            | MigrationError::Delete { id, .. }
            | MigrationError::AssetNotFound(id) => Some(*id),
            MigrationError::DuplicateTarget { ids, .. } => ids.first().copied(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for MigrationError {
    fn from(err: anyhow::Error) -> Self {
        MigrationError::Config(err.to_string())
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
