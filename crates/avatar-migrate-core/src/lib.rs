//! Avatar Migrate Core Library
//!
//! This crate provides the domain model, error types, configuration and key rules
//! shared by the database, storage and pipeline crates.

pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod storage_types;

// Re-export commonly used types
pub use config::MigrationConfig;
pub use error::{LogLevel, MigrationError, MigrationResult};
pub use models::{AssetRecord, MigrationReport, PipelineState};
pub use storage_types::StorageBackend;
