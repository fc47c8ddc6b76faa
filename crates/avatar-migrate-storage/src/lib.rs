//! Avatar Migrate Storage Library
//!
//! This crate provides the bucket-aware storage abstraction and implementations for S3
//! and the local filesystem.
//!
//! # Key format
//!
//! Keys are the record paths as stored in the avatar table (`image/a.png`,
//! `avatar/a.png`). Keys must not contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use avatar_migrate_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
