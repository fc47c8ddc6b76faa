//! Avatar Migrate database layer
//!
//! Postgres access for the avatar table plus the [`AssetRepository`] trait the pipeline
//! is written against.

pub mod db;
pub mod repository;

pub use db::{connect_database, PostgresAssetRepository};
pub use repository::AssetRepository;
