//! Database repositories for the avatar table
//
// Avatar table repository
pub mod asset;
//
// Connection setup
pub mod setup;

pub use asset::PostgresAssetRepository;
pub use setup::connect_database;
