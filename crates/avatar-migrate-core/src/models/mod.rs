pub mod asset;
pub mod pipeline;

pub use asset::AssetRecord;
pub use pipeline::{MigrationReport, PipelineState};
