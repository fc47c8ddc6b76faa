//! Avatar Migrate pipeline
//!
//! Moves avatar objects from a legacy bucket and prefix to a production bucket and prefix:
//!
//! 1. select every legacy-prefixed row,
//! 2. server-side copy each object to the production bucket,
//! 3. rewrite each row's path,
//! 4. re-check the whole table and only then delete the legacy objects.
//!
//! Stages return errors instead of exiting; [`run_migration`] maps the final
//! [`PipelineState`](avatar_migrate_core::PipelineState) to a process exit code.

pub mod pipeline;
pub mod stages;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use pipeline::{run_migration, MigrationOutcome, MigrationPipeline};
pub use stages::{UpdateOutcome, Verification};
