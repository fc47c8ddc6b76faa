//! The four pipeline stages, in execution order.

pub mod copier;
pub mod selector;
pub mod updater;
pub mod verifier;

pub use copier::{copy_objects, ensure_distinct_targets};
pub use selector::select_by_prefix;
pub use updater::{update_paths, UpdateOutcome};
pub use verifier::{delete_legacy_objects, verify_no_legacy_references, CleanTable, Verification};
