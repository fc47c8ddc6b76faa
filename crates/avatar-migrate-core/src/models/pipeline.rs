//! Pipeline state machine and run report.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::{EXIT_FAILURE, EXIT_LEGACY_REFERENCES_REMAIN, EXIT_SUCCESS};

/// Where a migration run currently is.
///
/// ```text
/// Start -> Selected -> Copied -> Updated -> VerifiedClean -> Deleted
///                                        \-> VerifiedDirty -> Aborted
/// any non-terminal state -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Selected,
    Copied,
    Updated,
    VerifiedClean,
    VerifiedDirty,
    Deleted,
    Aborted,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Deleted | PipelineState::Aborted | PipelineState::Failed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == Failed {
            return !self.is_terminal() && *self != VerifiedDirty;
        }

        matches!(
            (self, next),
            (Start, Selected)
                | (Selected, Copied)
                | (Copied, Updated)
                | (Updated, VerifiedClean)
                | (Updated, VerifiedDirty)
                | (VerifiedClean, Deleted)
                | (VerifiedDirty, Aborted)
        )
    }

    /// Exit code for a terminal state, `None` while the run is still in progress.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineState::Deleted => Some(EXIT_SUCCESS),
            PipelineState::Aborted => Some(EXIT_LEGACY_REFERENCES_REMAIN),
            PipelineState::Failed => Some(EXIT_FAILURE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Start => "start",
            PipelineState::Selected => "selected",
            PipelineState::Copied => "copied",
            PipelineState::Updated => "updated",
            PipelineState::VerifiedClean => "verified_clean",
            PipelineState::VerifiedDirty => "verified_dirty",
            PipelineState::Deleted => "deleted",
            PipelineState::Aborted => "aborted",
            PipelineState::Failed => "failed",
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub state: PipelineState,
    pub dry_run: bool,
    pub selected: usize,
    pub copied: usize,
    pub updated: usize,
    /// Records whose path already matched the target and needed no write.
    pub unchanged: usize,
    pub deleted: usize,
    /// Legacy-prefixed ids seen by the safety check.
    pub leftover_ids: Vec<i64>,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            state: PipelineState::Start,
            dry_run,
            selected: 0,
            copied: 0,
            updated: 0,
            unchanged: 0,
            deleted: 0,
            leftover_ids: Vec::new(),
        }
    }
}

impl Display for MigrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}state={} selected={} copied={} updated={} unchanged={} deleted={} leftover={}",
            if self.dry_run { "[dry-run] " } else { "" },
            self.state,
            self.selected,
            self.copied,
            self.updated,
            self.unchanged,
            self.deleted,
            self.leftover_ids.len()
        )
    }
}
