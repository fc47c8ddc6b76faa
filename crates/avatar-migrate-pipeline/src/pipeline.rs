//! Orchestrator: runs the stages in order and owns the pipeline state.

use avatar_migrate_core::error::EXIT_FAILURE;
use avatar_migrate_core::{
    AssetRecord, LogLevel, MigrationConfig, MigrationError, MigrationReport, MigrationResult,
    PipelineState,
};
use avatar_migrate_db::AssetRepository;
use avatar_migrate_storage::Storage;

use crate::stages::{
    copy_objects, delete_legacy_objects, select_by_prefix, update_paths,
    verify_no_legacy_references, Verification,
};

/// How a run ended: the collected report plus the error that stopped it, if any.
#[derive(Debug)]
pub struct MigrationOutcome {
    pub report: MigrationReport,
    pub error: Option<MigrationError>,
}

impl MigrationOutcome {
    pub fn state(&self) -> PipelineState {
        self.report.state
    }

    pub fn exit_code(&self) -> i32 {
        self.report.state.exit_code().unwrap_or(EXIT_FAILURE)
    }

    pub fn is_success(&self) -> bool {
        self.report.state == PipelineState::Deleted
    }
}

/// One migration run over a repository and a storage handle.
pub struct MigrationPipeline<'a> {
    repository: &'a dyn AssetRepository,
    storage: &'a dyn Storage,
    config: &'a MigrationConfig,
    report: MigrationReport,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(
        repository: &'a dyn AssetRepository,
        storage: &'a dyn Storage,
        config: &'a MigrationConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            config,
            report: MigrationReport::new(config.dry_run),
        }
    }

    /// Run every stage. Never panics or exits; the outcome carries the final state.
    pub async fn run(mut self) -> MigrationOutcome {
        tracing::info!(
            legacy_bucket = %self.config.legacy_bucket,
            production_bucket = %self.config.production_bucket,
            legacy_prefix = %self.config.legacy_prefix,
            new_prefix = %self.config.new_prefix,
            concurrency = self.config.concurrency,
            dry_run = self.config.dry_run,
            "Starting avatar migration"
        );

        let error = match self.run_stages().await {
            Ok(()) => None,
            Err(e) => {
                match e.log_level() {
                    LogLevel::Warn => tracing::warn!(
                        error = %e,
                        error_code = e.error_code(),
                        "Migration aborted"
                    ),
                    LogLevel::Error => tracing::error!(
                        error = %e,
                        error_code = e.error_code(),
                        asset_id = ?e.asset_id(),
                        state = %self.report.state,
                        "Migration failed"
                    ),
                }
                if !self.report.state.is_terminal() {
                    self.transition(PipelineState::Failed);
                }
                Some(e)
            }
        };

        tracing::info!(summary = %self.report, "Migration finished");

        MigrationOutcome {
            report: self.report,
            error,
        }
    }

    async fn run_stages(&mut self) -> MigrationResult<()> {
        let batch: Vec<AssetRecord> =
            select_by_prefix(self.repository, &self.config.legacy_prefix).await?;
        self.report.selected = batch.len();
        self.transition(PipelineState::Selected);

        self.report.copied = copy_objects(self.storage, self.config, &batch).await?;
        self.transition(PipelineState::Copied);

        let updated = update_paths(self.repository, self.config, &batch).await?;
        self.report.updated = updated.updated;
        self.report.unchanged = updated.unchanged;
        self.transition(PipelineState::Updated);

        match verify_no_legacy_references(self.repository, self.config, &batch).await? {
            Verification::Clean(clean) => {
                self.transition(PipelineState::VerifiedClean);
                self.report.deleted =
                    delete_legacy_objects(self.storage, self.config, &batch, &clean).await?;
                self.transition(PipelineState::Deleted);
                Ok(())
            }
            Verification::Dirty(leftovers) => {
                let ids: Vec<i64> = leftovers.iter().map(|record| record.id).collect();
                self.report.leftover_ids = ids.clone();
                self.transition(PipelineState::VerifiedDirty);
                self.transition(PipelineState::Aborted);
                Err(MigrationError::LegacyReferencesRemain {
                    prefix: self.config.legacy_prefix.clone(),
                    ids,
                })
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        let current = self.report.state;
        debug_assert!(
            current.can_transition_to(next),
            "invalid pipeline transition {} -> {}",
            current,
            next
        );
        tracing::info!(from = %current, to = %next, "Pipeline state transition");
        self.report.state = next;
    }
}

/// Run one migration and return its outcome.
pub async fn run_migration(
    repository: &dyn AssetRepository,
    storage: &dyn Storage,
    config: &MigrationConfig,
) -> MigrationOutcome {
    MigrationPipeline::new(repository, storage, config)
        .run()
        .await
}
