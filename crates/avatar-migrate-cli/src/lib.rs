//! Support code for the `avatar-migrate` binary: logging setup and the
//! human-readable lines printed to stdout.

use anyhow::Context;
use avatar_migrate_core::{MigrationConfig, PipelineState};
use avatar_migrate_pipeline::MigrationOutcome;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info";

/// Logging options, read after `.env` has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `RUST_LOG` directives
    pub filter: String,
    /// `LOG_FORMAT=json`
    pub json: bool,
}

impl LogSettings {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            filter: lookup("RUST_LOG")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            json: wants_json_logs(lookup("LOG_FORMAT").as_deref()),
        }
    }
}

/// True when `LOG_FORMAT` asks for JSON log lines.
pub fn wants_json_logs(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|value| value.trim().eq_ignore_ascii_case("json"))
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout only carries the
/// verification report.
pub fn init_tracing(settings: &LogSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&settings.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
    .context("Failed to install tracing subscriber")
}

/// Lines describing how the run ended, for stdout.
pub fn report_lines(outcome: &MigrationOutcome, config: &MigrationConfig) -> Vec<String> {
    let report = &outcome.report;
    let mut lines = Vec::new();

    match report.state {
        PipelineState::Deleted => {
            lines.push(format!(
                "Verification passed: no records reference {}",
                config.legacy_prefix
            ));
            if report.dry_run {
                lines.push(format!(
                    "Dry run: would delete {} legacy object(s) from {}",
                    report.selected, config.legacy_bucket
                ));
            } else {
                lines.push(format!(
                    "Deleted {} legacy object(s) from {}",
                    report.deleted, config.legacy_bucket
                ));
            }
        }
        PipelineState::Aborted | PipelineState::VerifiedDirty => {
            lines.push(format!(
                "Unsafe to delete: {} record(s) still reference {} (ids: {})",
                report.leftover_ids.len(),
                config.legacy_prefix,
                join_ids(&report.leftover_ids)
            ));
            lines.push(format!(
                "No objects were deleted from {}; re-run once these rows are migrated",
                config.legacy_bucket
            ));
        }
        _ => lines.push("Migration failed; see logs for the failing stage".to_string()),
    }

    lines.push(format!("Summary: {report}"));
    lines
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
