//! Log lines for cleanup events.
//!
//! The orchestrator emits [`CleanupEvent`]s as data; this module is the sink
//! used by the binary.

use tracing::info;

use crate::cleanup::{CleanupAction, CleanupEvent};
use crate::core::size::human_size;

/// Render an event as a single human-readable line.
pub fn render_event(event: &CleanupEvent) -> String {
    match event {
        CleanupEvent::ScanningRepository { repository } => {
            format!("Scanning project \"{repository}\"...")
        }
        CleanupEvent::JobCleaned {
            action,
            dry_run,
            deletion,
            ..
        } => {
            let verb = if *dry_run { "Would delete" } else { "Deleted" };
            let what = match action {
                CleanupAction::DeleteArtifacts => "artifacts",
                CleanupAction::EraseJob => "artifacts and log",
            };
            format!("{verb} {what} of {}", deletion.description)
        }
        CleanupEvent::RepositorySummary(report) if report.stats.is_empty() => format!(
            "Found no old dangling jobs with attached artifacts in project \"{}\".",
            report.repository
        ),
        CleanupEvent::RepositorySummary(report) => format!(
            "Found \"{}\" old dangling jobs, with \"{}\" of attached artifacts in total in project \"{}\".",
            report.stats.cleaned_jobs,
            human_size(report.stats.reclaimed_bytes),
            report.repository
        ),
        CleanupEvent::RunSummary { total } if total.is_empty() => {
            "Found no old dangling jobs with attached artifacts in any project.".to_string()
        }
        CleanupEvent::RunSummary { total } => format!(
            "Found \"{}\" old dangling jobs, with \"{}\" of attached artifacts in total.",
            total.cleaned_jobs,
            human_size(total.reclaimed_bytes)
        ),
    }
}

/// Log `event` at info level.
pub fn log_event(event: &CleanupEvent) {
    info!("{}", render_event(event));
}
