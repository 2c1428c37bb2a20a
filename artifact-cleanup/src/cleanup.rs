//! Cleanup orchestration over one or many repositories.

use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::core::retention::{Decision, Deletion, SkipReason, decide};
use crate::core::stats::{CleanupStats, RepositoryReport, RunReport};
use crate::core::types::{RefIndex, RetentionPolicy};
use crate::error::{CleanupError, HttpStatusError};
use crate::io::source::{Listing, RefHead, RepositoryDataSource, RepositoryHandle};

/// Settings that stay fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    pub policy: RetentionPolicy,
    /// Report what would be cleaned without calling the data source.
    pub dry_run: bool,
}

/// Remote operation used to clean a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    /// Remove the artifacts, keep the job log.
    DeleteArtifacts,
    /// Remove artifacts and job log.
    EraseJob,
}

impl CleanupAction {
    fn for_policy(policy: &RetentionPolicy) -> Self {
        if policy.delete_logs {
            Self::EraseJob
        } else {
            Self::DeleteArtifacts
        }
    }
}

/// Progress reported to the caller while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupEvent {
    ScanningRepository {
        repository: String,
    },
    /// A job was cleaned, or would have been in a dry run.
    JobCleaned {
        repository: String,
        action: CleanupAction,
        dry_run: bool,
        deletion: Deletion,
    },
    RepositorySummary(RepositoryReport),
    /// Emitted only when more than one repository was processed.
    RunSummary {
        total: CleanupStats,
    },
}

/// Clean every repository in `repositories`, in the given order.
///
/// Stops at the first repository that cannot be resolved
/// ([`CleanupError::RepositoryLookup`]) and at the first failing listing or
/// deletion call; nothing after the failure is processed.
pub fn run_cleanup<S, I, F>(
    source: &S,
    repositories: I,
    options: &CleanupOptions,
    now: DateTime<Utc>,
    mut on_event: F,
) -> Result<RunReport>
where
    S: RepositoryDataSource + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: FnMut(&CleanupEvent),
{
    let mut report = RunReport::default();
    for identifier in repositories {
        let repository = clean_repository(source, identifier.as_ref(), options, now, &mut on_event)?;
        on_event(&CleanupEvent::RepositorySummary(repository.clone()));
        report.push(repository);
    }
    if report.repositories.len() > 1 {
        on_event(&CleanupEvent::RunSummary {
            total: report.total,
        });
    }
    Ok(report)
}

#[instrument(skip_all, fields(repository = identifier, dry_run = options.dry_run))]
fn clean_repository<S, F>(
    source: &S,
    identifier: &str,
    options: &CleanupOptions,
    now: DateTime<Utc>,
    on_event: &mut F,
) -> Result<RepositoryReport>
where
    S: RepositoryDataSource + ?Sized,
    F: FnMut(&CleanupEvent),
{
    let handle = source
        .resolve(identifier)
        .map_err(|err| lookup_error(err, identifier))?;
    on_event(&CleanupEvent::ScanningRepository {
        repository: handle.path.clone(),
    });

    let branches = build_index(source.list_branches(&handle), "branches", &handle)?;
    let tags = build_index(source.list_tags(&handle), "tags", &handle)?;
    debug!(branches = branches.len(), tags = tags.len(), "reference index built");

    let action = CleanupAction::for_policy(&options.policy);
    let mut stats = CleanupStats::default();
    for job in source.list_jobs(&handle) {
        let job = job.map_err(|err| listing_error(err, "jobs", &handle))?;
        let deletion = match decide(&job, &branches, &tags, &options.policy, now) {
            Decision::Delete(deletion) => deletion,
            Decision::Skip(reason) => {
                if reason == SkipReason::NoArtifacts && job.erased_at.is_some() {
                    debug!(job_id = job.id, "job already erased");
                } else {
                    debug!(job_id = job.id, ?reason, "keeping job");
                }
                continue;
            }
        };

        if !options.dry_run {
            let outcome = match action {
                CleanupAction::DeleteArtifacts => source.delete_artifacts(&handle, &job),
                CleanupAction::EraseJob => source.erase_job(&handle, &job),
            };
            outcome.map_err(|err| {
                wrap_unless_auth(err, |reason| CleanupError::Deletion {
                    job_id: job.id,
                    repository: handle.path.clone(),
                    reason,
                })
            })?;
        }
        stats.record(deletion.reclaimable_bytes);
        on_event(&CleanupEvent::JobCleaned {
            repository: handle.path.clone(),
            action,
            dry_run: options.dry_run,
            deletion,
        });
    }

    Ok(RepositoryReport {
        repository: handle.path,
        stats,
    })
}

fn build_index(
    listing: Listing<'_, RefHead>,
    what: &'static str,
    handle: &RepositoryHandle,
) -> Result<RefIndex> {
    let mut index = RefIndex::new();
    for head in listing {
        let head = head.map_err(|err| listing_error(err, what, handle))?;
        index.insert(head.name, head.commit_id);
    }
    Ok(index)
}

/// Only an error status from the server means the repository is unknown;
/// transport failures and rejected tokens pass through unchanged.
fn lookup_error(err: Error, identifier: &str) -> Error {
    if err.downcast_ref::<HttpStatusError>().is_none() {
        return err;
    }
    Error::new(CleanupError::RepositoryLookup {
        identifier: identifier.to_string(),
        reason: format!("{err:#}"),
    })
}

fn listing_error(err: Error, what: &'static str, handle: &RepositoryHandle) -> Error {
    wrap_unless_auth(err, |reason| CleanupError::Listing {
        what,
        repository: handle.path.clone(),
        reason,
    })
}

/// Authentication failures keep their identity; everything else is wrapped.
fn wrap_unless_auth(err: Error, wrap: impl FnOnce(String) -> CleanupError) -> Error {
    let is_auth = matches!(
        err.downcast_ref::<CleanupError>(),
        Some(CleanupError::Authentication { .. })
    );
    if is_auth {
        return err;
    }
    Error::new(wrap(format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::KeepScope;
    use crate::test_support::{FakeRepository, FakeSource, archive, days_ago, fixed_now, job};

    fn options(dry_run: bool, delete_logs: bool) -> CleanupOptions {
        CleanupOptions {
            policy: RetentionPolicy::new(7, KeepScope::BranchAndTagArtifacts, delete_logs),
            dry_run,
        }
    }

    fn source_with_one_stale_job() -> FakeSource {
        FakeSource::new().with_repository(
            FakeRepository::new(1, "group/app")
                .branch("main", "c1")
                .job(job(10, days_ago(10), "main", Some("c1"), vec![archive(Some(5))]))
                .job(job(11, days_ago(10), "main", Some("c0"), vec![archive(Some(7))])),
        )
    }

    #[test]
    fn deletes_only_disposable_jobs() {
        let source = source_with_one_stale_job();
        let mut events = Vec::new();
        let report = run_cleanup(&source, ["group/app"], &options(false, false), fixed_now(), |e| {
            events.push(e.clone())
        })
        .expect("run");

        assert_eq!(source.deleted_artifacts(), vec![11]);
        assert!(source.erased_jobs().is_empty());
        assert_eq!(
            report.total,
            CleanupStats {
                cleaned_jobs: 1,
                reclaimed_bytes: 7
            }
        );
        assert!(matches!(events[0], CleanupEvent::ScanningRepository { .. }));
        assert!(matches!(
            &events[1],
            CleanupEvent::JobCleaned { action: CleanupAction::DeleteArtifacts, dry_run: false, deletion, .. }
                if deletion.job_id == 11
        ));
        assert!(matches!(events[2], CleanupEvent::RepositorySummary(_)));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn erases_jobs_when_deleting_logs() {
        let source = source_with_one_stale_job();
        run_cleanup(&source, ["group/app"], &options(false, true), fixed_now(), |_| {})
            .expect("run");
        assert_eq!(source.erased_jobs(), vec![11]);
        assert!(source.deleted_artifacts().is_empty());
    }

    #[test]
    fn dry_run_never_calls_the_source() {
        let source = source_with_one_stale_job();
        let mut dry_runs = Vec::new();
        let report = run_cleanup(&source, ["group/app"], &options(true, false), fixed_now(), |e| {
            if let CleanupEvent::JobCleaned { dry_run, .. } = e {
                dry_runs.push(*dry_run);
            }
        })
        .expect("run");

        assert!(source.deleted_artifacts().is_empty());
        assert!(source.erased_jobs().is_empty());
        assert_eq!(dry_runs, vec![true]);
        assert_eq!(report.total.cleaned_jobs, 1);
    }

    #[test]
    fn unknown_repository_aborts_before_later_ones() {
        let source = source_with_one_stale_job();
        let mut scanned = Vec::new();
        let err = run_cleanup(
            &source,
            ["group/missing", "group/app"],
            &options(false, false),
            fixed_now(),
            |e| {
                if let CleanupEvent::ScanningRepository { repository } = e {
                    scanned.push(repository.clone());
                }
            },
        )
        .expect_err("lookup failure");

        match err.downcast_ref::<CleanupError>() {
            Some(CleanupError::RepositoryLookup { identifier, .. }) => {
                assert_eq!(identifier, "group/missing");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(scanned.is_empty());
        assert!(source.deleted_artifacts().is_empty());
    }

    #[test]
    fn deletion_failure_stops_the_repository() {
        let source = FakeSource::new().with_repository(
            FakeRepository::new(1, "group/app")
                .job(job(1, days_ago(30), "gone", None, vec![archive(Some(1))]))
                .job(job(2, days_ago(30), "gone", None, vec![archive(Some(1))]))
                .failing_deletion(1),
        );
        let err = run_cleanup(&source, ["group/app"], &options(false, false), fixed_now(), |_| {})
            .expect_err("deletion failure");

        assert!(matches!(
            err.downcast_ref::<CleanupError>(),
            Some(CleanupError::Deletion { job_id: 1, .. })
        ));
        assert!(source.deleted_artifacts().is_empty());
    }

    #[test]
    fn listing_failure_is_reported_as_listing_error() {
        let source = FakeSource::new()
            .with_repository(FakeRepository::new(1, "group/app").failing_jobs_listing());
        let err = run_cleanup(&source, ["group/app"], &options(false, false), fixed_now(), |_| {})
            .expect_err("listing failure");
        assert!(matches!(
            err.downcast_ref::<CleanupError>(),
            Some(CleanupError::Listing { what: "jobs", .. })
        ));
    }

    #[test]
    fn authentication_failure_is_not_rewrapped() {
        let source = FakeSource::new().rejecting_token();
        let err = run_cleanup(&source, ["group/app"], &options(false, false), fixed_now(), |_| {})
            .expect_err("auth failure");
        assert!(matches!(
            err.downcast_ref::<CleanupError>(),
            Some(CleanupError::Authentication { .. })
        ));
    }

    #[test]
    fn unreachable_server_is_not_a_lookup_failure() {
        let source = source_with_one_stale_job().unreachable();
        let err = run_cleanup(&source, ["group/app"], &options(false, false), fixed_now(), |_| {})
            .expect_err("transport failure");
        assert!(err.downcast_ref::<CleanupError>().is_none());
        assert!(format!("{err:#}").contains("send request"));
    }

    #[test]
    fn single_repository_has_no_run_summary() {
        let source = source_with_one_stale_job();
        let mut saw_run_summary = false;
        run_cleanup(&source, vec!["group/app".to_string()], &options(true, false), fixed_now(), |e| {
            saw_run_summary |= matches!(e, CleanupEvent::RunSummary { .. });
        })
        .expect("run");
        assert!(!saw_run_summary);
    }
}
