//! End-to-end cleanup runs against the in-memory data source.

use artifact_cleanup::cleanup::{CleanupEvent, CleanupOptions, run_cleanup};
use artifact_cleanup::core::stats::CleanupStats;
use artifact_cleanup::core::types::{KeepScope, RetentionPolicy};
use artifact_cleanup::report::render_event;
use artifact_cleanup::test_support::{
    FakeRepository, FakeSource, archive, days_ago, fixed_now, job, trace,
};

fn run(source: &FakeSource, repositories: &[&str], policy: RetentionPolicy) -> Vec<String> {
    let mut lines = Vec::new();
    run_cleanup(
        source,
        repositories,
        &CleanupOptions {
            policy,
            dry_run: false,
        },
        fixed_now(),
        |event| lines.push(render_event(event)),
    )
    .expect("cleanup run");
    lines
}

#[test]
fn branch_head_job_survives_and_stale_commit_is_deleted() {
    let policy = RetentionPolicy::new(7, KeepScope::BranchArtifacts, false);

    let head = FakeSource::new().with_repository(
        FakeRepository::new(1, "group/app")
            .branch("main", "C1")
            .job(job(1, days_ago(10), "main", Some("C1"), vec![archive(Some(512))])),
    );
    let lines = run(&head, &["group/app"], policy);
    assert!(head.deleted_artifacts().is_empty());
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Found no old dangling jobs with attached artifacts in project \"group/app\".")
    );

    let stale = FakeSource::new().with_repository(
        FakeRepository::new(1, "group/app")
            .branch("main", "C1")
            .job(job(1, days_ago(10), "main", Some("C2"), vec![archive(Some(512))])),
    );
    let lines = run(&stale, &["group/app"], policy);
    assert_eq!(stale.deleted_artifacts(), vec![1]);
    assert!(lines[1].starts_with("Deleted artifacts of job \"1\""));
    assert!(lines[1].contains("size \"512.00 B\""));
    assert!(lines[1].ends_with(", dangling"));
}

#[test]
fn multi_repository_run_reports_per_repository_and_total() {
    let source = FakeSource::new()
        .with_repository(
            FakeRepository::new(1, "group/quiet")
                .branch("main", "a1")
                .job(job(1, days_ago(30), "main", Some("a1"), vec![archive(Some(1))])),
        )
        .with_repository(
            FakeRepository::new(2, "group/busy")
                .branch("main", "b9")
                .tag("v1.0", "b5")
                .job(job(2, days_ago(30), "main", Some("b1"), vec![archive(Some(100))]))
                .job(job(3, days_ago(20), "feature", Some("b2"), vec![
                    archive(Some(200)),
                    trace(Some(4096)),
                ]))
                .job(job(4, days_ago(20), "v1.0", Some("b5"), vec![archive(Some(999))]))
                .job(job(5, days_ago(2), "feature", Some("b3"), vec![archive(Some(999))])),
        );

    let mut reports = Vec::new();
    let mut total = None;
    let report = run_cleanup(
        &source,
        ["group/quiet", "group/busy"],
        &CleanupOptions {
            policy: RetentionPolicy::default(),
            dry_run: false,
        },
        fixed_now(),
        |event| match event {
            CleanupEvent::RepositorySummary(_) => reports.push(render_event(event)),
            CleanupEvent::RunSummary { .. } => total = Some(render_event(event)),
            _ => {}
        },
    )
    .expect("cleanup run");

    assert_eq!(source.deleted_artifacts(), vec![2, 3]);
    assert_eq!(report.repositories[0].stats, CleanupStats::default());
    assert_eq!(
        report.repositories[1].stats,
        CleanupStats {
            cleaned_jobs: 2,
            reclaimed_bytes: 300
        }
    );
    assert_eq!(
        reports,
        vec![
            "Found no old dangling jobs with attached artifacts in project \"group/quiet\".",
            "Found \"2\" old dangling jobs, with \"300.00 B\" of attached artifacts in total in project \"group/busy\".",
        ]
    );
    assert_eq!(
        total.as_deref(),
        Some("Found \"2\" old dangling jobs, with \"300.00 B\" of attached artifacts in total.")
    );
}

#[test]
fn nothing_found_anywhere_has_dedicated_total() {
    let source = FakeSource::new()
        .with_repository(FakeRepository::new(1, "group/a"))
        .with_repository(FakeRepository::new(2, "group/b"));
    let lines = run(&source, &["group/a", "group/b"], RetentionPolicy::default());
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Found no old dangling jobs with attached artifacts in any project.")
    );
}

#[test]
fn erasing_counts_log_sizes() {
    let source = FakeSource::new().with_repository(
        FakeRepository::new(1, "group/app").job(job(
            1,
            days_ago(30),
            "gone",
            None,
            vec![archive(Some(1024)), trace(Some(512))],
        )),
    );
    let policy = RetentionPolicy::new(7, KeepScope::None, true);
    let lines = run(&source, &["group/app"], policy);

    assert_eq!(source.erased_jobs(), vec![1]);
    assert!(lines[1].starts_with("Deleted artifacts and log of job \"1\""));
    assert!(lines[1].contains("size \"1.50 KiB\""));
}
