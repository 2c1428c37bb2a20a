//! Keep-or-delete decision for a single job.
//!
//! `decide` is pure: the caller supplies the branch and tag indices of the
//! repository and the reference time `now`, so identical inputs always yield
//! identical decisions.

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::core::size::human_size;
use crate::core::types::{BranchIndex, Job, RetentionPolicy, TagIndex};

/// Why a job keeps its artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The job has no artifact records at all.
    NoArtifacts,
    /// Only non-archive artifacts exist and the log is not being erased.
    NoArchive,
    /// The job ran on the current head of a branch.
    BranchHead,
    /// The job ran on a tagged commit.
    Tagged,
    /// The job is not older than the retention threshold.
    TooYoung,
}

/// References a job is still attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobLinks {
    pub branch: Option<String>,
    pub tag: Option<String>,
}

impl JobLinks {
    pub fn is_dangling(&self) -> bool {
        self.branch.is_none() && self.tag.is_none()
    }
}

/// A job selected for cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub job_id: u64,
    /// Bytes freed by the cleanup (archives only unless logs are erased too).
    pub reclaimable_bytes: u64,
    pub links: JobLinks,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Delete(Deletion),
}

/// Decide whether `job` is disposable under `policy` at time `now`.
///
/// Guards run in a fixed order and the first match wins: no artifacts, no
/// archive (artifacts-only mode), protected branch head, protected tag, too
/// young. A job exactly `min_age` old is still kept.
pub fn decide(
    job: &Job,
    branches: &BranchIndex,
    tags: &TagIndex,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Decision {
    if job.artifacts.is_empty() {
        return Decision::Skip(SkipReason::NoArtifacts);
    }

    let commit_id = job.commit_id.as_deref();
    let job_branch = branches.link(&job.git_ref, commit_id);
    let job_tag = tags.link(&job.git_ref, commit_id);

    if policy.artifacts_only() && !job.artifacts.iter().any(|artifact| artifact.is_archive()) {
        return Decision::Skip(SkipReason::NoArchive);
    }
    if policy.protect_branch_heads && job_branch.is_some() {
        return Decision::Skip(SkipReason::BranchHead);
    }
    if policy.protect_tags && job_tag.is_some() {
        return Decision::Skip(SkipReason::Tagged);
    }
    if now - job.created_at <= policy.min_age {
        return Decision::Skip(SkipReason::TooYoung);
    }

    let reclaimable_bytes: u64 = job
        .artifacts
        .iter()
        .filter(|artifact| policy.delete_logs || artifact.is_archive())
        .map(|artifact| artifact.size.unwrap_or(0))
        .sum();

    Decision::Delete(Deletion {
        job_id: job.id,
        reclaimable_bytes,
        description: describe_job(
            job.id,
            job.created_at,
            reclaimable_bytes,
            job_branch,
            job_tag,
        ),
        links: JobLinks {
            branch: job_branch.map(str::to_string),
            tag: job_tag.map(str::to_string),
        },
    })
}

/// Describe a job for log output, with its creation time in local time.
pub fn describe_job(
    job_id: u64,
    created_at: DateTime<Utc>,
    size_bytes: u64,
    branch: Option<&str>,
    tag: Option<&str>,
) -> String {
    describe_job_in(&Local, job_id, created_at, size_bytes, branch, tag)
}

/// Same as [`describe_job`], rendering `created_at` in the time zone `tz`.
pub fn describe_job_in<Tz: TimeZone>(
    tz: &Tz,
    job_id: u64,
    created_at: DateTime<Utc>,
    size_bytes: u64,
    branch: Option<&str>,
    tag: Option<&str>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let created_at = created_at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S");
    let mut description = format!(
        "job \"{job_id}\", created at \"{created_at}\", size \"{}\"",
        human_size(size_bytes)
    );
    match (branch, tag) {
        (Some(branch), Some(tag)) => {
            description.push_str(&format!(", linked to branch \"{branch}\" and tag \"{tag}\""));
        }
        (Some(branch), None) => description.push_str(&format!(", linked to branch \"{branch}\"")),
        (None, Some(tag)) => description.push_str(&format!(", linked to tag \"{tag}\"")),
        (None, None) => description.push_str(", dangling"),
    }
    description
}
