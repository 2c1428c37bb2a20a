//! Shared deterministic types for the retention core.
//!
//! These types describe what the data source reports about a repository and
//! what the caller wants kept. They carry no I/O and no wall-clock reads.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// File type GitLab assigns to the downloadable build archive of a job.
pub const ARCHIVE_FILE_TYPE: &str = "archive";

/// A single file attached to a job (build archive, trace log, metadata, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub file_type: String,
    /// Size in bytes; the server omits it for some artifact kinds.
    pub size: Option<u64>,
}

impl Artifact {
    pub fn is_archive(&self) -> bool {
        self.file_type == ARCHIVE_FILE_TYPE
    }
}

/// A CI/CD job as reported by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    /// Branch or tag name the job ran on.
    pub git_ref: String,
    /// Commit the job ran on. `None` once the pipeline commit is gone.
    pub commit_id: Option<String>,
    pub artifacts: Vec<Artifact>,
    /// Set when the job was already erased (artifacts and log removed).
    pub erased_at: Option<DateTime<Utc>>,
}

/// Name → commit mapping for either branches (head commit) or tags.
///
/// Rebuilt for every repository scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefIndex {
    commits: HashMap<String, String>,
}

impl RefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, commit_id: impl Into<String>) {
        self.commits.insert(name.into(), commit_id.into());
    }

    pub fn commit_of(&self, name: &str) -> Option<&str> {
        self.commits.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Return `git_ref` if the index maps it to exactly `commit_id`.
    ///
    /// A job without a commit never links to anything.
    pub fn link<'a>(&self, git_ref: &'a str, commit_id: Option<&str>) -> Option<&'a str> {
        let commit_id = commit_id?;
        (self.commit_of(git_ref) == Some(commit_id)).then_some(git_ref)
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for RefIndex {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut index = RefIndex::new();
        for (name, commit_id) in iter {
            index.insert(name, commit_id);
        }
        index
    }
}

/// Branch name → current head commit.
pub type BranchIndex = RefIndex;
/// Tag name → tagged commit.
pub type TagIndex = RefIndex;

/// Which artifacts are always kept regardless of their age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepScope {
    None,
    BranchArtifacts,
    TagArtifacts,
    BranchAndTagArtifacts,
}

impl KeepScope {
    pub const CHOICES: [&'static str; 4] = [
        "none",
        "branch_artifacts",
        "tag_artifacts",
        "branch_and_tag_artifacts",
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "branch_artifacts" => Some(Self::BranchArtifacts),
            "tag_artifacts" => Some(Self::TagArtifacts),
            "branch_and_tag_artifacts" => Some(Self::BranchAndTagArtifacts),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BranchArtifacts => "branch_artifacts",
            Self::TagArtifacts => "tag_artifacts",
            Self::BranchAndTagArtifacts => "branch_and_tag_artifacts",
        }
    }

    pub fn protects_branch_heads(self) -> bool {
        matches!(self, Self::BranchArtifacts | Self::BranchAndTagArtifacts)
    }

    pub fn protects_tags(self) -> bool {
        matches!(self, Self::TagArtifacts | Self::BranchAndTagArtifacts)
    }
}

/// Immutable retention policy applied to every job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Jobs not older than this are always kept.
    pub min_age: TimeDelta,
    /// Keep artifacts of jobs that ran on the current head of a branch.
    pub protect_branch_heads: bool,
    /// Keep artifacts of jobs that ran on a tagged commit.
    pub protect_tags: bool,
    /// Erase the whole job (artifacts and log) instead of deleting artifacts only.
    pub delete_logs: bool,
}

impl RetentionPolicy {
    pub fn new(days_to_keep: u32, keep: KeepScope, delete_logs: bool) -> Self {
        Self {
            min_age: TimeDelta::days(i64::from(days_to_keep)),
            protect_branch_heads: keep.protects_branch_heads(),
            protect_tags: keep.protects_tags(),
            delete_logs,
        }
    }

    /// True when the log is preserved and only artifacts are removed.
    pub fn artifacts_only(&self) -> bool {
        !self.delete_logs
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(7, KeepScope::BranchAndTagArtifacts, false)
    }
}
