//! Test-only helpers: job builders and an in-memory repository data source.

use std::cell::RefCell;
use std::collections::HashSet;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};

use crate::core::types::{ARCHIVE_FILE_TYPE, Artifact, Job};
use crate::error::{CleanupError, HttpStatusError};
use crate::io::source::{Listing, RefHead, RepositoryDataSource, RepositoryHandle};

/// Fixed reference time so ages are deterministic.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// `fixed_now()` minus `days`.
pub fn days_ago(days: i64) -> DateTime<Utc> {
    fixed_now() - TimeDelta::days(days)
}

pub fn archive(size: Option<u64>) -> Artifact {
    Artifact {
        file_type: ARCHIVE_FILE_TYPE.to_string(),
        size,
    }
}

pub fn trace(size: Option<u64>) -> Artifact {
    Artifact {
        file_type: "trace".to_string(),
        size,
    }
}

/// Create a job that was not erased yet.
pub fn job(
    id: u64,
    created_at: DateTime<Utc>,
    git_ref: &str,
    commit_id: Option<&str>,
    artifacts: Vec<Artifact>,
) -> Job {
    Job {
        id,
        created_at,
        git_ref: git_ref.to_string(),
        commit_id: commit_id.map(str::to_string),
        artifacts,
        erased_at: None,
    }
}

/// Repository contents served by [`FakeSource`].
#[derive(Debug, Clone)]
pub struct FakeRepository {
    handle: RepositoryHandle,
    branches: Vec<RefHead>,
    tags: Vec<RefHead>,
    jobs: Vec<Job>,
    failing_deletions: HashSet<u64>,
    fail_jobs_listing: bool,
}

impl FakeRepository {
    pub fn new(id: u64, path: &str) -> Self {
        Self {
            handle: RepositoryHandle {
                id,
                path: path.to_string(),
            },
            branches: Vec::new(),
            tags: Vec::new(),
            jobs: Vec::new(),
            failing_deletions: HashSet::new(),
            fail_jobs_listing: false,
        }
    }

    pub fn branch(mut self, name: &str, commit_id: &str) -> Self {
        self.branches.push(ref_head(name, commit_id));
        self
    }

    pub fn tag(mut self, name: &str, commit_id: &str) -> Self {
        self.tags.push(ref_head(name, commit_id));
        self
    }

    pub fn job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Make delete/erase calls for `job_id` fail.
    pub fn failing_deletion(mut self, job_id: u64) -> Self {
        self.failing_deletions.insert(job_id);
        self
    }

    /// Make the job listing fail after yielding the configured jobs.
    pub fn failing_jobs_listing(mut self) -> Self {
        self.fail_jobs_listing = true;
        self
    }
}

fn ref_head(name: &str, commit_id: &str) -> RefHead {
    RefHead {
        name: name.to_string(),
        commit_id: commit_id.to_string(),
    }
}

/// In-memory data source that records every destructive call.
#[derive(Debug, Default)]
pub struct FakeSource {
    repositories: Vec<FakeRepository>,
    reject_token: bool,
    unreachable: bool,
    deleted_artifacts: RefCell<Vec<u64>>,
    erased_jobs: RefCell<Vec<u64>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: FakeRepository) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Fail every call with an authentication error.
    pub fn rejecting_token(mut self) -> Self {
        self.reject_token = true;
        self
    }

    /// Fail every resolve as if the server could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Job ids whose artifacts were deleted, in call order.
    pub fn deleted_artifacts(&self) -> Vec<u64> {
        self.deleted_artifacts.borrow().clone()
    }

    /// Job ids that were erased, in call order.
    pub fn erased_jobs(&self) -> Vec<u64> {
        self.erased_jobs.borrow().clone()
    }

    fn repository(&self, handle: &RepositoryHandle) -> Result<&FakeRepository> {
        self.repositories
            .iter()
            .find(|repo| repo.handle.id == handle.id)
            .ok_or_else(|| anyhow!("unknown repository id {}", handle.id))
    }

    fn check_deletable(&self, handle: &RepositoryHandle, job: &Job) -> Result<()> {
        if self.repository(handle)?.failing_deletions.contains(&job.id) {
            return Err(anyhow!("500 Internal Server Error"));
        }
        Ok(())
    }

    fn listing<T: Clone + 'static>(&self, items: Result<Vec<T>>, fail_after: bool) -> Listing<'_, T> {
        match items {
            Ok(items) => {
                let tail = fail_after.then(|| Err(anyhow!("502 Bad Gateway")));
                Box::new(items.into_iter().map(Ok).chain(tail))
            }
            Err(err) => Box::new(std::iter::once(Err(err))),
        }
    }
}

impl RepositoryDataSource for FakeSource {
    fn resolve(&self, identifier: &str) -> Result<RepositoryHandle> {
        if self.reject_token {
            return Err(CleanupError::Authentication {
                reason: "401 Unauthorized".to_string(),
            }
            .into());
        }
        if self.unreachable {
            return Err(anyhow!("connection refused").context("send request"));
        }
        self.repositories
            .iter()
            .find(|repo| repo.handle.path == identifier || repo.handle.id.to_string() == identifier)
            .map(|repo| repo.handle.clone())
            .ok_or_else(|| {
                HttpStatusError {
                    status: 404,
                    reason: "404: 404 Project Not Found".to_string(),
                }
                .into()
            })
    }

    fn list_branches(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead> {
        let items = self.repository(repository).map(|repo| repo.branches.clone());
        self.listing(items, false)
    }

    fn list_tags(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead> {
        let items = self.repository(repository).map(|repo| repo.tags.clone());
        self.listing(items, false)
    }

    fn list_jobs(&self, repository: &RepositoryHandle) -> Listing<'_, Job> {
        match self.repository(repository) {
            Ok(repo) => self.listing(Ok(repo.jobs.clone()), repo.fail_jobs_listing),
            Err(err) => self.listing(Err(err), false),
        }
    }

    fn delete_artifacts(&self, repository: &RepositoryHandle, job: &Job) -> Result<()> {
        self.check_deletable(repository, job)?;
        self.deleted_artifacts.borrow_mut().push(job.id);
        Ok(())
    }

    fn erase_job(&self, repository: &RepositoryHandle, job: &Job) -> Result<()> {
        self.check_deletable(repository, job)?;
        self.erased_jobs.borrow_mut().push(job.id);
        Ok(())
    }
}
