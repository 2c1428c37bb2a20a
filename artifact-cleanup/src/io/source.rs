//! Repository data source abstraction.
//!
//! The [`RepositoryDataSource`] trait decouples the cleanup orchestration from
//! the GitLab REST API. Tests use an in-memory source that records deletions
//! instead of contacting a server.

use anyhow::Result;

use crate::core::types::Job;

/// A resolved repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// Server-side numeric id, used for all follow-up requests.
    pub id: u64,
    /// Canonical `namespace/name` path reported by the server.
    pub path: String,
}

/// A branch head or tag with the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefHead {
    pub name: String,
    pub commit_id: String,
}

/// Lazy, single-pass listing. Items are fetched on demand, so a failure may
/// surface at any position.
pub type Listing<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

pub trait RepositoryDataSource {
    /// Resolve a `namespace/name` path (or numeric id) to a repository.
    fn resolve(&self, identifier: &str) -> Result<RepositoryHandle>;

    fn list_branches(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead>;

    fn list_tags(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead>;

    fn list_jobs(&self, repository: &RepositoryHandle) -> Listing<'_, Job>;

    /// Delete the artifacts of `job` and keep its log.
    fn delete_artifacts(&self, repository: &RepositoryHandle, job: &Job) -> Result<()>;

    /// Erase `job` completely: artifacts and log.
    fn erase_job(&self, repository: &RepositoryHandle, job: &Job) -> Result<()>;
}
