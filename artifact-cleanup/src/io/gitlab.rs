//! GitLab REST (v4) implementation of the repository data source.
//!
//! Listings are paginated lazily: the next page is only requested once the
//! current one is consumed, following the `Link: <...>; rel="next"` header.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::LINK;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::core::types::{Artifact, Job};
use crate::error::{CleanupError, HttpStatusError};
use crate::io::source::{Listing, RefHead, RepositoryDataSource, RepositoryHandle};

const PAGE_SIZE: u32 = 100;
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking client for a single GitLab server.
#[derive(Debug, Clone)]
pub struct GitLab {
    api_root: Url,
    access_token: String,
    client: Client,
}

impl GitLab {
    /// Create a client for the server at `server_url` (e.g. `https://gitlab.com/`).
    pub fn new(server_url: &str, access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gitlab-artifact-cleanup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            api_root: api_root(server_url)?,
            access_token: access_token.into(),
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("server url cannot be a base: {}", self.api_root))?
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request
            .header(TOKEN_HEADER, &self.access_token)
            .send()
            .context("send request")?;
        check_status(response)
    }

    fn get(&self, url: Url) -> Result<Response> {
        debug!(%url, "GET");
        self.send(self.client.get(url))
    }

    fn paginate<'a, W, T>(&'a self, what: &'static str, segments: &[&str]) -> Listing<'a, T>
    where
        W: DeserializeOwned + 'a,
        T: 'a,
        W: Into<T>,
    {
        match self.endpoint(segments) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("per_page", &PAGE_SIZE.to_string());
                Box::new(Pages::<W>::new(self, what, url).map(|item| item.map(Into::into)))
            }
            Err(err) => Box::new(std::iter::once(Err(err))),
        }
    }

    fn job_endpoint(&self, repository: &RepositoryHandle, job: &Job, action: &str) -> Result<Url> {
        self.endpoint(&[
            "projects",
            &repository.id.to_string(),
            "jobs",
            &job.id.to_string(),
            action,
        ])
    }
}

impl RepositoryDataSource for GitLab {
    #[instrument(skip(self))]
    fn resolve(&self, identifier: &str) -> Result<RepositoryHandle> {
        let url = self.endpoint(&["projects", identifier])?;
        let project: WireProject = self
            .get(url)?
            .json()
            .context("parse project response")?;
        debug!(id = project.id, path = %project.path_with_namespace, "project resolved");
        Ok(RepositoryHandle {
            id: project.id,
            path: project.path_with_namespace,
        })
    }

    fn list_branches(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead> {
        let id = repository.id.to_string();
        self.paginate::<WireRef, RefHead>("branches", &["projects", &id, "repository", "branches"])
    }

    fn list_tags(&self, repository: &RepositoryHandle) -> Listing<'_, RefHead> {
        let id = repository.id.to_string();
        self.paginate::<WireRef, RefHead>("tags", &["projects", &id, "repository", "tags"])
    }

    fn list_jobs(&self, repository: &RepositoryHandle) -> Listing<'_, Job> {
        let id = repository.id.to_string();
        self.paginate::<WireJob, Job>("jobs", &["projects", &id, "jobs"])
    }

    #[instrument(skip_all, fields(job_id = job.id))]
    fn delete_artifacts(&self, repository: &RepositoryHandle, job: &Job) -> Result<()> {
        let url = self.job_endpoint(repository, job, "artifacts")?;
        debug!(%url, "DELETE");
        self.send(self.client.delete(url))?;
        Ok(())
    }

    #[instrument(skip_all, fields(job_id = job.id))]
    fn erase_job(&self, repository: &RepositoryHandle, job: &Job) -> Result<()> {
        let url = self.job_endpoint(repository, job, "erase")?;
        debug!(%url, "POST");
        self.send(self.client.post(url))?;
        Ok(())
    }
}

/// Lazy page-by-page iterator over a GitLab collection endpoint.
struct Pages<'a, W> {
    gitlab: &'a GitLab,
    what: &'static str,
    next: Option<Url>,
    buffer: VecDeque<W>,
}

impl<'a, W: DeserializeOwned> Pages<'a, W> {
    fn new(gitlab: &'a GitLab, what: &'static str, first: Url) -> Self {
        Self {
            gitlab,
            what,
            next: Some(first),
            buffer: VecDeque::new(),
        }
    }

    fn fetch(&mut self, url: Url) -> Result<()> {
        let response = self.gitlab.get(url)?;
        self.next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_link)
            .and_then(|link| Url::parse(&link).ok());
        let page: Vec<W> = response
            .json()
            .with_context(|| format!("parse {} page", self.what))?;
        debug!(what = self.what, items = page.len(), more = self.next.is_some(), "page fetched");
        self.buffer.extend(page);
        Ok(())
    }
}

impl<W: DeserializeOwned> Iterator for Pages<'_, W> {
    type Item = Result<W>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() {
            let url = self.next.take()?;
            if let Err(err) = self.fetch(url) {
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn api_root(server_url: &str) -> Result<Url> {
    let mut url = Url::parse(server_url).with_context(|| format!("parse server url {server_url}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("server url cannot be a base: {server_url}"))?
        .pop_if_empty()
        .extend(["api", "v4"]);
    Ok(url)
}

/// Turn non-success responses into errors; 401 becomes an authentication failure.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let reason = status_reason(status, &body);
    if status == StatusCode::UNAUTHORIZED {
        warn!(%status, "access token rejected");
        return Err(CleanupError::Authentication { reason }.into());
    }
    warn!(%status, "request failed");
    Err(HttpStatusError {
        status: status.as_u16(),
        reason,
    }
    .into())
}

fn status_reason(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<serde_json::Value>,
        error: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| match (parsed.message, parsed.error) {
            (Some(serde_json::Value::String(message)), _) => Some(message),
            (Some(message), _) => Some(message.to_string()),
            (None, error) => error,
        });
    match detail {
        Some(detail) => format!("{}: {detail}", status.as_u16()),
        None => status.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct WireProject {
    id: u64,
    path_with_namespace: String,
}

#[derive(Debug, Deserialize)]
struct WireCommit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireRef {
    name: String,
    commit: WireCommit,
}

impl From<WireRef> for RefHead {
    fn from(wire: WireRef) -> Self {
        RefHead {
            name: wire.name,
            commit_id: wire.commit.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireArtifact {
    file_type: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireJob {
    id: u64,
    created_at: DateTime<Utc>,
    #[serde(rename = "ref")]
    git_ref: String,
    commit: Option<WireCommit>,
    #[serde(default)]
    artifacts: Vec<WireArtifact>,
    erased_at: Option<DateTime<Utc>>,
}

impl From<WireJob> for Job {
    fn from(wire: WireJob) -> Self {
        Job {
            id: wire.id,
            created_at: wire.created_at,
            git_ref: wire.git_ref,
            commit_id: wire.commit.map(|commit| commit.id),
            artifacts: wire
                .artifacts
                .into_iter()
                .map(|artifact| Artifact {
                    file_type: artifact.file_type,
                    size: artifact.size,
                })
                .collect(),
            erased_at: wire.erased_at,
        }
    }
}
