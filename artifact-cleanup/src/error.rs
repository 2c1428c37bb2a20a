//! Typed failures that callers distinguish (mostly for exit codes).
//!
//! They travel inside `anyhow::Error` and are recovered with `downcast_ref`.

use thiserror::Error;

use crate::core::types::KeepScope;
use crate::io::config::Verbosity;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("could not get project \"{identifier}\": {reason}")]
    RepositoryLookup { identifier: String, reason: String },

    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("listing {what} of project \"{repository}\" failed: {reason}")]
    Listing {
        what: &'static str,
        repository: String,
        reason: String,
    },

    #[error("cleaning job \"{job_id}\" of project \"{repository}\" failed: {reason}")]
    Deletion {
        job_id: u64,
        repository: String,
        reason: String,
    },
}

/// The server answered with a non-success status other than 401.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct HttpStatusError {
    pub status: u16,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the always keep value \"{value}\" is unknown, valid choices are \"{}\"", KeepScope::CHOICES.join("\", \""))]
    UnknownKeepScope { value: String },

    #[error("the verbosity level \"{value}\" is unknown, valid choices are \"{}\"", Verbosity::CHOICES.join("\", \""))]
    UnknownVerbosity { value: String },
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);
