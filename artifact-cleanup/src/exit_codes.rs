//! Stable exit codes for the cleanup CLI.
//!
//! Usage errors detected by clap itself exit with clap's code `2`.

use crate::error::{ArgumentError, CleanupError, ConfigError};

/// Run completed (including dry runs and `--write-default-config`).
pub const OK: i32 = 0;
/// Unexpected failure, including a failed deletion call.
pub const FAILURE: i32 = 1;
/// Invalid argument combination (no repository, negative days, no token).
pub const ARGUMENT: i32 = 3;
/// The server rejected the access token.
pub const AUTHENTICATION: i32 = 4;
/// Listing branches, tags or jobs failed.
pub const LISTING: i32 = 5;
/// A repository path could not be resolved.
pub const REPOSITORY_NOT_FOUND: i32 = 6;
/// The config file holds an unknown value.
pub const CONFIG: i32 = 7;

/// Exit code for a failed run.
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ArgumentError>().is_some() {
        return ARGUMENT;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return CONFIG;
    }
    match err.downcast_ref::<CleanupError>() {
        Some(CleanupError::Authentication { .. }) => AUTHENTICATION,
        Some(CleanupError::Listing { .. }) => LISTING,
        Some(CleanupError::RepositoryLookup { .. }) => REPOSITORY_NOT_FOUND,
        Some(CleanupError::Deletion { .. }) | None => FAILURE,
    }
}
