//! Removal of stale GitLab CI/CD job artifacts.
//!
//! A run scans one or more repositories, decides for every job whether its
//! artifacts are disposable, and deletes them (or erases the whole job). The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (retention decision, sizes, stats).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (GitLab API, config file, token input).
//!   Isolated behind traits to enable fakes in tests.
//!
//! [`cleanup`] coordinates core logic with a [`io::source::RepositoryDataSource`];
//! [`cli`] and [`report`] form the command line surface.

pub mod cleanup;
pub mod cli;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
