//! Stderr logging for the cleanup CLI.
//!
//! Cleanup progress (scans, deletions, summaries) is reported through
//! `tracing` at info level, so the verbosity level decides what the user sees.
//! `RUST_LOG` takes precedence for ad-hoc debugging.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::config::Verbosity;

/// Filter directive used for a verbosity level.
pub fn filter_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "off",
        Verbosity::Error => "error",
        Verbosity::Warn => "warn",
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
    }
}

/// Initialize the tracing subscriber.
///
/// Output: stderr, `LEVEL message` without timestamps or targets, colored
/// when stderr is a terminal.
///
/// # Example
/// ```bash
/// RUST_LOG=artifact_cleanup=debug gitlab-artifact-cleanup --dry-run group/project
/// ```
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .without_time()
                .with_target(false)
                .compact(),
        )
        .init();
}
