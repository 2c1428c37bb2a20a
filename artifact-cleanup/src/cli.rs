//! Command line model and merging of flags over config-file defaults.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, ValueEnum};

use crate::cleanup::CleanupOptions;
use crate::core::types::{KeepScope, RetentionPolicy};
use crate::error::ArgumentError;
use crate::io::config::{Config, Verbosity, default_config_path};

#[derive(Debug, Parser)]
#[command(
    name = "gitlab-artifact-cleanup",
    version,
    about = "Clean up old artifacts and CI jobs from GitLab",
    long_about = "Clean up old artifacts and CI jobs from GitLab.\n\nDefault values for command line \
                  options are taken from the config file (~/.gitlab-artifact-cleanup.toml)."
)]
pub struct Cli {
    /// Paths of the repositories to clean up (e.g. `examples/ci-docker-in-docker`).
    pub repository_paths: Vec<String>,

    /// Artifacts which must always be kept regardless of age.
    #[arg(short = 'a', long, value_enum)]
    pub always_keep: Option<KeepArg>,

    /// Number of days artifacts will always be kept.
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    pub days_to_keep: Option<i64>,

    /// Delete jobs completely (artifacts and log).
    #[arg(short = 'l', long, overrides_with = "no_delete_logs")]
    pub delete_logs: bool,

    /// Only delete artifacts and keep job logs.
    #[arg(short = 'L', long, overrides_with = "delete_logs")]
    pub no_delete_logs: bool,

    /// Only show what would be done.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// URL of the GitLab server.
    #[arg(short = 'u', long)]
    pub gitlab_url: Option<String>,

    /// Create a configuration file with default values and exit.
    #[arg(short = 'w', long)]
    pub write_default_config: bool,

    /// Config file to read defaults from.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: VerbosityArgs,
}

/// Mirrors [`KeepScope`] for the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum KeepArg {
    None,
    BranchArtifacts,
    TagArtifacts,
    BranchAndTagArtifacts,
}

impl From<KeepArg> for KeepScope {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::None => KeepScope::None,
            KeepArg::BranchArtifacts => KeepScope::BranchArtifacts,
            KeepArg::TagArtifacts => KeepScope::TagArtifacts,
            KeepArg::BranchAndTagArtifacts => KeepScope::BranchAndTagArtifacts,
        }
    }
}

#[derive(Debug, Default, Args)]
#[group(multiple = false)]
pub struct VerbosityArgs {
    /// Be quiet.
    #[arg(short = 'q', long)]
    pub quiet: bool,
    /// Print error messages only.
    #[arg(long)]
    pub error: bool,
    /// Print warning and error messages.
    #[arg(long)]
    pub warn: bool,
    /// Be verbose.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Print debug messages.
    #[arg(long)]
    pub debug: bool,
}

impl VerbosityArgs {
    pub fn selected(&self) -> Option<Verbosity> {
        [
            (self.quiet, Verbosity::Quiet),
            (self.error, Verbosity::Error),
            (self.warn, Verbosity::Warn),
            (self.verbose, Verbosity::Verbose),
            (self.debug, Verbosity::Debug),
        ]
        .into_iter()
        .find_map(|(set, level)| set.then_some(level))
    }
}

/// What the invocation asks for, after merging config defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    WriteDefaultConfig { path: PathBuf },
    Clean(CleanSettings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSettings {
    pub repositories: Vec<String>,
    pub gitlab_url: String,
    pub options: CleanupOptions,
}

impl Cli {
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_config_path(),
        }
    }

    /// Verbosity flag, falling back to the config file.
    pub fn resolve_verbosity(&self, config: &Config) -> Result<Verbosity> {
        match self.verbosity.selected() {
            Some(level) => Ok(level),
            None => Ok(config.verbosity()?),
        }
    }

    /// Merge flags over `config`.
    ///
    /// `--write-default-config` short-circuits validation of cleanup settings.
    pub fn resolve(self, config: &Config) -> Result<Invocation> {
        if self.write_default_config {
            return Ok(Invocation::WriteDefaultConfig {
                path: self.config_path()?,
            });
        }

        let repositories = if self.repository_paths.is_empty() {
            config.cleanup.repository_paths.clone()
        } else {
            self.repository_paths
        };
        if repositories.is_empty() {
            return Err(ArgumentError("No repository path is given.".to_string()).into());
        }

        let days_to_keep =
            checked_days_to_keep(self.days_to_keep.unwrap_or(config.cleanup.days_to_keep))?;
        let keep = match self.always_keep {
            Some(arg) => KeepScope::from(arg),
            None => config.always_keep()?,
        };
        let delete_logs = if self.delete_logs {
            true
        } else if self.no_delete_logs {
            false
        } else {
            config.cleanup.delete_logs
        };

        Ok(Invocation::Clean(CleanSettings {
            repositories,
            gitlab_url: self.gitlab_url.unwrap_or_else(|| config.gitlab.url.clone()),
            options: CleanupOptions {
                policy: RetentionPolicy::new(days_to_keep, keep, delete_logs),
                dry_run: self.dry_run,
            },
        }))
    }
}

fn checked_days_to_keep(days: i64) -> Result<u32, ArgumentError> {
    if days < 0 {
        return Err(ArgumentError(
            "The number of days to keep must be positive.".to_string(),
        ));
    }
    u32::try_from(days).map_err(|_| {
        ArgumentError(format!(
            "The number of days to keep must not exceed {}.",
            u32::MAX
        ))
    })
}
