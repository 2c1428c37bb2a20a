//! Defaults for the CLI, stored in `~/.gitlab-artifact-cleanup.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::core::types::KeepScope;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = ".gitlab-artifact-cleanup.toml";

/// Written into fresh config files; treated as "no token configured".
pub const ACCESS_TOKEN_PLACEHOLDER: &str = "xxxxxxxx REPLACE OR DELETE ME! xxxxxxxx";

/// Location of the config file in the user's home directory.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(CONFIG_FILE_NAME))
}

/// How much is logged to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Error,
    Warn,
    Verbose,
    Debug,
}

impl Verbosity {
    pub const CHOICES: [&'static str; 5] = ["quiet", "error", "warn", "verbose", "debug"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quiet" => Some(Self::Quiet),
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "verbose" => Some(Self::Verbose),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Config file contents (TOML).
///
/// Enum-valued keys are kept as strings so that unknown values are reported
/// as [`ConfigError`]s by [`Config::validate`] instead of parse failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub gitlab: GitLabConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// One of `quiet`, `error`, `warn`, `verbose`, `debug`.
    pub verbosity: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbosity: "verbose".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitLabConfig {
    pub url: String,
    pub access_token: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: "https://gitlab.com/".to_string(),
            access_token: ACCESS_TOKEN_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    pub repository_paths: Vec<String>,
    /// One of `none`, `branch_artifacts`, `tag_artifacts`, `branch_and_tag_artifacts`.
    pub always_keep: String,
    /// Checked when merged with the command line; negative values are rejected there.
    pub days_to_keep: i64,
    pub delete_logs: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            repository_paths: Vec::new(),
            always_keep: KeepScope::BranchAndTagArtifacts.as_str().to_string(),
            days_to_keep: 7,
            delete_logs: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.verbosity()?;
        self.always_keep()?;
        Ok(())
    }

    pub fn verbosity(&self) -> Result<Verbosity, ConfigError> {
        Verbosity::parse(&self.general.verbosity).ok_or_else(|| ConfigError::UnknownVerbosity {
            value: self.general.verbosity.clone(),
        })
    }

    pub fn always_keep(&self) -> Result<KeepScope, ConfigError> {
        KeepScope::parse(&self.cleanup.always_keep).ok_or_else(|| ConfigError::UnknownKeepScope {
            value: self.cleanup.always_keep.clone(),
        })
    }

    /// The configured token, or `None` if empty or still the placeholder.
    pub fn access_token(&self) -> Option<&str> {
        let token = self.gitlab.access_token.trim();
        if token.is_empty() || token == ACCESS_TOKEN_PLACEHOLDER {
            return None;
        }
        Some(token)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Write the default config to `path` (temp file + rename, owner-only on Unix).
pub fn write_default_config(path: &Path) -> Result<()> {
    let mut buf = toml::to_string_pretty(&Config::default()).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    match fs::remove_file(&tmp_path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("remove stale {}", tmp_path.display()));
        }
    }
    write_private(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)
}
