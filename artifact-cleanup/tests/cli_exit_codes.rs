//! CLI tests for exit codes.
//!
//! Spawns the binary against a temporary config file and verifies that each
//! failure class exits with its own code before any network access happens.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use artifact_cleanup::exit_codes;
use artifact_cleanup::io::config::{Config, load_config};

fn cleanup_cmd(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gitlab-artifact-cleanup"));
    cmd.arg("--config")
        .arg(config)
        .env_remove("GITLAB_ACCESS_TOKEN")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

#[test]
fn write_default_config_creates_loadable_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cleanup.toml");

    let status = cleanup_cmd(&path)
        .arg("--write-default-config")
        .status()
        .expect("run binary");

    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("load"), Config::default());
}

#[test]
fn missing_repository_exits_with_argument_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = cleanup_cmd(&temp.path().join("missing.toml"))
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(exit_codes::ARGUMENT));
}

#[test]
fn negative_days_exits_with_argument_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = cleanup_cmd(&temp.path().join("missing.toml"))
        .args(["--days-to-keep", "-3", "group/app"])
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(exit_codes::ARGUMENT));
}

#[test]
fn empty_token_on_stdin_exits_with_argument_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = cleanup_cmd(&temp.path().join("missing.toml"))
        .arg("group/app")
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(exit_codes::ARGUMENT));
}

#[test]
fn unknown_config_value_exits_with_config_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cleanup.toml");
    fs::write(&path, "[cleanup]\nalways_keep = \"everything\"\n").expect("write config");

    let status = cleanup_cmd(&path)
        .arg("group/app")
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(exit_codes::CONFIG));
}

#[test]
fn unknown_keep_choice_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = cleanup_cmd(&temp.path().join("missing.toml"))
        .args(["--always-keep", "everything", "group/app"])
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(2));
}

#[test]
fn negative_days_in_config_exits_with_argument_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("cleanup.toml");
    fs::write(&path, "[cleanup]\ndays_to_keep = -3\n").expect("write config");

    let status = cleanup_cmd(&path)
        .arg("group/app")
        .status()
        .expect("run binary");
    assert_eq!(status.code(), Some(exit_codes::ARGUMENT));
}
