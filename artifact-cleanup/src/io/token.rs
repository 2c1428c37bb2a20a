//! Access token lookup: config file, then environment, then stdin.

use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result};
use inquire::Password;
use tracing::debug;

use crate::error::ArgumentError;

pub const TOKEN_ENV: &str = "GITLAB_ACCESS_TOKEN";

/// Return the configured token, or ask for one.
///
/// When stdin is a terminal the token is read without echo; otherwise the
/// first line of stdin is used as-is (e.g. `pass show gitlab | cleanup ...`).
pub fn acquire_token(configured: Option<&str>) -> Result<String> {
    let env_token = std::env::var(TOKEN_ENV).ok();
    let stdin = io::stdin();
    let input = if stdin.is_terminal() {
        TokenInput::Terminal(prompt_hidden)
    } else {
        TokenInput::Piped(stdin.lock())
    };
    read_token(configured, env_token.as_deref(), input)
}

/// Where a token comes from when neither config nor environment has one.
enum TokenInput<R, P> {
    Piped(R),
    Terminal(P),
}

fn prompt_hidden() -> Result<String> {
    Password::new("GitLab access token:")
        .without_confirmation()
        .prompt()
        .context("read access token")
}

fn read_token<R, P>(
    configured: Option<&str>,
    env_token: Option<&str>,
    input: TokenInput<R, P>,
) -> Result<String>
where
    R: BufRead,
    P: FnOnce() -> Result<String>,
{
    if let Some(token) = configured {
        debug!("using access token from config file");
        return Ok(token.to_string());
    }
    if let Some(token) = env_token.map(str::trim).filter(|token| !token.is_empty()) {
        debug!(env = TOKEN_ENV, "using access token from environment");
        return Ok(token.to_string());
    }

    let line = match input {
        TokenInput::Terminal(prompt) => prompt()?,
        TokenInput::Piped(mut reader) => {
            let mut line = String::new();
            reader.read_line(&mut line).context("read access token")?;
            line
        }
    };
    let token = line.trim();
    if token.is_empty() {
        return Err(ArgumentError("No GitLab access token is given.".to_string()).into());
    }
    Ok(token.to_string())
}
