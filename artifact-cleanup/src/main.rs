//! GitLab artifact cleanup.
//!
//! Deletes artifacts (and optionally logs) of old CI/CD jobs that are no
//! longer linked to a branch head or tag. Runs once and exits.

use anyhow::{Context, Result};
use artifact_cleanup::cleanup::run_cleanup;
use artifact_cleanup::cli::{Cli, Invocation};
use artifact_cleanup::exit_codes;
use artifact_cleanup::io::config::{Config, Verbosity, load_config, write_default_config};
use artifact_cleanup::io::gitlab::GitLab;
use artifact_cleanup::io::token::acquire_token;
use artifact_cleanup::logging;
use artifact_cleanup::report::log_event;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Logging depends on the config file, so failures up to here go to stderr directly.
    let (config, verbosity) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::for_error(&err));
        }
    };
    logging::init(verbosity);

    if let Err(err) = run(cli, &config) {
        error!("{err:#}");
        if verbosity == Verbosity::Debug {
            eprintln!("{err:?}");
        }
        std::process::exit(exit_codes::for_error(&err));
    }
    std::process::exit(exit_codes::OK);
}

fn prepare(cli: &Cli) -> Result<(Config, Verbosity)> {
    let path = cli.config_path()?;
    let config = load_config(&path).context("load config")?;
    let verbosity = cli.resolve_verbosity(&config)?;
    Ok((config, verbosity))
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    match cli.resolve(config)? {
        Invocation::WriteDefaultConfig { path } => {
            write_default_config(&path)?;
            info!("Wrote a default config file to \"{}\"", path.display());
        }
        Invocation::Clean(settings) => {
            let token = acquire_token(config.access_token())?;
            let gitlab = GitLab::new(&settings.gitlab_url, token)?;
            run_cleanup(
                &gitlab,
                &settings.repositories,
                &settings.options,
                Utc::now(),
                log_event,
            )?;
        }
    }
    Ok(())
}
