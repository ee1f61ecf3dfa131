//! # beacon-admin
//!
//! Administrative tool for a Beacon notification server.
//!
//! This binary provides:
//! - **`user`** verbs to add, list, delete users and change their password,
//!   role or tier
//! - **`tier`** verbs to add, change, list and remove subscription tiers
//!
//! It opens the same SQLite user database as the server, so changes are
//! visible to a running server immediately.

mod cli;
mod commands;
mod config;
mod error;
mod render;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use beacon_store::Database;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::commands::PasswordReader;
use crate::config::AdminConfig;

const DEFAULT_LOG_FILTER: &str = "warn,beacon_store=info";

fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Initialize tracing (--log-level, then RUST_LOG, then the default)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log_level.as_deref()))
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `--log-level` wins over `RUST_LOG`; an unparsable filter falls back to
/// the default.
fn log_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = AdminConfig::from_env();
    debug!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the user database
    // -----------------------------------------------------------------------
    let path = match cli.auth_file.or_else(|| config.auth_file.clone()) {
        Some(path) => path,
        None => Database::default_path()?,
    };
    let db = Database::open_at(&path, config.store_options())
        .with_context(|| format!("failed to open user database {}", path.display()))?;

    // -----------------------------------------------------------------------
    // 4. Run the command
    // -----------------------------------------------------------------------
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut passwords =
        PasswordReader::new(config.password, stdin.lock(), io::stderr()).with_tty(interactive);
    let mut out = io::stdout().lock();
    commands::run(cli.command, &db, &mut passwords, &mut out)?;

    Ok(())
}
