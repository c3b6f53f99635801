//! Strictly Arena - CLI
//!
//! Replays scripted matches against an in-memory engine.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::{Path, PathBuf};
use strictly_arena::{ArenaConfig, MatchScript, replay};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_arena=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ArenaConfig::resolve(cli.config.as_deref()).context("Failed to load config")?;
    debug!(?config, "Config resolved");

    match cli.command {
        Command::Replay { script, json } => run_replay(&config, script, json),
        Command::Config => print_config(&config),
    }
}

/// Replay a script and print the report
#[instrument(skip(config))]
fn run_replay(config: &ArenaConfig, script: PathBuf, json: bool) -> Result<()> {
    let script = load_script(&script)?;
    let report = replay(config, &script)?;
    info!(phase = %report.state().phase(), "Replay complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn load_script(path: &Path) -> Result<MatchScript> {
    MatchScript::from_file(path)
        .with_context(|| format!("Failed to load script {}", path.display()))
}

/// Print the effective configuration
fn print_config(config: &ArenaConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
