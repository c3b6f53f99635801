//! Command-line interface for strictly_arena.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Arena - stake-backed connect-four match engine
#[derive(Parser, Debug)]
#[command(name = "strictly_arena")]
#[command(about = "Replay scripted stake-backed matches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the arena config file (TOML)
    #[arg(short, long, global = true, env = "STRICTLY_ARENA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a scripted match and print the outcome
    Replay {
        /// Script file (.toml or .json)
        #[arg(short, long)]
        script: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
