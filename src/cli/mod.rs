//! CLI interface for poly-revert
//!
//! Provides subcommands for:
//! - `run`: Start the trading loop
//! - `status`: Show current state
//! - `config`: Show configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poly-revert")]
#[command(about = "Mean-reversion trading bot for Polymarket 15-minute crypto markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading loop
    Run(RunArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
