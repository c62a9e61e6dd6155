//! Locci CLI
//!
//! Command-line interface for the Locci orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "locci")]
#[command(about = "Locci build pipeline CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "LOCCI_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, env = "LOCCI_TIMEOUT")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.url,
        timeout: cli.timeout.map(Duration::from_secs),
    };

    handle_command(cli.command, &config).await
}
