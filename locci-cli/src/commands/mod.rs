//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod books;
mod build;

pub use books::BookCommands;
pub use build::BuildArgs;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build and publish a repository branch
    Build(BuildArgs),
    /// Book catalog
    Books {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Check that the orchestrator is up
    Health,
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Build(args) => build::handle_build_command(args, config).await,
        Commands::Books { command } => books::handle_book_command(command, config).await,
        Commands::Health => health(config).await,
    }
}

async fn health(config: &Config) -> Result<()> {
    let client = config.client()?;
    let body = client.health().await?;
    println!(
        "{} {} {}",
        "✓".green().bold(),
        client.base_url().cyan(),
        body.trim().dimmed()
    );
    Ok(())
}
