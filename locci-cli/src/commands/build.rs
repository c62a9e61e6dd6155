//! Build command handler

use anyhow::{Result, bail};
use clap::Args;
use colored::*;
use locci_core::dto::build::{BuildResponse, BuildStatus, RecipeOverrides, StartBuild};

use crate::config::Config;

/// Arguments of `locci build`
#[derive(Args)]
pub struct BuildArgs {
    /// Repository URL
    #[arg(short, long)]
    repo: String,

    /// Branch to build
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Image the build commands run in
    #[arg(long)]
    build_image: Option<String>,

    /// Base image of the published image
    #[arg(long)]
    runtime_image: Option<String>,

    /// Directory inside the builder the source is copied to
    #[arg(long)]
    workdir: Option<String>,

    /// Directory inside the builder holding the build output
    #[arg(long)]
    output_dir: Option<String>,

    /// Directory of the runtime image the output is copied to
    #[arg(long)]
    serve_dir: Option<String>,

    /// Build command, repeat for several (e.g. --command "npm ci" --command "npm run build")
    #[arg(short, long = "command")]
    commands: Vec<String>,

    /// Entrypoint of the runtime image, split on whitespace
    #[arg(long)]
    entrypoint: Option<String>,
}

impl BuildArgs {
    fn into_request(self) -> Result<StartBuild> {
        let commands = if self.commands.is_empty() {
            None
        } else {
            Some(
                self.commands
                    .iter()
                    .map(|c| split_command(c))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        let entrypoint = self.entrypoint.as_deref().map(split_command).transpose()?;

        let overrides = RecipeOverrides {
            build_image: self.build_image,
            workdir: self.workdir,
            commands,
            output_dir: self.output_dir,
            runtime_image: self.runtime_image,
            serve_dir: self.serve_dir,
            entrypoint,
        };

        Ok(StartBuild {
            repository: self.repo,
            branch: self.branch,
            recipe: (overrides != RecipeOverrides::default()).then_some(overrides),
        })
    }
}

/// Split a command line into argv on whitespace
fn split_command(command: &str) -> Result<Vec<String>> {
    let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        bail!("command cannot be empty");
    }
    Ok(argv)
}

/// Handle `locci build`
pub async fn handle_build_command(args: BuildArgs, config: &Config) -> Result<()> {
    let client = config.client()?;
    let req = args.into_request()?;

    println!(
        "{} {}#{}",
        "Building".bold(),
        req.repository.cyan(),
        req.branch.cyan()
    );

    let response = client.start_build(req).await?;
    print_build_response(&response);

    Ok(())
}

fn print_build_response(response: &BuildResponse) {
    match response.status {
        BuildStatus::Completed => {
            println!("{}", "✓ Pipeline completed successfully!".green().bold())
        }
        BuildStatus::PartialSuccess => {
            println!("{}", "⚠ Image published, some stages failed".yellow().bold())
        }
    }

    println!("  Image:     {}", response.image.cyan());
    if let Some(event) = &response.data {
        println!("  Build ID:  {}", event.unique_id.dimmed());
        if let Some(completed_at) = event.completed_at {
            println!(
                "  Completed: {}",
                completed_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    if let Some(path) = &response.export_path {
        println!("  Exported:  {}", path);
    }

    for failure in &response.errors {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.stage.to_string().red(),
            failure.message
        );
    }
}
