//! Podman container engine
//!
//! Drives the `podman` CLI for the builder and runtime stages:
//! - Starting an idle builder container
//! - Copying the source tree in and the build output out
//! - Executing build commands
//! - Building and pushing the runtime image

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ContainerEngine, EngineError, ExecOutput};

/// [`ContainerEngine`] backed by the podman CLI
#[derive(Debug, Clone)]
pub struct PodmanEngine {
    bin: String,
}

impl PodmanEngine {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Checks if podman is installed and available
    pub async fn check_available(&self) -> Result<String, EngineError> {
        let output = self.run_checked(&["--version"]).await?;
        let version = output.stdout.trim().to_string();
        info!("Podman is available: {}", version);
        Ok(version)
    }

    /// Runs podman with `args` and captures its output
    async fn run(&self, args: &[&str]) -> Result<ExecOutput, EngineError> {
        debug!("Running {} {:?}", self.bin, args);

        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.bin.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !stdout.trim().is_empty() {
            debug!("podman stdout: {}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("podman stderr: {}", stderr.trim());
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Runs podman and turns a non-zero exit into an error
    async fn run_checked(&self, args: &[&str]) -> Result<ExecOutput, EngineError> {
        let output = self.run(args).await?;

        if !output.success() {
            return Err(EngineError::CommandFailed {
                command: format!("{} {}", self.bin, args.join(" ")),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl ContainerEngine for PodmanEngine {
    async fn start_container(&self, name: &str, image: &str) -> Result<(), EngineError> {
        info!("Creating container {} for image {}", name, image);

        // Override the entrypoint so images with custom entrypoints stay idle
        let output = self
            .run_checked(&[
                "run",
                "-d",
                "--name",
                name,
                "--entrypoint",
                "/bin/sh",
                image,
                "-c",
                "sleep infinity",
            ])
            .await?;

        info!(
            "Container {} started with ID: {}",
            name,
            output.stdout.trim()
        );
        Ok(())
    }

    async fn copy_into(
        &self,
        container: &str,
        host_dir: &Path,
        container_dir: &str,
    ) -> Result<(), EngineError> {
        // Trailing "/." copies the directory contents, not the directory itself
        let source = format!("{}/.", host_dir.display());
        let target = format!("{}:{}", container, container_dir);

        self.run_checked(&["exec", container, "mkdir", "-p", container_dir])
            .await?;
        self.run_checked(&["cp", &source, &target]).await?;
        Ok(())
    }

    async fn exec(
        &self,
        container: &str,
        workdir: &str,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError> {
        debug!("Executing in container {}: {:?}", container, argv);

        let mut args = vec!["exec", "-w", workdir, container];
        args.extend(argv.iter().map(String::as_str));

        let output = self.run(&args).await?;

        if output.success() {
            debug!(
                "Command completed successfully: stdout_len={}, stderr_len={}",
                output.stdout.len(),
                output.stderr.len()
            );
        } else {
            debug!(
                "Command failed in container {}: exit_code={}",
                container, output.exit_code
            );
        }

        Ok(output)
    }

    async fn copy_out(
        &self,
        container: &str,
        container_dir: &str,
        host_dir: &Path,
    ) -> Result<(), EngineError> {
        let source = format!("{}:{}", container, container_dir);
        let target = host_dir.to_string_lossy().to_string();

        self.run_checked(&["cp", &source, &target]).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), EngineError> {
        debug!("Removing container {}", name);
        self.run_checked(&["rm", "-f", name]).await?;
        Ok(())
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        containerfile: &Path,
        tag: &str,
    ) -> Result<(), EngineError> {
        info!("Building image {}", tag);

        let containerfile = containerfile.to_string_lossy().to_string();
        let context_dir = context_dir.to_string_lossy().to_string();

        self.run_checked(&["build", "-t", tag, "-f", &containerfile, &context_dir])
            .await?;
        Ok(())
    }

    async fn push_image(
        &self,
        local_tag: &str,
        reference: &str,
    ) -> Result<Option<String>, EngineError> {
        info!("Pushing {} to {}", local_tag, reference);

        let digest_file = tempfile::NamedTempFile::new().map_err(|source| EngineError::Io {
            context: "failed to create digest file".to_string(),
            source,
        })?;
        let digest_path = digest_file.path().to_string_lossy().to_string();

        self.run_checked(&["push", "--digestfile", &digest_path, local_tag, reference])
            .await?;

        let digest = match tokio::fs::read_to_string(digest_file.path()).await {
            Ok(contents) if !contents.trim().is_empty() => Some(contents.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read digest of {}: {}", reference, e);
                None
            }
        };

        Ok(digest)
    }

    async fn remove_image(&self, tag: &str) -> Result<(), EngineError> {
        debug!("Removing image {}", tag);
        self.run_checked(&["rmi", "-f", tag]).await?;
        Ok(())
    }
}
