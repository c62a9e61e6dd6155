//! Container engine abstraction
//!
//! The build stages only need a handful of engine capabilities: run a
//! long-lived builder container, copy trees in and out of it, execute
//! commands, build an image from a context directory, and push it.
//! [`ContainerEngine`] captures exactly that so the stages can be tested
//! without a real engine.

mod podman;

pub use podman::PodmanEngine;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Captured result of a command run by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors raised by the container engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be started
    #[error("failed to execute `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An engine command returned a non-zero exit code
    #[error("`{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Local filesystem work around an engine call failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capabilities the pipeline needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Starts a detached, idle container named `name` from `image`
    async fn start_container(&self, name: &str, image: &str) -> Result<(), EngineError>;

    /// Copies the contents of `host_dir` into `container_dir`
    async fn copy_into(
        &self,
        container: &str,
        host_dir: &Path,
        container_dir: &str,
    ) -> Result<(), EngineError>;

    /// Runs `argv` inside the container with `workdir` as working directory
    ///
    /// A non-zero exit of the command is reported through
    /// [`ExecOutput::exit_code`], not as an error.
    async fn exec(
        &self,
        container: &str,
        workdir: &str,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError>;

    /// Copies `container_dir` out of the container to `host_dir`
    async fn copy_out(
        &self,
        container: &str,
        container_dir: &str,
        host_dir: &Path,
    ) -> Result<(), EngineError>;

    /// Force-removes a container
    async fn remove_container(&self, name: &str) -> Result<(), EngineError>;

    /// Builds `containerfile` with `context_dir` as build context and tags it
    async fn build_image(
        &self,
        context_dir: &Path,
        containerfile: &Path,
        tag: &str,
    ) -> Result<(), EngineError>;

    /// Pushes a local image to `reference`, returning the manifest digest if known
    async fn push_image(&self, local_tag: &str, reference: &str)
    -> Result<Option<String>, EngineError>;

    /// Removes a local image
    async fn remove_image(&self, tag: &str) -> Result<(), EngineError>;
}
