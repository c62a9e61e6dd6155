//! Multi-stage image builder
//!
//! Builder stage: an idle container from the recipe's build image receives
//! the source tree at `workdir` and runs the build commands in order. The
//! first failing command aborts the build.
//!
//! Runtime stage: only `output_dir` is copied out of the builder and baked
//! into an image based on the runtime image, with a fixed entrypoint. The
//! builder container and its layers never reach the final image.

use locci_core::domain::build::{BuildId, BuildRecipe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::engine::{ContainerEngine, EngineError};
use crate::stages::source::SourceTree;

/// Directory of the staging area holding the copied build output
const OUTPUT_DIR_NAME: &str = "output";

/// Build stage errors
#[derive(Debug, Error)]
pub enum BuildError {
    /// A build command exited non-zero; `index` is its zero-based position
    #[error("build command {index} (`{command}`) failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        index: usize,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The engine failed outside of a build command
    #[error("container engine error: {0}")]
    Engine(#[from] EngineError),

    /// The local staging area could not be prepared
    #[error("failed to prepare build context: {0}")]
    Staging(#[source] std::io::Error),
}

/// Output of a successful build
///
/// Holds the staging directory with the copied build output and the tag of
/// the runtime image built from it. The staging directory is removed when
/// the handle is dropped.
#[derive(Debug)]
pub struct BuildOutput {
    staging: TempDir,
    image_tag: String,
}

impl BuildOutput {
    /// Host directory holding a copy of the builder's output directory
    pub fn dir(&self) -> PathBuf {
        self.staging.path().join(OUTPUT_DIR_NAME)
    }

    /// Local tag of the runtime image
    pub fn image_tag(&self) -> &str {
        &self.image_tag
    }
}

/// Drives the two-stage build through a [`ContainerEngine`]
#[derive(Clone)]
pub struct ImageBuilder {
    engine: Arc<dyn ContainerEngine>,
}

impl ImageBuilder {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Builds the runtime image for `source` according to `recipe`
    pub async fn build(
        &self,
        build_id: BuildId,
        source: &SourceTree,
        recipe: &BuildRecipe,
    ) -> Result<BuildOutput, BuildError> {
        let staging = tempfile::Builder::new()
            .prefix("locci-stage-")
            .tempdir()
            .map_err(BuildError::Staging)?;

        // The builder is discarded whether or not the stage succeeded,
        // including a failed or partial start and a cancelled run
        let container = ContainerGuard::new(
            Arc::clone(&self.engine),
            format!("locci-builder-{}", build_id),
        );
        let builder_result = self
            .run_builder_stage(container.name(), source.path(), recipe, staging.path())
            .await;
        container.remove().await;
        builder_result?;

        let image_tag = format!("localhost/locci-{}", build_id);
        self.run_runtime_stage(recipe, staging.path(), &image_tag)
            .await?;

        info!("Built image {}", image_tag);
        Ok(BuildOutput { staging, image_tag })
    }

    async fn run_builder_stage(
        &self,
        container: &str,
        source_dir: &Path,
        recipe: &BuildRecipe,
        staging_dir: &Path,
    ) -> Result<(), BuildError> {
        self.engine
            .start_container(container, &recipe.build_image)
            .await?;
        self.engine
            .copy_into(container, source_dir, &recipe.workdir)
            .await?;

        for (index, argv) in recipe.commands.iter().enumerate() {
            let command = argv.join(" ");
            info!(
                "Running build command {}/{}: {}",
                index + 1,
                recipe.commands.len(),
                command
            );

            let output = self.engine.exec(container, &recipe.workdir, argv).await?;

            if !output.stdout.trim().is_empty() {
                debug!("{}", output.stdout.trim());
            }

            if !output.success() {
                error!(
                    "Build command `{}` failed with exit code {}",
                    command, output.exit_code
                );
                return Err(BuildError::CommandFailed {
                    index,
                    command,
                    exit_code: output.exit_code,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        }

        self.engine
            .copy_out(
                container,
                &recipe.output_dir,
                &staging_dir.join(OUTPUT_DIR_NAME),
            )
            .await?;

        Ok(())
    }

    async fn run_runtime_stage(
        &self,
        recipe: &BuildRecipe,
        staging_dir: &Path,
        image_tag: &str,
    ) -> Result<(), BuildError> {
        let containerfile = staging_dir.join("Containerfile");
        tokio::fs::write(&containerfile, runtime_containerfile(recipe))
            .await
            .map_err(BuildError::Staging)?;

        self.engine
            .build_image(staging_dir, &containerfile, image_tag)
            .await?;
        Ok(())
    }
}

/// Removes a builder container when dropped
///
/// [`ContainerGuard::remove`] awaits the removal. A guard dropped without it,
/// as when the run's future is cancelled, schedules the removal on the
/// current runtime instead.
struct ContainerGuard {
    engine: Arc<dyn ContainerEngine>,
    name: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(engine: Arc<dyn ContainerEngine>, name: String) -> Self {
        Self {
            engine,
            name,
            armed: true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn remove(mut self) {
        self.armed = false;
        remove_container(self.engine.as_ref(), &self.name).await;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { remove_container(engine.as_ref(), &name).await });
            }
            Err(_) => warn!("No runtime left to remove builder container {}", name),
        }
    }
}

async fn remove_container(engine: &dyn ContainerEngine, name: &str) {
    if let Err(e) = engine.remove_container(name).await {
        warn!("Failed to remove builder container {}: {}", name, e);
    }
}

/// Containerfile of the runtime stage
fn runtime_containerfile(recipe: &BuildRecipe) -> String {
    // JSON array form keeps arguments containing spaces intact
    let entrypoint = serde_json::to_string(&recipe.entrypoint).unwrap_or_else(|_| "[]".into());
    format!(
        "FROM {}\nCOPY {}/ {}\nENTRYPOINT {}\n",
        recipe.runtime_image, OUTPUT_DIR_NAME, recipe.serve_dir, entrypoint
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, source_tree};
    use std::time::Duration;

    fn recipe(commands: &[&[&str]]) -> BuildRecipe {
        BuildRecipe {
            commands: commands
                .iter()
                .map(|argv| argv.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..BuildRecipe::default()
        }
    }

    #[test]
    fn test_runtime_containerfile() {
        let file = runtime_containerfile(&BuildRecipe::default());
        assert_eq!(
            file,
            "FROM nginx:alpine\n\
             COPY output/ /usr/share/nginx/html\n\
             ENTRYPOINT [\"/usr/sbin/nginx\",\"-g\",\"daemon off;\"]\n"
        );
    }

    #[tokio::test]
    async fn test_successful_build_runs_commands_in_order() {
        let engine = Arc::new(FakeEngine::default());
        let builder = ImageBuilder::new(engine.clone());
        let tree = source_tree();

        let output = builder
            .build(
                BuildId::from_raw(7),
                &tree,
                &recipe(&[&["npm", "install"], &["npm", "run", "build"]]),
            )
            .await
            .unwrap();

        assert_eq!(output.image_tag(), "localhost/locci-7");
        assert!(output.dir().join("index.html").exists());
        assert_eq!(
            engine.executed(),
            vec!["npm install".to_string(), "npm run build".to_string()]
        );
        assert_eq!(engine.removed_containers(), vec!["locci-builder-7"]);
        assert_eq!(engine.built_images(), vec!["localhost/locci-7"]);
    }

    #[tokio::test]
    async fn test_failing_command_stops_later_commands() {
        let engine = Arc::new(FakeEngine::failing_command(1));
        let builder = ImageBuilder::new(engine.clone());

        let err = builder
            .build(
                BuildId::from_raw(8),
                &source_tree(),
                &recipe(&[&["npm", "install"], &["npm", "test"], &["npm", "run", "build"]]),
            )
            .await
            .unwrap_err();

        match err {
            BuildError::CommandFailed {
                index,
                command,
                exit_code,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(command, "npm test");
                assert_eq!(exit_code, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(engine.executed(), vec!["npm install", "npm test"]);
        // No runtime image, but the builder is still cleaned up
        assert!(engine.built_images().is_empty());
        assert_eq!(engine.removed_containers(), vec!["locci-builder-8"]);
    }

    #[tokio::test]
    async fn test_failed_start_still_removes_builder() {
        let engine = Arc::new(FakeEngine::failing_start());
        let builder = ImageBuilder::new(engine.clone());

        let err = builder
            .build(BuildId::from_raw(10), &source_tree(), &recipe(&[&["true"]]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::Engine(EngineError::CommandFailed { exit_code: 125, .. })
        ));
        assert!(engine.executed().is_empty());
        assert_eq!(engine.removed_containers(), vec!["locci-builder-10"]);
        assert!(engine.built_images().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_build_removes_builder() {
        let engine = Arc::new(FakeEngine::slow_exec(Duration::from_secs(60)));
        let builder = ImageBuilder::new(engine.clone());
        let tree = source_tree();
        let recipe = recipe(&[&["npm", "install"]]);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(100),
            builder.build(BuildId::from_raw(11), &tree, &recipe),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.executed(), vec!["npm install"]);
        assert_eq!(engine.removed_containers(), vec!["locci-builder-11"]);
    }

    #[tokio::test]
    async fn test_staging_removed_with_output() {
        let engine = Arc::new(FakeEngine::default());
        let output = ImageBuilder::new(engine)
            .build(BuildId::from_raw(9), &source_tree(), &recipe(&[&["true"]]))
            .await
            .unwrap();

        let dir = output.dir();
        assert!(dir.exists());
        drop(output);
        assert!(!dir.exists());
    }
}
