//! Pipeline Service
//!
//! Runs one build end to end: resolve → build → publish → export → notify.
//!
//! Every run gets its own [`BuildId`] and shares nothing mutable with other
//! runs. Stages run strictly in sequence and failures are never rolled
//! back: once an image is published it stays published, so failures after
//! that point produce a partial success instead of a plain failure.

use chrono::Utc;
use locci_core::domain::build::{BuildId, BuildRecipe, PublishedImage, SourceReference};
use locci_core::domain::event::CompletionEvent;
use locci_core::domain::pipeline::{PipelineStage, StageFailure};
use locci_core::dto::build::StartBuild;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use crate::stages::{
    ArtifactStore, BuildError, EventNotifier, ExportError, ImageBuilder, NotifyError,
    PublishError, RegistryPublisher, SourceError, SourceResolver,
};

/// Request rejected before a run was started
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Failure of a single stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl StageError {
    /// Stage the error was raised in
    pub fn stage(&self) -> PipelineStage {
        match self {
            StageError::Source(_) => PipelineStage::Resolving,
            StageError::Build(_) => PipelineStage::Building,
            StageError::Publish(_) => PipelineStage::Publishing,
            StageError::Export(_) => PipelineStage::Exporting,
            StageError::Notify(_) => PipelineStage::Notifying,
        }
    }

    pub fn to_failure(&self) -> StageFailure {
        StageFailure::new(self.stage(), self.to_string())
    }
}

/// Outcome of a pipeline run
#[derive(Debug)]
pub enum PipelineResult {
    /// Every stage succeeded and the event was delivered
    Completed {
        event: CompletionEvent,
        image: PublishedImage,
        export_path: PathBuf,
    },
    /// The image is live but export and/or notify failed
    PartialSuccess {
        event: CompletionEvent,
        image: PublishedImage,
        export_path: Option<PathBuf>,
        failures: Vec<StageError>,
    },
    /// The run stopped before anything was published
    Failed {
        build_id: BuildId,
        stage: PipelineStage,
        error: StageError,
    },
}

/// Tracks the stage of one run
struct Progress {
    build_id: BuildId,
    stage: PipelineStage,
}

impl Progress {
    fn start(build_id: BuildId) -> Self {
        info!(%build_id, stage = %PipelineStage::Resolving, "Pipeline {} started", build_id);
        Self {
            build_id,
            stage: PipelineStage::Resolving,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert_eq!(self.stage.next(), Some(next));
        info!(
            build_id = %self.build_id,
            stage = %next,
            "Pipeline {}: {} -> {}",
            self.build_id,
            self.stage,
            next
        );
        self.stage = next;
    }

    fn fail(self, error: impl Into<StageError>) -> PipelineResult {
        let error = error.into();
        error!(
            build_id = %self.build_id,
            stage = %self.stage,
            "Pipeline {} failed while {}: {}",
            self.build_id,
            self.stage,
            error
        );
        PipelineResult::Failed {
            build_id: self.build_id,
            stage: self.stage,
            error,
        }
    }
}

/// Sequences the pipeline stages
pub struct PipelineService {
    resolver: Arc<dyn SourceResolver>,
    builder: ImageBuilder,
    publisher: RegistryPublisher,
    artifacts: ArtifactStore,
    notifier: EventNotifier,
    default_recipe: BuildRecipe,
}

impl PipelineService {
    pub fn new(
        resolver: Arc<dyn SourceResolver>,
        builder: ImageBuilder,
        publisher: RegistryPublisher,
        artifacts: ArtifactStore,
        notifier: EventNotifier,
        default_recipe: BuildRecipe,
    ) -> Self {
        Self {
            resolver,
            builder,
            publisher,
            artifacts,
            notifier,
            default_recipe,
        }
    }

    /// Validates a trigger request and runs the pipeline for it
    pub async fn start_build(&self, req: StartBuild) -> Result<PipelineResult, ValidationError> {
        let source = req.source();
        validate_source(&source)?;

        let recipe = match req.recipe {
            Some(overrides) => overrides.apply(&self.default_recipe),
            None => self.default_recipe.clone(),
        };
        validate_recipe(&recipe)?;

        let build_id = BuildId::generate();
        let span = info_span!("pipeline", %build_id);

        Ok(self.run(build_id, &source, &recipe).instrument(span).await)
    }

    /// Runs every stage for an already validated request
    pub async fn run(
        &self,
        build_id: BuildId,
        source: &SourceReference,
        recipe: &BuildRecipe,
    ) -> PipelineResult {
        let mut progress = Progress::start(build_id);

        let tree = match self.resolver.resolve(source).await {
            Ok(tree) => tree,
            Err(e) => return progress.fail(e),
        };

        progress.advance(PipelineStage::Building);
        let output = match self.builder.build(build_id, &tree, recipe).await {
            Ok(output) => output,
            Err(e) => return progress.fail(e),
        };
        drop(tree);

        progress.advance(PipelineStage::Publishing);
        let image = match self.publisher.publish(&output, build_id).await {
            Ok(image) => image,
            Err(e) => return progress.fail(e),
        };

        // From here on the image is live; failures are collected, not fatal
        let mut failures: Vec<StageError> = Vec::new();

        progress.advance(PipelineStage::Exporting);
        let export_path = match self.artifacts.export(&output, build_id).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Export of {} failed: {}", build_id, e);
                failures.push(e.into());
                None
            }
        };
        drop(output);

        progress.advance(PipelineStage::Notifying);
        let event = CompletionEvent {
            image_name: image.reference.clone(),
            unique_id: build_id.to_string(),
            repository: Some(source.repository.clone()),
            branch: Some(source.branch.clone()),
            completed_at: Some(Utc::now()),
        };

        if let Err(e) = self.notifier.notify(&event).await {
            warn!(
                "Notification of {} to '{}' failed: {}",
                build_id,
                self.notifier.queue(),
                e
            );
            failures.push(e.into());
        }

        match export_path {
            Some(export_path) if failures.is_empty() => {
                progress.advance(PipelineStage::Done);
                info!("Pipeline completed successfully! {}", export_path.display());
                PipelineResult::Completed {
                    event,
                    image,
                    export_path,
                }
            }
            export_path => {
                warn!(
                    "Pipeline {} published {} with {} failed stage(s)",
                    build_id,
                    image.reference,
                    failures.len()
                );
                PipelineResult::PartialSuccess {
                    event,
                    image,
                    export_path,
                    failures,
                }
            }
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_source(source: &SourceReference) -> Result<(), ValidationError> {
    if source.repository.trim().is_empty() {
        return Err(ValidationError("Repository cannot be empty".to_string()));
    }

    if source.repository.starts_with('-') || source.repository.contains(char::is_whitespace) {
        return Err(ValidationError(format!(
            "Invalid repository: {}",
            source.repository
        )));
    }

    if source.branch.trim().is_empty() {
        return Err(ValidationError("Branch cannot be empty".to_string()));
    }

    if source.branch.starts_with('-') || source.branch.contains(char::is_whitespace) {
        return Err(ValidationError(format!("Invalid branch: {}", source.branch)));
    }

    Ok(())
}

/// Checks that a recipe can drive a build
///
/// Images and directories end up in the runtime Containerfile, so they must
/// be single tokens.
pub fn validate_recipe(recipe: &BuildRecipe) -> Result<(), ValidationError> {
    for (name, image) in [
        ("build_image", &recipe.build_image),
        ("runtime_image", &recipe.runtime_image),
    ] {
        if image.trim().is_empty() {
            return Err(ValidationError(format!("{} cannot be empty", name)));
        }
        if !is_token(image) {
            return Err(ValidationError(format!("Invalid {}: {:?}", name, image)));
        }
    }

    if recipe.commands.is_empty() {
        return Err(ValidationError(
            "At least one build command is required".to_string(),
        ));
    }

    if let Some(position) = recipe
        .commands
        .iter()
        .position(|argv| argv.first().is_none_or(|program| program.trim().is_empty()))
    {
        return Err(ValidationError(format!(
            "Build command {} is empty",
            position
        )));
    }

    for (name, dir) in [
        ("workdir", &recipe.workdir),
        ("output_dir", &recipe.output_dir),
        ("serve_dir", &recipe.serve_dir),
    ] {
        if !dir.starts_with('/') {
            return Err(ValidationError(format!(
                "{} must be an absolute path, got '{}'",
                name, dir
            )));
        }
        if !is_token(dir) {
            return Err(ValidationError(format!("Invalid {}: {:?}", name, dir)));
        }
    }

    if recipe.entrypoint.is_empty() {
        return Err(ValidationError("Entrypoint cannot be empty".to_string()));
    }

    if recipe
        .entrypoint
        .iter()
        .any(|arg| arg.contains(char::is_control))
    {
        return Err(ValidationError(
            "Entrypoint cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

// Non-empty, no whitespace or control characters, not an option
fn is_token(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.contains(|c: char| c.is_whitespace() || c.is_control())
}
