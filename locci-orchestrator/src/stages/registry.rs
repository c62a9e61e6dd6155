//! Registry publishing

use locci_core::domain::build::{BuildId, PublishedImage};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{ContainerEngine, EngineError};
use crate::stages::builder::BuildOutput;

/// The image could not be pushed
#[derive(Debug, Error)]
#[error("failed to publish {reference}: {cause}")]
pub struct PublishError {
    pub reference: String,
    #[source]
    pub cause: EngineError,
}

/// Pushes runtime images under per-run tags
///
/// Tags follow `{registry_host}/{image_prefix}-{build_id}:{ttl}`, so two
/// runs never push to the same reference.
#[derive(Clone)]
pub struct RegistryPublisher {
    engine: Arc<dyn ContainerEngine>,
    registry_host: String,
    image_prefix: String,
    ttl: String,
}

impl RegistryPublisher {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        registry_host: impl Into<String>,
        image_prefix: impl Into<String>,
        ttl: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            registry_host: registry_host.into(),
            image_prefix: image_prefix.into(),
            ttl: ttl.into(),
        }
    }

    /// Registry reference a run's image is pushed to
    pub fn reference_for(&self, build_id: BuildId) -> String {
        format!(
            "{}/{}-{}:{}",
            self.registry_host.trim_end_matches('/'),
            self.image_prefix,
            build_id,
            self.ttl
        )
    }

    /// Pushes the runtime image of `output`
    ///
    /// The returned reference carries the manifest digest when the registry
    /// reported one.
    pub async fn publish(
        &self,
        output: &BuildOutput,
        build_id: BuildId,
    ) -> Result<PublishedImage, PublishError> {
        let reference = self.reference_for(build_id);

        let pushed = self.engine.push_image(output.image_tag(), &reference).await;

        if let Err(e) = self.engine.remove_image(output.image_tag()).await {
            warn!("Failed to remove local image {}: {}", output.image_tag(), e);
        }

        let digest = pushed.map_err(|cause| PublishError {
            reference: reference.clone(),
            cause,
        })?;

        let resolved = match digest {
            Some(digest) => format!("{}@{}", reference, digest),
            None => reference,
        };

        info!("Published {}", resolved);
        Ok(PublishedImage {
            reference: resolved,
            ttl: self.ttl.clone(),
        })
    }
}
