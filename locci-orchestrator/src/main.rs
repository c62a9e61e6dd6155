//! Locci Orchestrator
//!
//! Turns a repository branch into a published container image.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Stages: Source resolution, image build, registry push, export, notify
//! - Services: Pipeline sequencing and the book catalog
//! - API: HTTP trigger interface on axum
//!
//! Every POST /build runs its own pipeline instance; runs share nothing
//! but configuration and the stateless stage components.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod bus;
pub mod config;
pub mod engine;
pub mod service;
pub mod stages;

#[cfg(test)]
mod testing;

use crate::api::AppState;
use crate::bus::AmqpBus;
use crate::config::Config;
use crate::engine::PodmanEngine;
use crate::service::catalog_service::InMemoryBookStore;
use crate::service::pipeline_service::PipelineService;
use crate::stages::{
    ArtifactStore, EventNotifier, GitSourceResolver, ImageBuilder, RegistryPublisher,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locci_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Locci Orchestrator...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    tracing::info!(
        "Loaded configuration: registry={}/{}, queue={}, export_root={}",
        config.registry_host,
        config.image_prefix,
        config.queue,
        config.export_root.display()
    );

    let engine = Arc::new(PodmanEngine::new(config.podman_bin.clone()));
    if let Err(e) = engine.check_available().await {
        // Requests will fail at the build stage until the engine shows up
        tracing::warn!("Container engine not available: {}", e);
    }

    let pipeline = PipelineService::new(
        Arc::new(GitSourceResolver::new(config.git_bin.clone())),
        ImageBuilder::new(engine.clone()),
        RegistryPublisher::new(
            engine,
            config.registry_host.clone(),
            config.image_prefix.clone(),
            config.image_ttl.clone(),
        ),
        ArtifactStore::new(&config.export_root, &config.export_namespace),
        EventNotifier::new(
            Arc::new(AmqpBus::new(config.amqp_url.clone())),
            config.queue.clone(),
            config.notify_timeout,
        ),
        config.recipe.clone(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        books: Arc::new(InMemoryBookStore::seeded()),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
