//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod books;
pub mod build;
pub mod error;
pub mod health;

use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::catalog_service::BookStore;
use crate::service::pipeline_service::PipelineService;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineService>,
    pub books: Arc<dyn BookStore>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Build endpoints
        .route("/build", post(build::start_build))
        .route("/build-react", post(build::start_build))
        // Catalog endpoints
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/{id}", get(books::get_book))
        .route("/checkout", patch(books::checkout_book))
        .route("/return", patch(books::return_book))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
