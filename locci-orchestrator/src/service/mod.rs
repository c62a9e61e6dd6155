//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sequence the pipeline stages and own the catalog store.

pub mod catalog;
pub mod pipeline;

// Re-export for convenience
pub use catalog as catalog_service;
pub use pipeline as pipeline_service;
