//! Core domain types
//!
//! These types describe a single pipeline run and the records it produces.
//! They are shared between the orchestrator (which produces them) and
//! downstream consumers such as the CLI or a deployment worker.

pub mod book;
pub mod build;
pub mod event;
pub mod pipeline;
