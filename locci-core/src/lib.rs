//! Locci Core
//!
//! Core types and abstractions for the Locci build pipeline.
//!
//! This crate contains:
//! - Domain types: build identifiers, source references, recipes, completion events
//! - DTOs: request/response bodies shared by the orchestrator and its clients

pub mod domain;
pub mod dto;
