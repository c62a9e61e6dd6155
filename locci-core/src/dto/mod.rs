//! Data transfer objects
//!
//! Request and response bodies of the orchestrator HTTP API.

pub mod build;

use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
