//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and other settings.

use anyhow::{Context, Result};
use locci_client::LocciClient;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,

    /// Request timeout; `None` waits for the run however long it takes
    pub timeout: Option<Duration>,
}

impl Config {
    /// Client for the configured orchestrator
    pub fn client(&self) -> Result<LocciClient> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(LocciClient::with_client(&self.orchestrator_url, http))
    }
}
