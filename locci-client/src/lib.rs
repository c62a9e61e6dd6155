//! Locci HTTP Client
//!
//! A small, type-safe HTTP client for the Locci orchestrator API.
//!
//! # Example
//!
//! ```no_run
//! use locci_client::LocciClient;
//! use locci_core::dto::build::StartBuild;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LocciClient::new("http://localhost:8080");
//!
//!     let response = client.start_build(StartBuild {
//!         repository: "https://github.com/example/app".to_string(),
//!         branch: "main".to_string(),
//!         recipe: None,
//!     }).await?;
//!
//!     println!("Published {}", response.image);
//!     Ok(())
//! }
//! ```

mod books;
mod builds;
pub mod error;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Locci orchestrator API
///
/// Covers the build trigger, the health probe and the book catalog.
#[derive(Debug, Clone)]
pub struct LocciClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl LocciClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use locci_client::LocciClient;
    ///
    /// let client = LocciClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// Builds can take minutes; callers that set a request timeout should
    /// leave room for a full pipeline run.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health
    pub async fn health(&self) -> Result<String> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::api_error(status.as_u16(), body));
        }
        Ok(body)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    ///
    /// Any 2xx status is a success, including 207 partial successes.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Request failed with {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
