//! Completion event domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message published to the deploy queue once an image is live
///
/// `image_name` and `unique_id` are the stable contract with consumers.
/// The remaining fields are optional so older payloads still parse, and
/// consumers ignore fields they do not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub image_name: String,
    pub unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletionEvent {
    pub fn new(image_name: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            unique_id: unique_id.into(),
            repository: None,
            branch: None,
            completed_at: None,
        }
    }

    /// Serializes the event into the queue wire format
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses a queue payload
    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
