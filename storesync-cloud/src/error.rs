//! Sync error types.

use serde::{Deserialize, Serialize};
use storesync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing or managing remote stores.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing credential, missing list, placeholder email. Not retried.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("{}", .0.friendly_message())]
    Remote(RemoteError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate operation id in batch: {0}")]
    DuplicateOperation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("not found: {0}")]
    NotFound(String),
}

impl SyncError {
    /// True for errors caused by local configuration rather than a failing call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }

    /// True for failures of the remote service or the connection to it.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::Api(_) | SyncError::Remote(_) | SyncError::Http(_) | SyncError::NotFound(_)
        )
    }
}

/// One per-field validation failure reported by the remote API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

/// Problem document returned by the remote API on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub errors: Vec<FieldError>,
    /// `METHOD /path` of the failed call, filled in by the client.
    #[serde(skip)]
    pub call: String,
}

impl RemoteError {
    /// Human-readable summary: title, the call, then field errors or detail.
    pub fn friendly_message(&self) -> String {
        let title = if self.title.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            self.title.clone()
        };

        let mut message = if self.call.is_empty() {
            title
        } else {
            format!("{title} for api call: {}", self.call)
        };

        let details: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} : {}", e.field, e.message))
            .collect();

        if !details.is_empty() {
            message.push('\n');
            message.push_str(&details.join("\n"));
        } else if !self.detail.is_empty() {
            message.push('\n');
            message.push_str(&self.detail);
        }
        message
    }
}
