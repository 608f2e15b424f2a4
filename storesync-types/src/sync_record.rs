//! Per-record sync bookkeeping and local batch jobs.

use crate::entity::EntityType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sync state of one platform entity at one remote store.
///
/// Keyed by `(entity_id, entity_type, remote_store_id)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub remote_store_id: String,
    /// Last successful synchronization.
    pub sync_delta: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    /// Set when the entity changed after its last sync; forces re-selection.
    pub sync_modified: bool,
    pub synced_flag: Option<bool>,
    /// Remote batch the last operation for this record went out in.
    pub batch_id: Option<String>,
}

impl SyncRecord {
    /// A record that has never been synced.
    pub fn new(entity_id: i64, entity_type: EntityType, remote_store_id: impl Into<String>) -> Self {
        Self {
            entity_id,
            entity_type,
            remote_store_id: remote_store_id.into(),
            sync_delta: None,
            sync_error: None,
            sync_modified: false,
            synced_flag: None,
            batch_id: None,
        }
    }

    /// Returns true if the record must be included in the next candidate batch.
    pub fn is_pending(&self) -> bool {
        self.sync_delta.is_none() || self.sync_modified
    }

    /// Applies an update in place.
    pub fn apply(&mut self, update: &SyncDataUpdate) {
        if let Some(delta) = update.delta {
            self.sync_delta = Some(delta);
        }
        if let Some(error) = &update.error {
            self.sync_error = error.clone();
        }
        if let Some(modified) = update.modified {
            self.sync_modified = modified;
        }
        if let Some(flag) = update.synced_flag {
            self.synced_flag = Some(flag);
        }
        if update.allow_batch_removal {
            self.batch_id = update.batch_id.clone();
        }
    }
}

/// A mutation of a [`SyncRecord`]. `None` fields leave the stored value alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncDataUpdate {
    pub delta: Option<DateTime<Utc>>,
    /// `Some(None)` clears the error, `Some(Some(_))` sets it.
    pub error: Option<Option<String>>,
    pub modified: Option<bool>,
    pub synced_flag: Option<bool>,
    pub batch_id: Option<String>,
    /// Skip the write entirely when no record exists yet.
    pub save_only_if_exists: bool,
    /// When false, an existing record keeps its batch id.
    pub allow_batch_removal: bool,
}

impl SyncDataUpdate {
    /// Record built into a batch successfully.
    pub fn synced(at: DateTime<Utc>, batch_id: impl Into<String>) -> Self {
        Self {
            delta: Some(at),
            error: Some(None),
            modified: Some(false),
            synced_flag: None,
            batch_id: Some(batch_id.into()),
            save_only_if_exists: false,
            allow_batch_removal: true,
        }
    }

    /// Entity changed on the platform after it was synced.
    pub fn touched() -> Self {
        Self {
            modified: Some(true),
            save_only_if_exists: true,
            allow_batch_removal: false,
            ..Self::default()
        }
    }

    /// Sync attempt failed; the record goes back into the pending set.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(Some(message.into())),
            modified: Some(true),
            allow_batch_removal: true,
            ..Self::default()
        }
    }
}

/// Lifecycle of a submitted remote batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Completed,
    Canceled,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Completed => "completed",
            BatchStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown batch status: {0}")]
pub struct ParseBatchStatusError(pub String);

impl FromStr for BatchStatus {
    type Err = ParseBatchStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "completed" => Ok(BatchStatus::Completed),
            "canceled" => Ok(BatchStatus::Canceled),
            other => Err(ParseBatchStatusError(other.to_string())),
        }
    }
}

/// Local record of a batch submitted to the remote API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Id assigned by the remote API.
    pub batch_id: String,
    pub remote_store_id: String,
    pub magento_store_id: u32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
