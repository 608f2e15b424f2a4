//! Batch ids and batch operation assembly.

use crate::error::{SyncError, SyncResult};
use crate::types::{BatchOperation, CustomerPayload};
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashSet;
use std::fmt;
use storesync_types::EntityType;

/// Identifier of one sync run, embedded in every operation id of the run.
///
/// Format: `storeid-{store}_{TAG}_{YYYY-mm-dd-HH-MM-SS}-{fraction}` where the
/// fraction is the microseconds followed by `00`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(magento_store_id: u32, entity_type: EntityType, at: DateTime<Utc>) -> Self {
        let micros = at.nanosecond() % 1_000_000_000 / 1_000;
        Self(format!(
            "storeid-{magento_store_id}_{}_{}-{micros:06}00",
            entity_type.tag(),
            at.format("%Y-%m-%d-%H-%M-%S"),
        ))
    }

    pub fn now(magento_store_id: u32, entity_type: EntityType) -> Self {
        Self::new(magento_store_id, entity_type, Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps customer payloads into PUT operations for one run.
///
/// Operation ids are unique within the run; a second payload with the same
/// id is rejected.
pub struct BatchAssembler {
    batch_id: BatchId,
    remote_store_id: String,
    seen: HashSet<String>,
}

impl BatchAssembler {
    pub fn new(batch_id: BatchId, remote_store_id: impl Into<String>) -> Self {
        Self {
            batch_id,
            remote_store_id: remote_store_id.into(),
            seen: HashSet::new(),
        }
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    /// Serializes the payload into an operation. Fails on serialization
    /// errors and on a repeated operation id; neither leaves a trace in the
    /// assembler.
    pub fn assemble(&mut self, payload: &CustomerPayload) -> SyncResult<BatchOperation> {
        let operation_id = format!("{}_{}", self.batch_id, payload.id);
        if self.seen.contains(&operation_id) {
            return Err(SyncError::DuplicateOperation(operation_id));
        }

        let body = serde_json::to_string(payload)?;
        self.seen.insert(operation_id.clone());

        Ok(BatchOperation {
            method: "PUT".to_string(),
            path: format!(
                "/ecommerce/stores/{}/customers/{}",
                self.remote_store_id, payload.id
            ),
            operation_id,
            body,
        })
    }
}
