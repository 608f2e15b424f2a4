//! Shared domain types for storesync.
//!
//! Everything here is plain data: entity kinds and their persisted tags,
//! configuration scopes, per-record sync bookkeeping, local batch jobs, and
//! the loosely typed customer rows produced by the platform read model.

mod customer;
mod entity;
mod scope;
mod sync_record;

pub use customer::{CustomerRow, Scalar};
pub use entity::{EntityType, ParseEntityTypeError};
pub use scope::{Scope, ScopeKind};
pub use sync_record::{BatchJob, BatchStatus, ParseBatchStatusError, SyncDataUpdate, SyncRecord};
