//! E-commerce batch sync engine for storesync.
//!
//! Mirrors platform customers into the remote marketing API's e-commerce
//! model:
//! - Candidate selection from per-record sync state
//! - Enrichment with billing address and order aggregates
//! - Customer payloads and idempotent batch operations
//! - Sync-state tracking and opt-in subscription
//! - Remote store lifecycle (create / edit / delete)
//! - Periodic sync loop across store views

pub mod api_client;
pub mod batch;
pub mod config;
pub mod countries;
pub mod customers;
pub mod enricher;
pub mod error;
pub mod payload;
pub mod selector;
pub mod settings;
pub mod source;
pub mod stores;
pub mod sync_engine;
pub mod tracker;
pub mod types;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use types::*;
