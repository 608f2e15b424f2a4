//! SQLite storage layer for storesync.
//!
//! # Architecture
//!
//! - `SyncDataStore` keeps per-record sync bookkeeping
//!   (delta / error / modified flags) keyed by entity, type and remote store
//! - `BatchJobStore` tracks batches submitted to the remote API
//! - `ScopeConfigStore` holds per-scope settings (`default` / `websites` / `stores`)
//! - `SqliteCatalog` is the platform read model: customers, billing
//!   addresses, orders, regions and newsletter subscribers
//!
//! Every store is a cheap `Clone` handle over one shared connection.

mod batch_jobs;
mod catalog;
mod config_store;
mod error;
mod sync_data;

pub use batch_jobs::BatchJobStore;
pub use catalog::{AddressEntity, CustomerEntity, SqliteCatalog};
pub use config_store::ScopeConfigStore;
pub use error::{StorageError, StorageResult};
pub use sync_data::SyncDataStore;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) type SharedConnection = Arc<Mutex<Connection>>;

/// Most ids bound into one `IN (...)` list. Keeps every query well under
/// SQLite's host-parameter limit.
pub(crate) const MAX_BOUND_IDS: usize = 500;

pub(crate) fn id_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Open a SQLite connection with WAL journaling and a busy timeout.
///
/// WAL lets a sync run read while lifecycle calls write from another
/// connection to the same file.
pub fn open_sqlite(path: &std::path::Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

pub(crate) fn lock(conn: &SharedConnection) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| StorageError::LockPoisoned)
}

pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Reads an optional RFC 3339 timestamp column.
pub(crate) fn time_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}
