//! Local bookkeeping of batches submitted to the remote API.

use crate::error::{StorageError, StorageResult};
use crate::{encode_time, lock, open_sqlite, time_column, SharedConnection};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use storesync_types::{BatchJob, BatchStatus};
use tracing::info;

const JOB_COLUMNS: &str =
    "batch_id, mailchimp_store_id, store_id, status, created_at, modified_at";

/// Persists submitted batch jobs and their status.
#[derive(Clone)]
pub struct BatchJobStore {
    conn: SharedConnection,
}

impl BatchJobStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        initialize_batch_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_batch_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Records a freshly submitted batch. Re-inserting an id replaces it.
    pub fn insert(&self, job: &BatchJob) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO sync_batches (
                batch_id, mailchimp_store_id, store_id, status, created_at, modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                job.batch_id,
                job.remote_store_id,
                job.magento_store_id,
                job.status.as_str(),
                encode_time(&job.created_at),
                encode_time(&job.modified_at),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, batch_id: &str) -> StorageResult<Option<BatchJob>> {
        let conn = lock(&self.conn)?;
        let raw = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM sync_batches WHERE batch_id = ?1"),
                params![batch_id],
                row_to_raw,
            )
            .optional()?;
        raw.map(RawJob::into_job).transpose()
    }

    pub fn list_by_status(&self, status: BatchStatus) -> StorageResult<Vec<BatchJob>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM sync_batches WHERE status = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
            .query_map(params![status.as_str()], row_to_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawJob::into_job).collect()
    }

    /// Moves one job to a new status. Returns false if the job is unknown.
    pub fn set_status(&self, batch_id: &str, status: BatchStatus) -> StorageResult<bool> {
        let conn = lock(&self.conn)?;
        let n = conn.execute(
            "UPDATE sync_batches SET status = ?1, modified_at = ?2 WHERE batch_id = ?3",
            params![status.as_str(), encode_time(&Utc::now()), batch_id],
        )?;
        Ok(n > 0)
    }

    /// Cancels every job still in `pending` status. Returns how many changed.
    pub fn cancel_pending(&self) -> StorageResult<usize> {
        let conn = lock(&self.conn)?;
        let n = conn.execute(
            "UPDATE sync_batches SET status = ?1, modified_at = ?2 WHERE status = ?3",
            params![
                BatchStatus::Canceled.as_str(),
                encode_time(&Utc::now()),
                BatchStatus::Pending.as_str(),
            ],
        )?;
        if n > 0 {
            info!("canceled {n} pending batch jobs");
        }
        Ok(n)
    }
}

struct RawJob {
    batch_id: String,
    remote_store_id: String,
    magento_store_id: u32,
    status: String,
    created_at: Option<chrono::DateTime<Utc>>,
    modified_at: Option<chrono::DateTime<Utc>>,
}

impl RawJob {
    fn into_job(self) -> StorageResult<BatchJob> {
        let status = self
            .status
            .parse()
            .map_err(|e: storesync_types::ParseBatchStatusError| StorageError::InvalidData(e.to_string()))?;
        let created_at = self
            .created_at
            .ok_or_else(|| StorageError::InvalidData(format!("batch {} has no created_at", self.batch_id)))?;
        Ok(BatchJob {
            modified_at: self.modified_at.unwrap_or(created_at),
            batch_id: self.batch_id,
            remote_store_id: self.remote_store_id,
            magento_store_id: self.magento_store_id,
            status,
            created_at,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawJob> {
    Ok(RawJob {
        batch_id: row.get(0)?,
        remote_store_id: row.get(1)?,
        magento_store_id: row.get(2)?,
        status: row.get(3)?,
        created_at: time_column(row, 4)?,
        modified_at: time_column(row, 5)?,
    })
}

fn initialize_batch_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sync_batches (
            batch_id TEXT PRIMARY KEY,
            mailchimp_store_id TEXT NOT NULL,
            store_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sync_batches_status ON sync_batches(status);
        "#,
    )?;
    Ok(())
}
