//! Per-record sync bookkeeping.

use crate::error::{StorageError, StorageResult};
use crate::{
    encode_time, id_placeholders, lock, open_sqlite, time_column, SharedConnection, MAX_BOUND_IDS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use storesync_types::{EntityType, SyncDataUpdate, SyncRecord};
use tracing::debug;

const RECORD_COLUMNS: &str = "related_id, type, mailchimp_store_id, mailchimp_sync_delta, \
     mailchimp_sync_error, mailchimp_sync_modified, mailchimp_synced_flag, batch_id";

/// Persists sync state keyed by `(related_id, type, mailchimp_store_id)`.
#[derive(Clone)]
pub struct SyncDataStore {
    conn: SharedConnection,
}

impl SyncDataStore {
    /// Opens or creates a sync-data store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        initialize_sync_data_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_sync_data_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Loads the record for one entity at one remote store.
    pub fn get(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        remote_store_id: &str,
    ) -> StorageResult<Option<SyncRecord>> {
        let conn = lock(&self.conn)?;
        load_record(&conn, entity_id, entity_type, remote_store_id)
    }

    /// Applies an update, creating the record unless `save_only_if_exists`.
    ///
    /// Returns false when the update was skipped because no record exists.
    pub fn save(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        remote_store_id: &str,
        update: &SyncDataUpdate,
    ) -> StorageResult<bool> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let existing = load_record(&tx, entity_id, entity_type, remote_store_id)?;
        let record = match existing {
            Some(mut record) => {
                record.apply(update);
                record
            }
            None if update.save_only_if_exists => {
                debug!(
                    "skipping sync data for {entity_type} {entity_id} at store {remote_store_id}: no record"
                );
                return Ok(false);
            }
            None => {
                let mut record = SyncRecord::new(entity_id, entity_type, remote_store_id);
                record.apply(update);
                // A fresh record has no batch to protect.
                if !update.allow_batch_removal {
                    record.batch_id = update.batch_id.clone();
                }
                record
            }
        };

        tx.execute(
            r#"
            INSERT INTO ecommerce_sync_data (
                related_id, type, mailchimp_store_id,
                mailchimp_sync_delta, mailchimp_sync_error,
                mailchimp_sync_modified, mailchimp_synced_flag, batch_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (related_id, type, mailchimp_store_id) DO UPDATE SET
                mailchimp_sync_delta = excluded.mailchimp_sync_delta,
                mailchimp_sync_error = excluded.mailchimp_sync_error,
                mailchimp_sync_modified = excluded.mailchimp_sync_modified,
                mailchimp_synced_flag = excluded.mailchimp_synced_flag,
                batch_id = excluded.batch_id
            "#,
            params![
                record.entity_id,
                record.entity_type.tag(),
                record.remote_store_id,
                record.sync_delta.as_ref().map(encode_time),
                record.sync_error,
                record.sync_modified,
                record.synced_flag,
                record.batch_id,
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// The subset of `ids` whose record is settled: synced and not modified
    /// since.
    ///
    /// Everything else in a scope (no record, or
    /// `mailchimp_sync_delta IS NULL OR mailchimp_sync_modified = 1`) is pending.
    pub fn settled_among(
        &self,
        entity_type: EntityType,
        remote_store_id: &str,
        ids: &[i64],
    ) -> StorageResult<HashSet<i64>> {
        let conn = lock(&self.conn)?;
        let mut settled = HashSet::new();
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let mut stmt = conn.prepare(&format!(
                "SELECT related_id FROM ecommerce_sync_data \
                 WHERE type = ? AND mailchimp_store_id = ? \
                 AND mailchimp_sync_delta IS NOT NULL AND mailchimp_sync_modified = 0 \
                 AND related_id IN ({})",
                id_placeholders(chunk.len())
            ))?;
            let mut bound: Vec<Value> = Vec::with_capacity(chunk.len() + 2);
            bound.push(Value::Text(entity_type.tag().to_string()));
            bound.push(Value::Text(remote_store_id.to_string()));
            bound.extend(chunk.iter().map(|id| Value::Integer(*id)));
            let rows = stmt.query_map(params_from_iter(bound), |row| row.get::<_, i64>(0))?;
            for id in rows {
                settled.insert(id?);
            }
        }
        Ok(settled)
    }

    /// Records that went out in the given batch.
    pub fn records_in_batch(&self, batch_id: &str) -> StorageResult<Vec<SyncRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM ecommerce_sync_data WHERE batch_id = ?1"
        ))?;
        let rows = stmt
            .query_map(params![batch_id], row_to_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// Physically removes a record. Returns true if one existed.
    pub fn delete(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        remote_store_id: &str,
    ) -> StorageResult<bool> {
        let conn = lock(&self.conn)?;
        let n = conn.execute(
            "DELETE FROM ecommerce_sync_data \
             WHERE related_id = ?1 AND type = ?2 AND mailchimp_store_id = ?3",
            params![entity_id, entity_type.tag(), remote_store_id],
        )?;
        Ok(n > 0)
    }

    /// Number of records for a type at a remote store.
    pub fn count(&self, entity_type: EntityType, remote_store_id: &str) -> StorageResult<usize> {
        let conn = lock(&self.conn)?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ecommerce_sync_data WHERE type = ?1 AND mailchimp_store_id = ?2",
            params![entity_type.tag(), remote_store_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

/// Row as stored, before the type tag is validated.
struct RawRecord {
    entity_id: i64,
    type_tag: String,
    remote_store_id: String,
    sync_delta: Option<chrono::DateTime<chrono::Utc>>,
    sync_error: Option<String>,
    sync_modified: bool,
    synced_flag: Option<bool>,
    batch_id: Option<String>,
}

impl RawRecord {
    fn into_record(self) -> StorageResult<SyncRecord> {
        let entity_type = self
            .type_tag
            .parse()
            .map_err(|e: storesync_types::ParseEntityTypeError| StorageError::InvalidData(e.to_string()))?;
        Ok(SyncRecord {
            entity_id: self.entity_id,
            entity_type,
            remote_store_id: self.remote_store_id,
            sync_delta: self.sync_delta,
            sync_error: self.sync_error,
            sync_modified: self.sync_modified,
            synced_flag: self.synced_flag,
            batch_id: self.batch_id,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        entity_id: row.get(0)?,
        type_tag: row.get(1)?,
        remote_store_id: row.get(2)?,
        sync_delta: time_column(row, 3)?,
        sync_error: row.get(4)?,
        sync_modified: row.get(5)?,
        synced_flag: row.get(6)?,
        batch_id: row.get(7)?,
    })
}

fn load_record(
    conn: &Connection,
    entity_id: i64,
    entity_type: EntityType,
    remote_store_id: &str,
) -> StorageResult<Option<SyncRecord>> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM ecommerce_sync_data \
                 WHERE related_id = ?1 AND type = ?2 AND mailchimp_store_id = ?3"
            ),
            params![entity_id, entity_type.tag(), remote_store_id],
            row_to_raw,
        )
        .optional()?;
    raw.map(RawRecord::into_record).transpose()
}

fn initialize_sync_data_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ecommerce_sync_data (
            related_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            mailchimp_store_id TEXT NOT NULL,
            mailchimp_sync_delta TEXT,
            mailchimp_sync_error TEXT,
            mailchimp_sync_modified INTEGER NOT NULL DEFAULT 0,
            mailchimp_synced_flag INTEGER,
            batch_id TEXT,
            PRIMARY KEY (related_id, type, mailchimp_store_id)
        );
        CREATE INDEX IF NOT EXISTS idx_sync_data_pending
            ON ecommerce_sync_data(type, mailchimp_store_id, mailchimp_sync_modified);
        CREATE INDEX IF NOT EXISTS idx_sync_data_batch ON ecommerce_sync_data(batch_id);
        "#,
    )?;
    Ok(())
}
