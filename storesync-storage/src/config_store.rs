//! Per-scope configuration values.
//!
//! Values are stored as text under a path (e.g. `mailchimp/general/list`)
//! for one scope. Lookups walk a caller-supplied scope chain from most to
//! least specific, so a store view can fall back to the default scope.

use crate::error::StorageResult;
use crate::{lock, open_sqlite, SharedConnection};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use storesync_types::Scope;

#[derive(Clone)]
pub struct ScopeConfigStore {
    conn: SharedConnection,
}

impl ScopeConfigStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        initialize_config_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_config_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Value set directly at `scope`, without fallback.
    pub fn get(&self, path: &str, scope: Scope) -> StorageResult<Option<String>> {
        let conn = lock(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM config_data WHERE scope = ?1 AND scope_id = ?2 AND path = ?3",
                params![scope.kind.as_str(), scope.id, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// First non-empty value found along `chain`, with the scope that
    /// defines it. An empty value falls through to the next scope.
    pub fn lookup(&self, path: &str, chain: &[Scope]) -> StorageResult<Option<(Scope, String)>> {
        for scope in chain {
            match self.get(path, *scope)? {
                Some(value) if !value.is_empty() => return Ok(Some((*scope, value))),
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn set(&self, path: &str, scope: Scope, value: &str) -> StorageResult<()> {
        self.set_many(&[(path, value)], scope)
    }

    /// Writes several values for one scope in a single transaction.
    pub fn set_many(&self, values: &[(&str, &str)], scope: Scope) -> StorageResult<()> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        for (path, value) in values {
            tx.execute(
                r#"
                INSERT INTO config_data (scope, scope_id, path, value) VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (scope, scope_id, path) DO UPDATE SET value = excluded.value
                "#,
                params![scope.kind.as_str(), scope.id, path, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes a value from one scope. Returns true if it existed.
    pub fn delete(&self, path: &str, scope: Scope) -> StorageResult<bool> {
        let conn = lock(&self.conn)?;
        let n = conn.execute(
            "DELETE FROM config_data WHERE scope = ?1 AND scope_id = ?2 AND path = ?3",
            params![scope.kind.as_str(), scope.id, path],
        )?;
        Ok(n > 0)
    }
}

fn initialize_config_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_data (
            scope TEXT NOT NULL,
            scope_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (scope, scope_id, path)
        );
        "#,
    )?;
    Ok(())
}
