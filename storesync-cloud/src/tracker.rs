//! Sync-state bookkeeping and per-run opt-in lookups.

use crate::batch::BatchId;
use crate::error::{SyncError, SyncResult};
use crate::settings::ScopeSettings;
use chrono::Utc;
use std::collections::HashMap;
use storesync_storage::SyncDataStore;
use storesync_types::{EntityType, SyncDataUpdate};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SyncStateTracker {
    sync_data: SyncDataStore,
    settings: ScopeSettings,
}

impl SyncStateTracker {
    pub fn new(sync_data: SyncDataStore, settings: ScopeSettings) -> Self {
        Self {
            sync_data,
            settings,
        }
    }

    pub fn sync_data(&self) -> &SyncDataStore {
        &self.sync_data
    }

    /// Marks a record as sent in `batch_id`: delta now, error cleared,
    /// modified off.
    pub fn record_success(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        remote_store_id: &str,
        batch_id: &BatchId,
    ) -> SyncResult<()> {
        self.sync_data.save(
            entity_id,
            entity_type,
            remote_store_id,
            &SyncDataUpdate::synced(Utc::now(), batch_id.as_str()),
        )?;
        Ok(())
    }

    /// Flags an already tracked entity as changed on the platform so the
    /// next run picks it up again. Untracked entities are left alone and
    /// the in-flight batch id is kept.
    ///
    /// Returns whether a record was updated.
    pub fn record_update(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        magento_store_id: u32,
    ) -> SyncResult<bool> {
        let remote_store_id = self
            .settings
            .remote_store_id(magento_store_id)?
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "no remote store configured for store {magento_store_id}"
                ))
            })?;
        let updated = self.sync_data.save(
            entity_id,
            entity_type,
            &remote_store_id,
            &SyncDataUpdate::touched(),
        )?;
        debug!("Touched {entity_type} {entity_id} at {remote_store_id}: {updated}");
        Ok(updated)
    }

    /// Puts every record of a failed batch back into the pending set with
    /// the failure message. Returns the number of records updated.
    pub fn record_batch_failure(&self, batch_id: &BatchId, message: &str) -> SyncResult<usize> {
        let records = self.sync_data.records_in_batch(batch_id.as_str())?;
        let update = SyncDataUpdate {
            batch_id: Some(batch_id.to_string()),
            ..SyncDataUpdate::failed(message)
        };

        let mut updated = 0;
        for record in &records {
            match self.sync_data.save(
                record.entity_id,
                record.entity_type,
                &record.remote_store_id,
                &update,
            ) {
                Ok(_) => updated += 1,
                Err(e) => warn!(
                    "Could not flag {} {} after failed batch {batch_id}: {e}",
                    record.entity_type, record.entity_id
                ),
            }
        }
        Ok(updated)
    }
}

/// Opt-in setting per store view, read at most once per run.
#[derive(Debug, Default)]
pub struct OptInCache {
    by_store: HashMap<u32, bool>,
}

impl OptInCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_opted_in(&mut self, settings: &ScopeSettings, magento_store_id: u32) -> SyncResult<bool> {
        if let Some(&cached) = self.by_store.get(&magento_store_id) {
            return Ok(cached);
        }
        let opted_in = settings.customers_opt_in(magento_store_id)?;
        self.by_store.insert(magento_store_id, opted_in);
        Ok(opted_in)
    }

    pub fn len(&self) -> usize {
        self.by_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_store.is_empty()
    }
}
