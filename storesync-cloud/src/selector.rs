//! Selection of entities pending sync for a store scope.

use crate::error::SyncResult;
use crate::source::CustomerSource;
use std::sync::Arc;
use storesync_storage::SyncDataStore;
use storesync_types::EntityType;
use tracing::debug;

const MIN_PAGE: usize = 100;
const MAX_PAGE: usize = 1000;

/// Parameters of one selection. Passed explicitly on every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionParams {
    pub magento_store_id: u32,
    pub remote_store_id: String,
    pub entity_type: EntityType,
    pub limit: usize,
}

/// Picks ids that have no sync record at the remote store, or whose record
/// is pending (never synced, or modified since).
#[derive(Clone)]
pub struct SyncCandidateSelector {
    source: Arc<dyn CustomerSource>,
    sync_data: SyncDataStore,
}

impl SyncCandidateSelector {
    pub fn new(source: Arc<dyn CustomerSource>, sync_data: SyncDataStore) -> Self {
        Self { source, sync_data }
    }

    /// At most `params.limit` ids, ascending. Read-only.
    ///
    /// Pages through the scope and checks each page against the sync-data
    /// store, so memory stays bounded by the page size and the limit.
    pub fn select(&self, params: &SelectionParams) -> SyncResult<Vec<i64>> {
        if params.limit == 0 {
            return Ok(Vec::new());
        }

        let page_size = params.limit.clamp(MIN_PAGE, MAX_PAGE);
        let mut ids = Vec::with_capacity(params.limit.min(MAX_PAGE));
        let mut after = None;
        while ids.len() < params.limit {
            let page = self
                .source
                .customer_ids_in_store(params.magento_store_id, after, page_size)?;
            let Some(&last) = page.last() else {
                break;
            };
            after = Some(last);

            let settled = self.sync_data.settled_among(
                params.entity_type,
                &params.remote_store_id,
                &page,
            )?;
            let wanted = params.limit - ids.len();
            ids.extend(
                page.iter()
                    .copied()
                    .filter(|id| !settled.contains(id))
                    .take(wanted),
            );
            if page.len() < page_size {
                break;
            }
        }

        debug!(
            "Selected {} {} candidates for store {} ({})",
            ids.len(),
            params.entity_type,
            params.magento_store_id,
            params.remote_store_id
        );
        Ok(ids)
    }
}
