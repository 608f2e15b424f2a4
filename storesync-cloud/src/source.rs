//! Seams to the platform read model and newsletter subscription.

use crate::error::SyncResult;
use async_trait::async_trait;
use storesync_storage::SqliteCatalog;
use storesync_types::CustomerRow;
use tracing::warn;

/// Platform read model for customers.
pub trait CustomerSource: Send + Sync {
    /// One page of customer ids whose store or assigned store view is
    /// `store_id`: at most `limit` ids, ascending, all greater than `after`.
    fn customer_ids_in_store(
        &self,
        store_id: u32,
        after: Option<i64>,
        limit: usize,
    ) -> SyncResult<Vec<i64>>;

    /// Joined rows (default billing address, order aggregates) for `ids`.
    fn load_customers(&self, ids: &[i64]) -> SyncResult<Vec<CustomerRow>>;
}

/// Region code lookup. Failures read as "no code".
pub trait RegionDirectory: Send + Sync {
    fn region_code(&self, region_id: i64) -> Option<String>;
}

/// Newsletter subscription for a contact email.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    async fn is_subscribed(&self, email: &str) -> SyncResult<bool>;
    async fn subscribe(&self, email: &str) -> SyncResult<()>;
}

impl CustomerSource for SqliteCatalog {
    fn customer_ids_in_store(
        &self,
        store_id: u32,
        after: Option<i64>,
        limit: usize,
    ) -> SyncResult<Vec<i64>> {
        Ok(SqliteCatalog::customer_ids_in_store(self, store_id, after, limit)?)
    }

    fn load_customers(&self, ids: &[i64]) -> SyncResult<Vec<CustomerRow>> {
        Ok(SqliteCatalog::load_customers(self, ids)?)
    }
}

impl RegionDirectory for SqliteCatalog {
    fn region_code(&self, region_id: i64) -> Option<String> {
        match SqliteCatalog::region_code(self, region_id) {
            Ok(code) => code.filter(|c| !c.is_empty()),
            Err(e) => {
                warn!("Region lookup failed for region {region_id}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl SubscriptionService for SqliteCatalog {
    async fn is_subscribed(&self, email: &str) -> SyncResult<bool> {
        Ok(SqliteCatalog::is_subscribed(self, email)?)
    }

    async fn subscribe(&self, email: &str) -> SyncResult<()> {
        Ok(SqliteCatalog::subscribe(self, email)?)
    }
}
