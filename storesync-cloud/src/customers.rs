//! One customer sync run for one store view.
//!
//! Select → enrich → build payload → assemble → record, per customer.
//! Failures of a single customer (serialization, duplicate operation id)
//! skip that customer only; its sync state is left untouched so the next run
//! retries it.

use crate::batch::{BatchAssembler, BatchId};
use crate::countries::EnglishCountryNames;
use crate::enricher::RecordEnricher;
use crate::error::{SyncError, SyncResult};
use crate::payload::PayloadBuilder;
use crate::selector::{SelectionParams, SyncCandidateSelector};
use crate::settings::ScopeSettings;
use crate::source::SubscriptionService;
use crate::tracker::{OptInCache, SyncStateTracker};
use crate::types::BatchOperation;
use std::sync::Arc;
use storesync_storage::{SqliteCatalog, SyncDataStore};
use storesync_types::EntityType;
use tracing::{debug, warn};

/// Output of one run.
#[derive(Clone, Debug)]
pub struct CustomerBatch {
    pub batch_id: BatchId,
    pub operations: Vec<BatchOperation>,
    /// Customers whose operation is in `operations`, in the same order.
    pub entity_ids: Vec<i64>,
    /// Customers dropped from this run.
    pub skipped: Vec<i64>,
}

impl CustomerBatch {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

pub struct CustomerBatchBuilder {
    selector: SyncCandidateSelector,
    enricher: RecordEnricher,
    payloads: PayloadBuilder,
    tracker: SyncStateTracker,
    settings: ScopeSettings,
    subscriptions: Arc<dyn SubscriptionService>,
    batch_limit: usize,
}

impl CustomerBatchBuilder {
    pub fn new(
        selector: SyncCandidateSelector,
        enricher: RecordEnricher,
        payloads: PayloadBuilder,
        tracker: SyncStateTracker,
        settings: ScopeSettings,
        subscriptions: Arc<dyn SubscriptionService>,
        batch_limit: usize,
    ) -> Self {
        Self {
            selector,
            enricher,
            payloads,
            tracker,
            settings,
            subscriptions,
            batch_limit,
        }
    }

    /// Builder reading customers, regions and subscriptions from one catalog.
    pub fn with_catalog(
        catalog: SqliteCatalog,
        sync_data: SyncDataStore,
        settings: ScopeSettings,
        batch_limit: usize,
    ) -> Self {
        let catalog = Arc::new(catalog);
        Self::new(
            SyncCandidateSelector::new(catalog.clone(), sync_data.clone()),
            RecordEnricher::new(catalog.clone()),
            PayloadBuilder::new(catalog.clone(), Arc::new(EnglishCountryNames)),
            SyncStateTracker::new(sync_data, settings.clone()),
            settings,
            catalog,
            batch_limit,
        )
    }

    pub fn tracker(&self) -> &SyncStateTracker {
        &self.tracker
    }

    /// Builds the next batch of customer operations for a store view.
    pub async fn create_batch(
        &self,
        remote_store_id: &str,
        magento_store_id: u32,
    ) -> SyncResult<CustomerBatch> {
        let params = SelectionParams {
            magento_store_id,
            remote_store_id: remote_store_id.to_string(),
            entity_type: EntityType::Customer,
            limit: self.batch_limit,
        };
        let ids = self.selector.select(&params)?;
        let customers = self.enricher.enrich(&ids)?;

        let batch_id = BatchId::now(magento_store_id, EntityType::Customer);
        let mut assembler = BatchAssembler::new(batch_id.clone(), remote_store_id);
        let mut opt_in = OptInCache::new();
        let opted_in = opt_in.is_opted_in(&self.settings, magento_store_id)?;

        let mut batch = CustomerBatch {
            batch_id,
            operations: Vec::with_capacity(customers.len()),
            entity_ids: Vec::with_capacity(customers.len()),
            skipped: Vec::new(),
        };

        for customer in &customers {
            let payload = self.payloads.build(customer);
            debug!(
                "Creating e-commerce batch for store {magento_store_id}: Adding customer {} email {} \
                 fname {} lname {} opt-in {} num_orders {} total_spent {}",
                payload.id,
                payload.email_address,
                payload.first_name,
                payload.last_name,
                if payload.opt_in_status { "YES" } else { "NO" },
                payload.orders_count,
                payload.total_spent,
            );

            match assembler.assemble(&payload) {
                Ok(operation) => {
                    if let Err(e) = self.tracker.record_success(
                        customer.id,
                        EntityType::Customer,
                        remote_store_id,
                        &batch.batch_id,
                    ) {
                        warn!(
                            "Could not record sync state for customer {} in store {magento_store_id}: {e}",
                            customer.id
                        );
                    }
                    batch.operations.push(operation);
                    batch.entity_ids.push(customer.id);
                }
                Err(SyncError::DuplicateOperation(operation_id)) => {
                    warn!(
                        "Customer {} in store {magento_store_id} duplicates operation {operation_id}, skipped",
                        customer.id
                    );
                    batch.skipped.push(customer.id);
                }
                Err(e) => {
                    warn!(
                        "Customer {} json encode failed in store {magento_store_id}: {e}",
                        customer.id
                    );
                    batch.skipped.push(customer.id);
                }
            }

            if opted_in {
                self.subscribe(&payload.email_address, magento_store_id).await;
            }
        }

        debug!(
            "Customer batch {} for store {magento_store_id}: {} operations, {} skipped",
            batch.batch_id,
            batch.operations.len(),
            batch.skipped.len()
        );
        Ok(batch)
    }

    /// Subscribes a contact unless already subscribed. Errors are logged.
    async fn subscribe(&self, email: &str, magento_store_id: u32) {
        if email.is_empty() {
            return;
        }
        match self.subscriptions.is_subscribed(email).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.subscriptions.subscribe(email).await {
                    warn!("Could not subscribe {email} in store {magento_store_id}: {e}");
                }
            }
            Err(e) => warn!("Could not check subscription of {email} in store {magento_store_id}: {e}"),
        }
    }
}
