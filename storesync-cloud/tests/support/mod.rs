//! Shared fixtures for integration tests: in-memory stores wired to a
//! wiremock server standing in for the remote API.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storesync_cloud::api_client::ClientFactory;
use storesync_cloud::batch::BatchId;
use storesync_cloud::countries::EnglishCountryNames;
use storesync_cloud::customers::CustomerBatchBuilder;
use storesync_cloud::enricher::RecordEnricher;
use storesync_cloud::payload::PayloadBuilder;
use storesync_cloud::selector::SyncCandidateSelector;
use storesync_cloud::settings::{self, ScopeSettings};
use storesync_cloud::source::{CustomerSource, SubscriptionService};
use storesync_cloud::stores::StoreLifecycleManager;
use storesync_cloud::sync_engine::EcommerceSync;
use storesync_cloud::tracker::SyncStateTracker;
use storesync_cloud::{SyncConfig, SyncError, SyncResult};
use storesync_storage::{
    BatchJobStore, CustomerEntity, ScopeConfigStore, SqliteCatalog, SyncDataStore,
};
use storesync_types::{CustomerRow, EntityType, Scope};
use wiremock::MockServer;

pub const API_KEY: &str = "0123456789abcdef-us6";
pub const REMOTE_STORE: &str = "a1b2c3d4e5";
pub const LIST_ID: &str = "list-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub server: MockServer,
    pub catalog: SqliteCatalog,
    pub sync_data: SyncDataStore,
    pub batch_jobs: BatchJobStore,
    pub settings: ScopeSettings,
}

impl Fixture {
    pub async fn start() -> Self {
        init_tracing();
        Self {
            server: MockServer::start().await,
            catalog: SqliteCatalog::open_in_memory().unwrap(),
            sync_data: SyncDataStore::open_in_memory().unwrap(),
            batch_jobs: BatchJobStore::open_in_memory().unwrap(),
            settings: ScopeSettings::new(ScopeConfigStore::open_in_memory().unwrap()),
        }
    }

    pub fn config(&self) -> SyncConfig {
        SyncConfig {
            api_base_url: Some(self.server.uri()),
            ..SyncConfig::default()
        }
    }

    pub fn clients(&self) -> ClientFactory {
        ClientFactory::new(self.config(), self.settings.clone())
    }

    /// API key, list and remote store id at the default scope.
    pub fn configure(&self) {
        self.settings
            .store()
            .set_many(
                &[
                    (settings::API_KEY, API_KEY),
                    (settings::GENERAL_LIST, LIST_ID),
                    (settings::REMOTE_STORE_ID, REMOTE_STORE),
                ],
                Scope::DEFAULT,
            )
            .unwrap();
    }

    pub fn set(&self, path: &str, scope: Scope, value: &str) {
        self.settings.store().set(path, scope, value).unwrap();
    }

    pub fn tracker(&self) -> SyncStateTracker {
        SyncStateTracker::new(self.sync_data.clone(), self.settings.clone())
    }

    pub fn builder(&self, limit: usize) -> CustomerBatchBuilder {
        CustomerBatchBuilder::with_catalog(
            self.catalog.clone(),
            self.sync_data.clone(),
            self.settings.clone(),
            limit,
        )
    }

    pub fn builder_with(&self, source: Arc<dyn CustomerSource>, limit: usize) -> CustomerBatchBuilder {
        CustomerBatchBuilder::new(
            SyncCandidateSelector::new(source.clone(), self.sync_data.clone()),
            RecordEnricher::new(source),
            PayloadBuilder::new(Arc::new(self.catalog.clone()), Arc::new(EnglishCountryNames)),
            self.tracker(),
            self.settings.clone(),
            Arc::new(self.catalog.clone()),
            limit,
        )
    }

    /// Catalog-backed builder with its own subscription service.
    pub fn builder_subscribing(
        &self,
        subscriptions: Arc<dyn SubscriptionService>,
        limit: usize,
    ) -> CustomerBatchBuilder {
        let catalog: Arc<SqliteCatalog> = Arc::new(self.catalog.clone());
        CustomerBatchBuilder::new(
            SyncCandidateSelector::new(catalog.clone(), self.sync_data.clone()),
            RecordEnricher::new(catalog.clone()),
            PayloadBuilder::new(catalog, Arc::new(EnglishCountryNames)),
            self.tracker(),
            self.settings.clone(),
            subscriptions,
            limit,
        )
    }

    pub fn sync(&self) -> EcommerceSync {
        let config = self.config();
        EcommerceSync::new(
            self.builder(config.batch_limit),
            self.clients(),
            self.batch_jobs.clone(),
        )
    }

    pub fn stores(&self) -> StoreLifecycleManager {
        StoreLifecycleManager::new(self.clients(), self.batch_jobs.clone())
    }

    pub fn add_customer(&self, id: i64, email: &str, store_id: u32) {
        self.catalog
            .upsert_customer(&CustomerEntity {
                id,
                email: Some(email.to_string()),
                firstname: Some("FirstName".into()),
                lastname: Some("LastName".into()),
                store_id,
                mailchimp_store_view: None,
            })
            .unwrap();
    }

    /// Marks a customer as synced and unmodified at the test remote store.
    pub fn mark_synced(&self, id: i64) {
        self.tracker()
            .record_success(
                id,
                EntityType::Customer,
                REMOTE_STORE,
                &BatchId::now(1, EntityType::Customer),
            )
            .unwrap();
    }
}

/// In-memory customer source returning fixed rows.
pub struct FixedSource {
    pub rows: Vec<CustomerRow>,
}

impl CustomerSource for FixedSource {
    fn customer_ids_in_store(
        &self,
        _store_id: u32,
        after: Option<i64>,
        limit: usize,
    ) -> SyncResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .rows
            .iter()
            .map(|r| r.id)
            .filter(|id| after.map_or(true, |after| *id > after))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.truncate(limit);
        Ok(ids)
    }

    fn load_customers(&self, ids: &[i64]) -> SyncResult<Vec<CustomerRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }
}

/// Subscription service whose calls all fail. Counts subscribe attempts.
#[derive(Default)]
pub struct FailingSubscriptions {
    pub attempts: AtomicUsize,
    /// When set, `is_subscribed` fails too.
    pub lookup_fails: bool,
}

impl FailingSubscriptions {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionService for FailingSubscriptions {
    async fn is_subscribed(&self, _email: &str) -> SyncResult<bool> {
        if self.lookup_fails {
            return Err(SyncError::Api("subscriber lookup down".into()));
        }
        Ok(false)
    }

    async fn subscribe(&self, _email: &str) -> SyncResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SyncError::Api("down".into()))
    }
}

pub fn row(id: i64, email: &str) -> CustomerRow {
    CustomerRow {
        id,
        email: Some(email.to_string()),
        firstname: Some("FirstName".into()),
        lastname: Some("LastName".into()),
        ..CustomerRow::default()
    }
}
