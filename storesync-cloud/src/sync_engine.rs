//! Sync orchestration.
//!
//! `EcommerceSync` runs one customer sync for one store view: build the
//! batch, submit it to `/batches`, record the local batch job. The
//! `SyncEngine` loop runs it for every configured store view on an interval,
//! concurrently across store views, and on demand through a `SyncHandle`.

use crate::api_client::ClientFactory;
use crate::batch::BatchId;
use crate::config::SyncConfig;
use crate::customers::CustomerBatchBuilder;
use crate::error::{SyncError, SyncResult};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use storesync_storage::BatchJobStore;
use storesync_types::{BatchJob, BatchStatus, Scope};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Outcome of one store view's sync.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub magento_store_id: u32,
    pub remote_store_id: String,
    pub batch_id: BatchId,
    /// Id of the remote batch job; `None` when nothing was pending.
    pub remote_batch_id: Option<String>,
    pub submitted: usize,
    pub skipped: Vec<i64>,
}

pub struct EcommerceSync {
    builder: CustomerBatchBuilder,
    clients: ClientFactory,
    batch_jobs: BatchJobStore,
}

impl EcommerceSync {
    pub fn new(builder: CustomerBatchBuilder, clients: ClientFactory, batch_jobs: BatchJobStore) -> Self {
        Self {
            builder,
            clients,
            batch_jobs,
        }
    }

    /// Builds and submits the next customer batch for a store view.
    ///
    /// If submission fails, every record of the batch is flagged modified
    /// with the error so the next run picks it up again.
    pub async fn sync_customers(&self, magento_store_id: u32) -> SyncResult<SyncReport> {
        let remote_store_id = self
            .clients
            .settings()
            .remote_store_id(magento_store_id)?
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "no remote store configured for store {magento_store_id}"
                ))
            })?;
        let client = self.clients.client_for(Scope::store(magento_store_id))?;

        let batch = self
            .builder
            .create_batch(&remote_store_id, magento_store_id)
            .await?;

        let mut report = SyncReport {
            magento_store_id,
            remote_store_id: remote_store_id.clone(),
            batch_id: batch.batch_id.clone(),
            remote_batch_id: None,
            submitted: 0,
            skipped: batch.skipped.clone(),
        };
        if batch.is_empty() {
            debug!("Nothing to sync for store {magento_store_id}");
            return Ok(report);
        }

        let response = match client.submit_batch(&batch.operations).await {
            Ok(response) => response,
            Err(e) => {
                error!("Batch {} for store {magento_store_id} failed: {e}", batch.batch_id);
                let flagged = self
                    .builder
                    .tracker()
                    .record_batch_failure(&batch.batch_id, &e.to_string())?;
                debug!("Flagged {flagged} customers of {} for retry", batch.batch_id);
                return Err(e);
            }
        };

        let now = Utc::now();
        self.batch_jobs.insert(&BatchJob {
            batch_id: response.id.clone(),
            remote_store_id,
            magento_store_id,
            status: BatchStatus::Pending,
            created_at: now,
            modified_at: now,
        })?;
        info!(
            "Submitted batch {} ({} operations) for store {magento_store_id}",
            response.id,
            batch.operations.len()
        );

        report.remote_batch_id = Some(response.id);
        report.submitted = batch.operations.len();
        Ok(report)
    }

    /// Syncs every store view concurrently.
    pub async fn sync_all(&self, store_ids: &[u32]) -> Vec<SyncResult<SyncReport>> {
        join_all(store_ids.iter().map(|&id| self.sync_customers(id))).await
    }
}

/// Commands accepted by a running [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    SyncNow,
    Stop,
}

/// Handle for sending commands to the sync engine.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.send(SyncCommand::SyncNow).await
    }

    pub async fn stop(&self) -> SyncResult<()> {
        self.send(SyncCommand::Stop).await
    }

    async fn send(&self, command: SyncCommand) -> SyncResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SyncError::Api("sync engine not running".to_string()))
    }
}

/// Periodic sync loop over the configured store views.
pub struct SyncEngine {
    sync: Arc<EcommerceSync>,
    store_ids: Vec<u32>,
    interval: Duration,
    command_rx: mpsc::Receiver<SyncCommand>,
}

/// Creates a sync engine over `config.store_ids` and its command handle.
pub fn create_sync_engine(sync: Arc<EcommerceSync>, config: &SyncConfig) -> (SyncHandle, SyncEngine) {
    let (command_tx, command_rx) = mpsc::channel(16);
    let engine = SyncEngine {
        sync,
        store_ids: config.store_ids.clone(),
        interval: Duration::from_secs(config.sync_interval_secs.max(1)),
        command_rx,
    };
    (SyncHandle { command_tx }, engine)
}

impl SyncEngine {
    /// Runs until `Stop` is received or every handle is dropped.
    /// A pass in progress always completes before a command is handled.
    pub async fn run(&mut self) {
        info!("sync engine started for stores {:?}", self.store_ids);

        let mut interval = tokio::time::interval(self.interval);
        // Skip first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SyncCommand::SyncNow) => {
                            self.run_pass().await;
                        }
                        Some(SyncCommand::Stop) => {
                            info!("sync engine stopping");
                            break;
                        }
                        None => {
                            info!("command channel closed, stopping sync engine");
                            break;
                        }
                    }
                }
            }
        }

        info!("sync engine stopped");
    }

    async fn run_pass(&self) {
        for result in self.sync.sync_all(&self.store_ids).await {
            match result {
                Ok(report) => debug!(
                    "store {}: {} submitted, {} skipped",
                    report.magento_store_id,
                    report.submitted,
                    report.skipped.len()
                ),
                Err(e) if e.is_configuration() => warn!("sync skipped: {e}"),
                Err(e) => error!("sync failed: {e}"),
            }
        }
    }
}
