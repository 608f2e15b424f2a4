//! Remote store lifecycle: create, edit, delete.
//!
//! Deleting a store cancels every pending local batch job, whether or not
//! the remote delete succeeded.

use crate::api_client::ClientFactory;
use crate::error::{SyncError, SyncResult};
use crate::settings::ScopeSettings;
use crate::types::{NewStore, RemoteStore, StoreEdit};
use storesync_storage::BatchJobStore;
use storesync_types::Scope;
use tracing::{debug, error, info, warn};

const PLATFORM: &str = "Magento";

#[derive(Clone)]
pub struct StoreLifecycleManager {
    clients: ClientFactory,
    batch_jobs: BatchJobStore,
}

impl StoreLifecycleManager {
    pub fn new(clients: ClientFactory, batch_jobs: BatchJobStore) -> Self {
        Self {
            clients,
            batch_jobs,
        }
    }

    fn settings(&self) -> &ScopeSettings {
        self.clients.settings()
    }

    /// Creates the remote store for `scope`.
    ///
    /// Requires an API key, a list (explicit or the scope's general list) and
    /// a real contact email. None of these failures reach the remote API.
    pub async fn create(
        &self,
        remote_store_id: &str,
        list_id: Option<&str>,
        scope: Scope,
    ) -> SyncResult<RemoteStore> {
        let client = self.clients.client_for(scope)?;
        let settings = self.settings();

        let list_id = match list_id.filter(|l| !l.is_empty()) {
            Some(list) => list.to_string(),
            None => settings.general_list(scope)?.ok_or_else(|| {
                SyncError::Config("You don't have any lists configured in MailChimp".to_string())
            })?,
        };

        let email_address = settings.store_email(scope)?.unwrap_or_default();
        if email_address.contains("example.com") {
            return Err(SyncError::Config(
                "Please, change the general email in Store Email Addresses/General Contact"
                    .to_string(),
            ));
        }

        let store = NewStore {
            id: remote_store_id.to_string(),
            list_id,
            name: settings.store_name(scope)?,
            platform: PLATFORM.to_string(),
            domain: settings.store_domain(scope)?,
            email_address,
            currency_code: settings.currency_code(scope)?,
            is_syncing: true,
        };
        debug!(
            "Creating mailchimp store {} name {} email {} domain {} for list ID {} for {scope}",
            store.id,
            store.name,
            store.email_address,
            store.domain.as_deref().unwrap_or(""),
            store.list_id,
        );
        client.add_store(&store).await
    }

    /// Deletes the remote store (best effort) and cancels all pending batch
    /// jobs. Returns the number of canceled jobs.
    pub async fn delete(&self, remote_store_id: &str, scope: Scope) -> SyncResult<usize> {
        debug!("Deleting mailchimp store {remote_store_id} for {scope}");
        let result = match self.clients.client_for(scope) {
            Ok(client) => client.delete_store(remote_store_id).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("{e} ({scope})");
        }

        Ok(self.batch_jobs.cancel_pending()?)
    }

    /// Renames the scope's remote store. Errors are logged.
    pub async fn modify_name(&self, name: &str, scope: Scope) {
        let result = async {
            let client = self.clients.client_for(scope)?;
            let remote_store_id = self.require_remote_store_id(scope)?;
            debug!("Setting mailchimp store {remote_store_id} name to {name} for {scope}");
            let edit = StoreEdit {
                name: Some(name.to_string()),
                ..StoreEdit::default()
            };
            client.edit_store(&remote_store_id, &edit).await
        }
        .await;

        if let Err(e) = result {
            error!("{e} ({scope})");
        }
    }

    /// Sends a partial update of a remote store.
    pub async fn edit(
        &self,
        remote_store_id: &str,
        edit: &StoreEdit,
        scope: Scope,
    ) -> SyncResult<RemoteStore> {
        let client = self.clients.client_for(scope)?;
        client.edit_store(remote_store_id, edit).await
    }

    /// Fetches the connected site script URL of the scope's store and saves
    /// it into the scope's config. Errors are logged and yield `None`.
    pub async fn connected_site_script_url(&self, scope: Scope) -> Option<String> {
        let result = async {
            let client = self.clients.client_for(scope)?;
            let remote_store_id = self.require_remote_store_id(scope)?;
            debug!("Getting mailchimp store {remote_store_id} connected site URL for {scope}");
            let store = client
                .get_store(&remote_store_id, Some("connected_site"))
                .await?;
            let url = store
                .connected_site
                .and_then(|site| site.site_script)
                .and_then(|script| script.url);
            if let Some(url) = &url {
                self.settings().save_js_url(scope, url)?;
            }
            Ok::<_, SyncError>(url)
        }
        .await;

        match result {
            Ok(url) => url,
            Err(e) => {
                error!("{e} ({scope})");
                None
            }
        }
    }

    /// Sets the remote `is_syncing` flag, then mirrors it into the config
    /// scope that defines the store view's remote store id.
    ///
    /// A remote failure leaves local config untouched. A local failure
    /// reverts the remote flag.
    pub async fn edit_is_syncing(
        &self,
        is_syncing: bool,
        remote_store_id: &str,
        magento_store_id: u32,
    ) -> SyncResult<()> {
        let client = self.clients.client_for(Scope::store(magento_store_id))?;
        let edit = StoreEdit {
            is_syncing: Some(is_syncing),
            ..StoreEdit::default()
        };
        client.edit_store(remote_store_id, &edit).await?;

        let local = self
            .settings()
            .remote_store_scope(magento_store_id)
            .and_then(|scope| {
                let scope = scope.unwrap_or(Scope::store(magento_store_id));
                self.settings().save_is_syncing(scope, is_syncing)
            });

        if let Err(e) = local {
            warn!(
                "Could not save is_syncing for store {magento_store_id}, reverting {remote_store_id}: {e}"
            );
            let revert = StoreEdit {
                is_syncing: Some(!is_syncing),
                ..StoreEdit::default()
            };
            if let Err(revert_err) = client.edit_store(remote_store_id, &revert).await {
                error!("Could not revert is_syncing on {remote_store_id}: {revert_err}");
            }
            return Err(e);
        }

        info!("Store {remote_store_id} is_syncing set to {is_syncing} for store {magento_store_id}");
        Ok(())
    }

    fn require_remote_store_id(&self, scope: Scope) -> SyncResult<String> {
        self.settings()
            .remote_store_id_at(scope)?
            .ok_or_else(|| SyncError::Config(format!("no remote store configured for {scope}")))
    }
}
