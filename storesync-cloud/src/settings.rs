//! Typed access to per-scope settings.

use crate::error::SyncResult;
use storesync_storage::ScopeConfigStore;
use storesync_types::{Scope, ScopeKind};

pub const API_KEY: &str = "mailchimp/general/apikey";
pub const GENERAL_LIST: &str = "mailchimp/general/list";
pub const IS_SYNCING: &str = "mailchimp/general/mcissyncing";
pub const REMOTE_STORE_ID: &str = "mailchimp/ecommerce/mailchimp_store_id";
pub const CUSTOMERS_OPT_IN: &str = "mailchimp/ecommerce/customers_optin";
pub const JS_URL: &str = "mailchimp/ecommerce/mc_jsurl";
pub const STORE_NAME: &str = "general/store_information/name";
pub const STORE_EMAIL: &str = "trans_email/ident_general/email";
pub const DEFAULT_CURRENCY: &str = "currency/options/default";
pub const BASE_URL: &str = "web/unsecure/base_url";

/// Scope-aware reader/writer over the config store.
#[derive(Clone)]
pub struct ScopeSettings {
    store: ScopeConfigStore,
}

impl ScopeSettings {
    pub fn new(store: ScopeConfigStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ScopeConfigStore {
        &self.store
    }

    /// Value for `path` at `scope`, falling back to the default scope.
    /// Empty strings count as unset.
    pub fn value(&self, path: &str, scope: Scope) -> SyncResult<Option<String>> {
        Ok(self
            .store
            .lookup(path, &chain(scope))?
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty()))
    }

    pub fn api_key(&self, scope: Scope) -> SyncResult<Option<String>> {
        self.value(API_KEY, scope)
    }

    pub fn general_list(&self, scope: Scope) -> SyncResult<Option<String>> {
        self.value(GENERAL_LIST, scope)
    }

    /// Remote store id configured for a store view.
    pub fn remote_store_id(&self, magento_store_id: u32) -> SyncResult<Option<String>> {
        self.remote_store_id_at(Scope::store(magento_store_id))
    }

    pub fn remote_store_id_at(&self, scope: Scope) -> SyncResult<Option<String>> {
        self.value(REMOTE_STORE_ID, scope)
    }

    /// The scope that defines the remote store id used by a store view.
    pub fn remote_store_scope(&self, magento_store_id: u32) -> SyncResult<Option<Scope>> {
        Ok(self
            .store
            .lookup(REMOTE_STORE_ID, &chain(Scope::store(magento_store_id)))?
            .map(|(scope, _)| scope))
    }

    pub fn store_name(&self, scope: Scope) -> SyncResult<String> {
        Ok(self
            .value(STORE_NAME, scope)?
            .unwrap_or_else(|| default_store_name(scope)))
    }

    pub fn store_email(&self, scope: Scope) -> SyncResult<Option<String>> {
        self.value(STORE_EMAIL, scope)
    }

    pub fn currency_code(&self, scope: Scope) -> SyncResult<String> {
        Ok(self
            .value(DEFAULT_CURRENCY, scope)?
            .unwrap_or_else(|| "USD".to_string()))
    }

    /// Host of the scope's base URL (`https://shop.test/` ⇒ `shop.test`).
    pub fn store_domain(&self, scope: Scope) -> SyncResult<Option<String>> {
        Ok(self.value(BASE_URL, scope)?.map(|raw| {
            reqwest::Url::parse(&raw)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or(raw)
        }))
    }

    /// Whether customers of a store view are subscribed automatically on sync.
    pub fn customers_opt_in(&self, magento_store_id: u32) -> SyncResult<bool> {
        Ok(self
            .value(CUSTOMERS_OPT_IN, Scope::store(magento_store_id))?
            .is_some_and(|v| v.trim().parse::<i64>().ok() == Some(1)))
    }

    pub fn save_is_syncing(&self, scope: Scope, syncing: bool) -> SyncResult<()> {
        self.store
            .set(IS_SYNCING, scope, if syncing { "1" } else { "0" })?;
        Ok(())
    }

    pub fn save_js_url(&self, scope: Scope, url: &str) -> SyncResult<()> {
        self.store.set(JS_URL, scope, url)?;
        Ok(())
    }
}

/// Lookup order for a scope: itself, then the default scope.
fn chain(scope: Scope) -> Vec<Scope> {
    match scope.kind {
        ScopeKind::Default => vec![Scope::DEFAULT],
        ScopeKind::Websites | ScopeKind::Stores => vec![scope, Scope::DEFAULT],
    }
}

fn default_store_name(scope: Scope) -> String {
    match scope.kind {
        ScopeKind::Default => "Default Store".to_string(),
        _ => format!("Store {}", scope.id),
    }
}
