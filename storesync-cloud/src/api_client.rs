//! HTTP client for the remote marketing API (v3).
//!
//! Authenticates with HTTP basic auth using the scope's API key. Failed calls
//! are decoded from the API's problem documents into [`RemoteError`].

use crate::config::SyncConfig;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::settings::ScopeSettings;
use crate::types::*;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use storesync_types::Scope;
use tracing::debug;

/// Client bound to one API key and data center.
#[derive(Clone)]
pub struct MailchimpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MailchimpClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> SyncResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{method} {path}");

        let mut req = self
            .client
            .request(method.clone(), &url)
            .basic_auth("storesync", Some(&self.api_key));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let raw = resp.text().await.unwrap_or_default();
        let call = format!("{method} {path}");
        match serde_json::from_str::<RemoteError>(&raw) {
            Ok(mut remote) => {
                remote.status = status.as_u16();
                remote.call = call;
                Err(SyncError::Remote(remote))
            }
            Err(_) => Err(SyncError::Api(format!("{call} returned {status}: {raw}"))),
        }
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> SyncResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Ok(self.send(method, path, body).await?.json().await?)
    }

    // ── Batches ──

    /// Submits operations as one remote batch job.
    pub async fn submit_batch(&self, operations: &[BatchOperation]) -> SyncResult<BatchResponse> {
        self.send_json(
            Method::POST,
            "/batches",
            Some(&serde_json::json!({ "operations": operations })),
        )
        .await
    }

    pub async fn get_batch(&self, batch_id: &str) -> SyncResult<BatchResponse> {
        self.send_json::<(), _>(Method::GET, &format!("/batches/{batch_id}"), None)
            .await
    }

    // ── Stores ──

    pub async fn add_store(&self, store: &NewStore) -> SyncResult<RemoteStore> {
        self.send_json(Method::POST, "/ecommerce/stores", Some(store))
            .await
    }

    pub async fn edit_store(&self, store_id: &str, edit: &StoreEdit) -> SyncResult<RemoteStore> {
        self.send_json(
            Method::PATCH,
            &format!("/ecommerce/stores/{store_id}"),
            Some(edit),
        )
        .await
    }

    /// Fetches a store, optionally restricted to a comma-separated field list.
    pub async fn get_store(&self, store_id: &str, fields: Option<&str>) -> SyncResult<RemoteStore> {
        let path = match fields {
            Some(fields) => format!("/ecommerce/stores/{store_id}?fields={fields}"),
            None => format!("/ecommerce/stores/{store_id}"),
        };
        self.send_json::<(), _>(Method::GET, &path, None).await
    }

    pub async fn delete_store(&self, store_id: &str) -> SyncResult<()> {
        self.send::<()>(Method::DELETE, &format!("/ecommerce/stores/{store_id}"), None)
            .await?;
        Ok(())
    }
}

/// Builds API clients from the API key configured for a scope.
#[derive(Clone)]
pub struct ClientFactory {
    config: SyncConfig,
    settings: ScopeSettings,
}

impl ClientFactory {
    pub fn new(config: SyncConfig, settings: ScopeSettings) -> Self {
        Self { config, settings }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    /// Client for `scope`. A scope without an API key is a configuration error.
    pub fn client_for(&self, scope: Scope) -> SyncResult<MailchimpClient> {
        let api_key = self
            .settings
            .api_key(scope)?
            .ok_or_else(|| SyncError::Config("You must provide a MailChimp API key".to_string()))?;
        let base_url = self.config.base_url_for_key(&api_key)?;
        MailchimpClient::new(
            &base_url,
            &api_key,
            Duration::from_secs(self.config.http_timeout_secs),
        )
    }
}
