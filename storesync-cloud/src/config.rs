//! Sync engine configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Process-level configuration for the sync engine.
///
/// Per-scope settings (API key, list, opt-in, ...) live in the scope config
/// store; this struct only holds what is the same for every scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Overrides the API base URL derived from the key's data center
    /// (e.g. for a mock server in tests).
    pub api_base_url: Option<String>,

    /// Maximum number of records per batch.
    pub batch_limit: usize,

    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,

    /// Interval between sync passes over all store views (seconds).
    pub sync_interval_secs: u64,

    /// Store views the engine syncs on every pass.
    pub store_ids: Vec<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            batch_limit: 100,
            http_timeout_secs: 30,
            sync_interval_secs: 300,
            store_ids: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a JSON config file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Base URL for an API key: the override if set, otherwise the key's
    /// data center (`<key>-us6` ⇒ `https://us6.api.mailchimp.com/3.0`).
    pub fn base_url_for_key(&self, api_key: &str) -> SyncResult<String> {
        if let Some(url) = &self.api_base_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let dc = api_key
            .rsplit_once('-')
            .map(|(_, dc)| dc)
            .filter(|dc| !dc.is_empty() && dc.chars().all(|c| c.is_ascii_alphanumeric()))
            .ok_or_else(|| SyncError::Config("API key has no data center suffix".to_string()))?;
        Ok(format!("https://{dc}.api.mailchimp.com/3.0"))
    }
}
