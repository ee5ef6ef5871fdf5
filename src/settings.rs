use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::SETTINGS_KEY;
use crate::storage::local::LocalStore;

/// Persisted configuration. Loading merges stored values over the defaults,
/// so settings written by an older install keep working when fields are
/// added.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Base URL of the remote sync service; sync stays local-only when unset
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    pub push_interval_secs: u64,
    pub pull_interval_secs: u64,
    pub push_debounce_ms: u64,
    pub remember_session: bool,
    /// Overrides the derived machine label in "last synced from"
    pub device_label: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote_api_key: None,
            push_interval_secs: 20,
            pull_interval_secs: 30,
            push_debounce_ms: 1200,
            remember_session: true,
            device_label: None,
        }
    }
}

pub fn load_settings(store: &LocalStore) -> Settings {
    store
        .get(SETTINGS_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn save_settings(store: &LocalStore, settings: &Settings) -> bool {
    match serde_json::to_string(settings) {
        Ok(raw) => store.set(SETTINGS_KEY, &raw),
        Err(e) => {
            warn!(error = %e, "settings serialization failed");
            false
        }
    }
}
