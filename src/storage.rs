use std::path::PathBuf;

use thiserror::Error;

pub mod durable;
pub mod local;
pub mod tiers;

/// Persistence key names. These are the wire-level contract with existing
/// installs; renaming one orphans the data stored under it.
pub const DAYS_KEY: &str = "prio_days_v1";
pub const PROJECTS_KEY: &str = "prio_projects_v1";
pub const SETTINGS_KEY: &str = "prio_settings_v1";
pub const DEVICE_ID_KEY: &str = "prio_device_id";
pub const LAST_SYNC_AT_KEY: &str = "prio_last_sync_at";
pub const LAST_SYNC_DEVICE_KEY: &str = "prio_last_sync_device";
pub const REMEMBER_KEY: &str = "prio_remember_session";
pub const SESSION_USER_KEY: &str = "prio_session_user";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write durable copy to '{path}': {source}")]
    DurableWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One candidate storage mechanism in the fallback cascade. Implementations
/// never panic and never let an error escape; an inaccessible tier reports
/// `None`/`false` and the cascade moves on.
pub trait StorageTier: Send + Sync {
    fn name(&self) -> &'static str;
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> bool;
    fn remove(&self, key: &str) -> bool;
}
