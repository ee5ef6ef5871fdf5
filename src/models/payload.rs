use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::day::DayMap;
use crate::models::project::Project;

/// "Last synced from" descriptor attached to every push. Display only; never
/// consulted for conflict resolution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
}

/// The unit exchanged with the remote store: one row per user, replaced
/// wholesale on every push. On read every sub-field is independently
/// optional, so a partial or older payload applies only what it carries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<DayMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_device: Option<DeviceInfo>,
}

/// Local-only record of the last completed sync, kept for display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncInfo {
    pub at: Option<Timestamp>,
    pub device: Option<DeviceInfo>,
}
