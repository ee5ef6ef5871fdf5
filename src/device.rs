use uuid::Uuid;

use crate::storage::DEVICE_ID_KEY;
use crate::storage::local::LocalStore;

/// Stable per-install id: read the persisted one, or mint and persist a new
/// opaque id on first use. Persisting can fail on a fully locked-down
/// machine; the id is then fresh per process, which only affects the
/// "last synced from" display.
pub fn device_id(store: &LocalStore) -> String {
    if let Some(existing) = store.get(DEVICE_ID_KEY).filter(|v| !v.is_empty()) {
        return existing;
    }
    let id = Uuid::new_v4().to_string();
    store.set(DEVICE_ID_KEY, &id);
    id
}

/// Short human-readable label for this machine.
pub fn device_label() -> String {
    for var in ["HOSTNAME", "COMPUTERNAME", "NAME"] {
        if let Ok(value) = std::env::var(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.chars().take(40).collect();
            }
        }
    }
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bus::EventBus;

    #[test]
    fn device_id_is_minted_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_at(dir.path().to_path_buf(), Arc::new(EventBus::new()));

        let first = device_id(&store);
        let second = device_id(&store);
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn device_label_is_never_empty() {
        assert!(!device_label().is_empty());
    }
}
