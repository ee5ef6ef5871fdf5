use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bus::{AppEvent, EventBus};
use crate::models::day::DayMap;
use crate::models::project::Project;
use crate::storage::durable::DurableStore;
use crate::storage::tiers::{FileTier, MemoryTier};
use crate::storage::{DAYS_KEY, PROJECTS_KEY, StorageTier};

/// A fast-tier value shorter than this is treated as truncation or an empty
/// shell, and the durable copy wins at startup.
const MIN_PLAUSIBLE_LEN: usize = 10;

/// Key/value persistence with graceful degradation: an ordered cascade of
/// tiers where reads take the first hit and writes take the first acceptor.
/// Tiers can drop out independently (missing home dir, read-only disk,
/// exhausted quota) without any error reaching the caller.
pub struct LocalStore {
    tiers: Vec<Box<dyn StorageTier>>,
    /// Index of the first tier that does not survive a reboot; ephemeral
    /// writes start here.
    session_start: usize,
    durable: Option<DurableStore>,
    bus: Arc<EventBus>,
}

impl LocalStore {
    /// Build the standard cascade: data dir, cache dir, temp dir, memory,
    /// with the durable side-store under the data dir.
    pub fn open(bus: Arc<EventBus>) -> Self {
        let mut tiers: Vec<Box<dyn StorageTier>> = Vec::new();
        let mut durable = None;

        if let Some(base) = dirs::data_dir() {
            let root = base.join("prio");
            tiers.push(Box::new(FileTier::new("data", root.join("kv"))));
            durable = Some(DurableStore::new(root.join("durable")));
        }
        if let Some(base) = dirs::cache_dir() {
            tiers.push(Box::new(FileTier::new("cache", base.join("prio"))));
        }
        let session_start = tiers.len();
        tiers.push(Box::new(FileTier::new(
            "session",
            std::env::temp_dir().join("prio-session"),
        )));
        tiers.push(Box::new(MemoryTier::new()));

        Self {
            tiers,
            session_start,
            durable,
            bus,
        }
    }

    /// Cascade rooted at an explicit directory. Used by tests and by anything
    /// that must not touch the user's real data.
    pub fn open_at(root: PathBuf, bus: Arc<EventBus>) -> Self {
        let tiers: Vec<Box<dyn StorageTier>> = vec![
            Box::new(FileTier::new("data", root.join("data"))),
            Box::new(FileTier::new("cache", root.join("cache"))),
            Box::new(FileTier::new("session", root.join("session"))),
            Box::new(MemoryTier::new()),
        ];
        Self::with_tiers(tiers, 2, Some(DurableStore::new(root.join("durable"))), bus)
    }

    /// Cascade over an arbitrary ordered tier list. New tiers slot in here
    /// without touching any call site.
    pub fn with_tiers(
        tiers: Vec<Box<dyn StorageTier>>,
        session_start: usize,
        durable: Option<DurableStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            tiers,
            session_start,
            durable,
            bus,
        }
    }

    /// First tier that has the key wins; inaccessible tiers are skipped.
    pub fn get(&self, key: &str) -> Option<String> {
        self.tiers.iter().find_map(|tier| tier.get(key))
    }

    /// Write to the first tier that accepts. Each call retries the full order
    /// from the top, so a tier that recovers becomes primary again. The
    /// day-map key is additionally mirrored into the durable side-store.
    pub fn set(&self, key: &str, value: &str) -> bool {
        let accepted = self.set_from(0, key, value);
        if key == DAYS_KEY {
            self.mirror_durable(key, value);
        }
        accepted
    }

    /// Same cascade, starting at the session-scoped tier. Used for sessions
    /// the user chose not to remember across restarts.
    pub fn set_ephemeral(&self, key: &str, value: &str) -> bool {
        self.set_from(self.session_start, key, value)
    }

    fn set_from(&self, start: usize, key: &str, value: &str) -> bool {
        for tier in &self.tiers[start..] {
            if tier.set(key, value) {
                return true;
            }
            debug!(tier = tier.name(), key, "tier rejected write, falling through");
        }
        false
    }

    /// Remove from every tier so no stale copy resurfaces via the cascade.
    pub fn remove(&self, key: &str) -> bool {
        let mut removed = false;
        for tier in &self.tiers {
            removed |= tier.remove(key);
        }
        removed
    }

    fn mirror_durable(&self, key: &str, value: &str) {
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.set(key, value) {
                warn!(error = %e, "durable mirror write failed");
            }
        }
    }

    /// Startup check: if the fast tiers lost the day map (or hold an
    /// implausibly small remnant) while the durable side-store has a copy,
    /// promote the durable copy and ask views to reload. Returns whether a
    /// promotion happened.
    pub fn restore_durable(&self) -> bool {
        let Some(durable) = &self.durable else {
            return false;
        };
        let Some(backup) = durable.get(DAYS_KEY) else {
            return false;
        };
        let fast = self.get(DAYS_KEY);
        let plausible = fast.as_ref().is_some_and(|v| v.len() >= MIN_PLAUSIBLE_LEN);
        if plausible || backup.len() < MIN_PLAUSIBLE_LEN {
            return false;
        }
        self.set_from(0, DAYS_KEY, &backup);
        self.bus.publish(AppEvent::RefreshRequested);
        true
    }

    pub fn load_days(&self) -> DayMap {
        self.get(DAYS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Persist the day map and notify views.
    pub fn save_days(&self, days: &DayMap) -> bool {
        let ok = self.write_days(days);
        self.bus.publish(AppEvent::DataChanged);
        ok
    }

    /// Persist the day map without a change notification. The sync engine
    /// uses this for pulls, where the scheduler broadcasts a refresh instead
    /// and a local-change push would only echo remote data back.
    pub fn overwrite_days(&self, days: &DayMap) -> bool {
        self.write_days(days)
    }

    fn write_days(&self, days: &DayMap) -> bool {
        match serde_json::to_string(days) {
            Ok(raw) => self.set(DAYS_KEY, &raw),
            Err(e) => {
                warn!(error = %e, "day map serialization failed");
                false
            }
        }
    }

    pub fn load_projects(&self) -> Vec<Project> {
        self.get(PROJECTS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save_projects(&self, projects: &[Project]) -> bool {
        let ok = self.write_projects(projects);
        self.bus.publish(AppEvent::ProjectsChanged);
        ok
    }

    pub fn overwrite_projects(&self, projects: &[Project]) -> bool {
        self.write_projects(projects)
    }

    fn write_projects(&self, projects: &[Project]) -> bool {
        match serde_json::to_string(projects) {
            Ok(raw) => self.set(PROJECTS_KEY, &raw),
            Err(e) => {
                warn!(error = %e, "project list serialization failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::day::DailyTasks;
    use crate::models::task::Task;

    fn store_at(root: &std::path::Path) -> LocalStore {
        LocalStore::open_at(root.to_path_buf(), Arc::new(EventBus::new()))
    }

    #[test]
    fn get_prefers_earlier_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());

        // Land a value in the session tier, then shadow it in the data tier.
        assert!(store.set_ephemeral("k", "session-copy"));
        assert!(store.set("k", "data-copy"));
        assert_eq!(store.get("k").as_deref(), Some("data-copy"));
    }

    #[test]
    fn set_falls_through_broken_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let tiers: Vec<Box<dyn StorageTier>> = vec![
            Box::new(FileTier::new("data", blocker.join("kv"))),
            Box::new(MemoryTier::new()),
        ];
        let store =
            LocalStore::with_tiers(tiers, 1, None, Arc::new(EventBus::new()));

        assert!(store.set("k", "v"));
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn set_reports_failure_when_every_tier_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let tiers: Vec<Box<dyn StorageTier>> =
            vec![Box::new(FileTier::new("data", blocker.join("kv")))];
        let store =
            LocalStore::with_tiers(tiers, 0, None, Arc::new(EventBus::new()));

        assert!(!store.set("k", "v"));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn remove_clears_every_tier() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        store.set("k", "persistent");
        store.set_ephemeral("k", "ephemeral");

        assert!(store.remove("k"));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn ephemeral_writes_skip_persistent_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        assert!(store.set_ephemeral("k", "v"));

        assert!(!dir.path().join("data").join("k").exists());
        assert!(!dir.path().join("cache").join("k").exists());
        assert!(dir.path().join("session").join("k").exists());
    }

    #[test]
    fn day_map_saves_mirror_into_the_durable_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());

        let mut days = DayMap::new();
        let mut day = DailyTasks::empty("2025-06-01");
        day.tasks.push(Task::new("Write report"));
        days.insert("2025-06-01".into(), day);
        assert!(store.save_days(&days));

        let durable = DurableStore::new(dir.path().join("durable"));
        let mirrored = durable.get(DAYS_KEY).unwrap();
        assert!(mirrored.contains("Write report"));
    }

    #[test]
    fn startup_promotes_durable_copy_when_fast_tier_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let mut days = DayMap::new();
        let mut day = DailyTasks::empty("2025-06-01");
        day.tasks.push(Task::new("Write report"));
        days.insert("2025-06-01".into(), day);

        // First session populates both the fast tiers and the durable copy.
        {
            let store = store_at(dir.path());
            store.save_days(&days);
        }
        // Simulate private-mode eviction of every fast tier.
        for sub in ["data", "cache", "session"] {
            let _ = std::fs::remove_dir_all(dir.path().join(sub));
        }

        let bus = Arc::new(EventBus::new());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&refreshes);
        bus.subscribe(AppEvent::RefreshRequested, move || {
            r.fetch_add(1, Ordering::SeqCst);
        });

        let store = LocalStore::open_at(dir.path().to_path_buf(), bus);
        assert!(store.restore_durable());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(store.load_days(), days);
    }

    #[test]
    fn startup_leaves_a_plausible_fast_tier_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());

        let mut days = DayMap::new();
        days.insert("2025-06-01".into(), DailyTasks::empty("2025-06-01"));
        store.save_days(&days);

        assert!(!store.restore_durable());
    }

    #[test]
    fn corrupt_day_map_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        store.set("prio_days_v1", "{ not json");
        assert!(store.load_days().is_empty());
    }

    #[test]
    fn save_days_publishes_data_changed_but_overwrite_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        bus.subscribe(AppEvent::DataChanged, move || {
            e.lock().unwrap().push("data");
        });

        let store = LocalStore::open_at(dir.path().to_path_buf(), bus);
        let days = DayMap::new();
        store.save_days(&days);
        store.overwrite_days(&days);
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
