use std::sync::Arc;

use jiff::Timestamp;
use tracing::{debug, warn};

use crate::identity::Identity;
use crate::models::payload::{CloudPayload, DeviceInfo, SyncInfo};
use crate::storage::local::LocalStore;
use crate::storage::{LAST_SYNC_AT_KEY, LAST_SYNC_DEVICE_KEY};
use crate::sync::remote::RemoteStore;

/// Moves the full dataset between the local store and the user's single
/// remote row. Every operation is a wholesale copy: pull overwrites local
/// state with whatever the row holds, push replaces the row with a snapshot
/// of local state. Failures never escape; callers see `false` and retry on
/// the scheduler's cadence.
pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    identity: Arc<dyn Identity>,
    device: DeviceInfo,
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn Identity>,
        device: DeviceInfo,
    ) -> Self {
        Self {
            store,
            remote,
            identity,
            device,
        }
    }

    /// Copy the remote row into the local store. Signed out is a `false`
    /// no-op; a missing row is "nothing to pull yet" and still succeeds.
    /// Days and projects are applied independently, so a partial payload
    /// never clobbers a field it does not carry.
    pub async fn pull(&self) -> bool {
        let Some(user) = self.identity.current_user() else {
            return false;
        };
        let payload = match self.remote.fetch(&user).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(user = %user, "no remote row yet");
                return true;
            }
            Err(e) => {
                warn!(user = %user, error = %e, "pull failed");
                return false;
            }
        };

        if let Some(days) = &payload.days {
            self.store.overwrite_days(days);
        }
        if let Some(projects) = &payload.projects {
            self.store.overwrite_projects(projects);
        }
        self.record_sync(payload.last_device.as_ref());
        debug!(user = %user, "pull applied");
        true
    }

    /// Snapshot the full local dataset and upsert the remote row, stamped
    /// with the current time and this device.
    pub async fn push(&self) -> bool {
        let Some(user) = self.identity.current_user() else {
            return false;
        };
        let payload = CloudPayload {
            days: Some(self.store.load_days()),
            projects: Some(self.store.load_projects()),
            updated_at: Some(Timestamp::now()),
            last_device: Some(self.device.clone()),
        };
        match self.remote.upsert(&user, &payload).await {
            Ok(()) => {
                self.record_sync(Some(&self.device));
                debug!(user = %user, "push completed");
                true
            }
            Err(e) => {
                warn!(user = %user, error = %e, "push failed");
                false
            }
        }
    }

    fn record_sync(&self, device: Option<&DeviceInfo>) {
        self.store
            .set(LAST_SYNC_AT_KEY, &Timestamp::now().to_string());
        if let Some(device) = device {
            if let Ok(raw) = serde_json::to_string(device) {
                self.store.set(LAST_SYNC_DEVICE_KEY, &raw);
            }
        }
    }
}

/// Display-only metadata about the last completed sync. Lives on the store
/// rather than the engine, so status views work with no remote configured.
pub fn last_sync_info(store: &LocalStore) -> SyncInfo {
    let at = store
        .get(LAST_SYNC_AT_KEY)
        .and_then(|raw| raw.parse::<Timestamp>().ok());
    let device = store
        .get(LAST_SYNC_DEVICE_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok());
    SyncInfo { at, device }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bus::EventBus;
    use crate::identity::{StoredSession, UserId};
    use crate::models::day::{DailyTasks, DayMap};
    use crate::models::project::Project;
    use crate::models::task::{Category, Task};
    use crate::sync::memory::InMemoryRemote;

    struct Device {
        _dir: tempfile::TempDir,
        store: Arc<LocalStore>,
        session: Arc<StoredSession>,
        engine: SyncEngine,
    }

    /// One simulated install sharing `remote` with the others.
    fn device(remote: &Arc<InMemoryRemote>, label: &str) -> Device {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open_at(
            dir.path().to_path_buf(),
            Arc::new(EventBus::new()),
        ));
        let session = Arc::new(StoredSession::new(Arc::clone(&store)));
        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(remote) as Arc<dyn RemoteStore>,
            Arc::clone(&session) as Arc<dyn Identity>,
            DeviceInfo {
                id: format!("{label}-id"),
                label: label.to_string(),
            },
        );
        Device {
            _dir: dir,
            store,
            session,
            engine,
        }
    }

    fn report_day() -> DayMap {
        let mut task = Task::new("Write report");
        task.category = Some(Category::DeepWork);
        let mut day = DailyTasks::empty("2025-06-01");
        day.tasks.push(task);
        let mut days = DayMap::new();
        days.insert("2025-06-01".into(), day);
        days
    }

    #[tokio::test]
    async fn signed_out_pull_is_false_and_writes_nothing() {
        let remote = Arc::new(InMemoryRemote::new());
        let user = UserId::new("alice");
        remote.seed(
            &user,
            CloudPayload {
                days: Some(report_day()),
                ..CloudPayload::default()
            },
        );

        let a = device(&remote, "laptop");
        assert!(!a.engine.pull().await);
        assert!(a.store.load_days().is_empty());
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn signed_out_push_is_false_and_never_calls_the_remote() {
        let remote = Arc::new(InMemoryRemote::new());
        let a = device(&remote, "laptop");
        a.store.save_days(&report_day());

        assert!(!a.engine.push().await);
        assert_eq!(remote.upsert_count(), 0);
    }

    #[tokio::test]
    async fn push_then_pull_round_trips_the_dataset() {
        let remote = Arc::new(InMemoryRemote::new());
        let a = device(&remote, "laptop");
        a.session.sign_in(UserId::new("alice"), true);

        let days = report_day();
        let projects = vec![Project::new("Thesis", None)];
        a.store.save_days(&days);
        a.store.save_projects(&projects);

        assert!(a.engine.push().await);
        assert!(a.engine.pull().await);
        assert_eq!(a.store.load_days(), days);
        assert_eq!(a.store.load_projects(), projects);
    }

    #[tokio::test]
    async fn missing_row_pulls_as_success_without_local_writes() {
        let remote = Arc::new(InMemoryRemote::new());
        let a = device(&remote, "laptop");
        a.session.sign_in(UserId::new("alice"), true);
        a.store.save_days(&report_day());

        assert!(a.engine.pull().await);
        assert_eq!(a.store.load_days(), report_day());
    }

    #[tokio::test]
    async fn fresh_device_receives_the_pushed_dataset() {
        let remote = Arc::new(InMemoryRemote::new());
        let alice = UserId::new("alice");

        let a = device(&remote, "laptop");
        a.session.sign_in(alice.clone(), true);
        a.store.save_days(&report_day());
        assert!(a.engine.push().await);

        let b = device(&remote, "phone");
        b.session.sign_in(alice, true);
        assert!(b.engine.pull().await);

        let days = b.store.load_days();
        let day = days.get("2025-06-01").unwrap();
        assert_eq!(day.tasks.len(), 1);
        assert_eq!(day.tasks[0].title, "Write report");
        assert_eq!(day.tasks[0].category, Some(Category::DeepWork));

        let info = last_sync_info(&b.store);
        assert_eq!(info.device.unwrap().label, "laptop");
        assert!(info.at.is_some());
    }

    #[tokio::test]
    async fn later_push_wins_wholesale() {
        // Concurrent edits between sync windows resolve to whichever push
        // lands last; the loser's changes are dropped, not merged.
        let remote = Arc::new(InMemoryRemote::new());
        let alice = UserId::new("alice");

        let a = device(&remote, "laptop");
        let b = device(&remote, "phone");
        a.session.sign_in(alice.clone(), true);
        b.session.sign_in(alice, true);

        let mut days_a = DayMap::new();
        let mut day_a = DailyTasks::empty("2025-06-01");
        day_a.tasks.push(Task::new("From laptop"));
        days_a.insert("2025-06-01".into(), day_a);
        a.store.save_days(&days_a);

        let mut days_b = DayMap::new();
        let mut day_b = DailyTasks::empty("2025-06-02");
        day_b.tasks.push(Task::new("From phone"));
        days_b.insert("2025-06-02".into(), day_b);
        b.store.save_days(&days_b);

        assert!(a.engine.push().await);
        assert!(b.engine.push().await);

        assert!(a.engine.pull().await);
        assert_eq!(a.store.load_days(), days_b);
    }

    #[tokio::test]
    async fn partial_payload_applies_only_present_fields() {
        let remote = Arc::new(InMemoryRemote::new());
        let alice = UserId::new("alice");
        let a = device(&remote, "laptop");
        a.session.sign_in(alice.clone(), true);

        let local_days = report_day();
        a.store.save_days(&local_days);
        a.store.save_projects(&[Project::new("Old", None)]);

        let replacement = vec![Project::new("New", Some("fresh".into()))];
        remote.seed(
            &alice,
            CloudPayload {
                projects: Some(replacement.clone()),
                ..CloudPayload::default()
            },
        );

        assert!(a.engine.pull().await);
        assert_eq!(a.store.load_projects(), replacement);
        assert_eq!(a.store.load_days(), local_days);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_only_as_false() {
        let remote = Arc::new(InMemoryRemote::new());
        let a = device(&remote, "laptop");
        a.session.sign_in(UserId::new("alice"), true);
        a.store.save_days(&report_day());
        remote.set_offline(true);

        assert!(!a.engine.push().await);
        assert!(!a.engine.pull().await);
        assert_eq!(a.store.load_days(), report_day());

        remote.set_offline(false);
        assert!(a.engine.push().await);
    }

    #[tokio::test]
    async fn repeated_pushes_of_unchanged_data_are_idempotent() {
        let remote = Arc::new(InMemoryRemote::new());
        let alice = UserId::new("alice");
        let a = device(&remote, "laptop");
        a.session.sign_in(alice.clone(), true);
        a.store.save_days(&report_day());

        assert!(a.engine.push().await);
        let first = remote.row(&alice).unwrap();
        assert!(a.engine.push().await);
        let second = remote.row(&alice).unwrap();

        assert_eq!(first.days, second.days);
        assert_eq!(first.projects, second.projects);
        assert_eq!(first.last_device, second.last_device);
    }
}
