use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::identity::UserId;
use crate::models::payload::CloudPayload;
use crate::sync::remote::{ChangeFeed, ChangeHandler, FeedSubscriberId, RemoteError, RemoteStore};

#[derive(Default)]
struct FeedListeners {
    next_id: u64,
    entries: Vec<(u64, String, ChangeHandler)>,
}

/// In-process remote store with a synchronous change feed. Backs the sync
/// tests; behaves like the hosted row store including last-write-wins
/// overwrites and fan-out notifications on upsert.
#[derive(Default)]
pub struct InMemoryRemote {
    rows: Mutex<HashMap<String, CloudPayload>>,
    listeners: Mutex<FeedListeners>,
    offline: AtomicBool,
    upserts: AtomicUsize,
    fetches: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail at the transport, for retry tests.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn row(&self, user: &UserId) -> Option<CloudPayload> {
        self.rows.lock().unwrap().get(user.as_str()).cloned()
    }

    /// Seed a row directly, bypassing the feed. Stands in for another device
    /// or an older client writing the table.
    pub fn seed(&self, user: &UserId, payload: CloudPayload) {
        self.rows
            .lock()
            .unwrap()
            .insert(user.as_str().to_string(), payload);
    }

    fn notify(&self, user: &UserId) {
        let handlers: Vec<ChangeHandler> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .entries
                .iter()
                .filter(|(_, u, _)| u == user.as_str())
                .map(|(_, _, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler();
        }
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn fetch(&self, user: &UserId) -> Result<Option<CloudPayload>, RemoteError> {
        self.check_online()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().get(user.as_str()).cloned())
    }

    async fn upsert(&self, user: &UserId, payload: &CloudPayload) -> Result<(), RemoteError> {
        self.check_online()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(user.as_str().to_string(), payload.clone());
        self.notify(user);
        Ok(())
    }
}

impl ChangeFeed for InMemoryRemote {
    fn subscribe(&self, user: &UserId, handler: ChangeHandler) -> FeedSubscriberId {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners
            .entries
            .push((id, user.as_str().to_string(), handler));
        FeedSubscriberId(id)
    }

    fn unsubscribe(&self, id: FeedSubscriberId) {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.entries.retain(|(entry_id, _, _)| *entry_id != id.0);
    }
}
