use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::storage::local::LocalStore;
use crate::storage::{REMEMBER_KEY, SESSION_USER_KEY};

/// Opaque user identity from the external identity service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(UserId),
    SignedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthSubscriberId(u64);

pub type AuthHandler = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// The surface consumed from the external identity service: current user (if
/// any) and sign-in/sign-out transitions.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
    fn subscribe(&self, handler: AuthHandler) -> AuthSubscriberId;
    fn unsubscribe(&self, id: AuthSubscriberId);
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, AuthHandler)>,
}

/// Identity backed by the local store: the session user id lives under a
/// persistence key, routed to the persistent or session-scoped cascade by the
/// remember-me flag.
pub struct StoredSession {
    store: Arc<LocalStore>,
    listeners: Mutex<Listeners>,
}

impl StoredSession {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            listeners: Mutex::new(Listeners::default()),
        }
    }

    pub fn remembers(&self) -> bool {
        // Unset means remembered, matching the flag's historical default.
        self.store
            .get(REMEMBER_KEY)
            .map(|v| v != "false")
            .unwrap_or(true)
    }

    pub fn sign_in(&self, user: UserId, remember: bool) {
        self.store
            .set(REMEMBER_KEY, if remember { "true" } else { "false" });
        if remember {
            self.store.set(SESSION_USER_KEY, user.as_str());
        } else {
            self.store.set_ephemeral(SESSION_USER_KEY, user.as_str());
        }
        debug!(user = %user, remember, "signed in");
        self.notify(&AuthEvent::SignedIn(user));
    }

    pub fn sign_out(&self) {
        self.store.remove(SESSION_USER_KEY);
        debug!("signed out");
        self.notify(&AuthEvent::SignedOut);
    }

    fn notify(&self, event: &AuthEvent) {
        let handlers: Vec<AuthHandler> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .entries
                .iter()
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler(event);
        }
    }
}

impl Identity for StoredSession {
    fn current_user(&self) -> Option<UserId> {
        self.store
            .get(SESSION_USER_KEY)
            .filter(|v| !v.is_empty())
            .map(UserId::new)
    }

    fn subscribe(&self, handler: AuthHandler) -> AuthSubscriberId {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, handler));
        AuthSubscriberId(id)
    }

    fn unsubscribe(&self, id: AuthSubscriberId) {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    fn session() -> (tempfile::TempDir, StoredSession) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open_at(
            dir.path().to_path_buf(),
            Arc::new(EventBus::new()),
        ));
        (dir, StoredSession::new(store))
    }

    #[test]
    fn signed_out_by_default() {
        let (_dir, session) = session();
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn sign_in_and_out_fire_transitions_in_order() {
        let (_dir, session) = session();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        session.subscribe(Arc::new(move |event| {
            s.lock().unwrap().push(event.clone());
        }));

        let alice = UserId::new("alice");
        session.sign_in(alice.clone(), true);
        assert_eq!(session.current_user(), Some(alice.clone()));
        session.sign_out();
        assert_eq!(session.current_user(), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![AuthEvent::SignedIn(alice), AuthEvent::SignedOut]
        );
    }

    #[test]
    fn unsubscribed_listeners_stay_quiet() {
        let (_dir, session) = session();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let id = session.subscribe(Arc::new(move |event| {
            s.lock().unwrap().push(event.clone());
        }));
        session.unsubscribe(id);
        session.sign_in(UserId::new("alice"), true);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn non_remembered_session_avoids_persistent_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open_at(
            dir.path().to_path_buf(),
            Arc::new(EventBus::new()),
        ));
        let session = StoredSession::new(Arc::clone(&store));

        session.sign_in(UserId::new("alice"), false);
        assert_eq!(session.current_user(), Some(UserId::new("alice")));
        assert!(!session.remembers());
        assert!(!dir.path().join("data").join(SESSION_USER_KEY).exists());
        assert!(dir.path().join("session").join(SESSION_USER_KEY).exists());
    }
}
