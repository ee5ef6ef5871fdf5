use std::sync::{Arc, Mutex};

/// The closed set of in-process notifications. Views subscribe to these
/// instead of polling the store; the sync scheduler subscribes to the first
/// two to debounce pushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AppEvent {
    /// The day map was written locally
    DataChanged,
    /// The project list was written locally
    ProjectsChanged,
    /// The whole dataset may have changed underneath (cloud pull, durable
    /// restore); re-read everything
    RefreshRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Handler = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    id: u64,
    event: AppEvent,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Synchronous publish/subscribe bus. Delivery is same-thread and
/// fire-and-forget, in registration order; a publish with no subscribers is a
/// no-op.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        event: AppEvent,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> SubscriberId {
        let mut registry = self.registry.lock().unwrap();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push(Entry {
            id,
            event,
            handler: Arc::new(handler),
        });
        SubscriberId(id)
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock().unwrap();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.id != id.0);
        registry.entries.len() != before
    }

    pub fn publish(&self, event: AppEvent) {
        // Snapshot the matching handlers so a handler may subscribe or
        // unsubscribe without deadlocking on the registry.
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock().unwrap();
            registry
                .entries
                .iter()
                .filter(|e| e.event == event)
                .map(|e| Arc::clone(&e.handler))
                .collect()
        };
        for handler in handlers {
            handler();
        }
    }
}
