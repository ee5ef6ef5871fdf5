use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::bus::{AppEvent, EventBus, SubscriberId};
use crate::identity::{AuthEvent, AuthSubscriberId, Identity, UserId};
use crate::settings::Settings;
use crate::sync::engine::SyncEngine;
use crate::sync::remote::{ChangeFeed, FeedSubscriberId};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Unconditional push cadence, a safety net for missed local events
    pub push_interval: Duration,
    /// Pull cadence, the fallback when no change feed is available
    pub pull_interval: Duration,
    /// Quiet window that coalesces a burst of local edits into one push
    pub push_debounce: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            push_interval: Duration::from_secs(20),
            pull_interval: Duration::from_secs(30),
            push_debounce: Duration::from_millis(1200),
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            push_interval: Duration::from_secs(settings.push_interval_secs.max(1)),
            pull_interval: Duration::from_secs(settings.pull_interval_secs.max(1)),
            push_debounce: Duration::from_millis(settings.push_debounce_ms.max(1)),
        }
    }
}

#[derive(Default)]
struct ScheduledTasks {
    push_timer: Option<JoinHandle<()>>,
    pull_timer: Option<JoinHandle<()>>,
    /// The debounced push, when one is armed. Cancel-and-reschedule: a new
    /// qualifying event aborts this handle and arms a fresh one.
    pending_push: Option<JoinHandle<()>>,
    bus_subs: Vec<SubscriberId>,
    auth_sub: Option<AuthSubscriberId>,
    feed_sub: Option<FeedSubscriberId>,
}

/// Decides when the engine pulls and pushes. The UI never calls the engine
/// directly; it writes the store, the store publishes, and the scheduler
/// reacts. All timers and subscriptions live here and die together in
/// [`SyncScheduler::shutdown`].
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    bus: Arc<EventBus>,
    identity: Arc<dyn Identity>,
    feed: Option<Arc<dyn ChangeFeed>>,
    config: SchedulerConfig,
    tasks: Arc<Mutex<ScheduledTasks>>,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        bus: Arc<EventBus>,
        identity: Arc<dyn Identity>,
        feed: Option<Arc<dyn ChangeFeed>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            bus,
            identity,
            feed,
            config,
            tasks: Arc::new(Mutex::new(ScheduledTasks::default())),
        }
    }

    /// Wire every trigger. Call once per UI session; pair with
    /// [`SyncScheduler::shutdown`].
    pub async fn start(&self) {
        // Startup: take whatever the remote holds, then let views reload.
        self.engine.pull().await;
        self.bus.publish(AppEvent::RefreshRequested);

        if let Some(user) = self.identity.current_user() {
            Self::subscribe_feed(&self.engine, &self.bus, &self.feed, &self.tasks, &user);
        }

        // Sign-in pulls first, then pushes, so data created while signed out
        // is uploaded instead of being stranded locally. Sign-out only tears
        // the feed down; local data stays.
        let auth_sub = {
            let engine = Arc::clone(&self.engine);
            let bus = Arc::clone(&self.bus);
            let feed = self.feed.clone();
            let tasks = Arc::clone(&self.tasks);
            self.identity.subscribe(Arc::new(move |event| match event {
                AuthEvent::SignedIn(user) => {
                    let engine = Arc::clone(&engine);
                    let bus = Arc::clone(&bus);
                    let feed = feed.clone();
                    let tasks = Arc::clone(&tasks);
                    let user = user.clone();
                    tokio::spawn(async move {
                        engine.pull().await;
                        engine.push().await;
                        bus.publish(AppEvent::RefreshRequested);
                        Self::subscribe_feed(&engine, &bus, &feed, &tasks, &user);
                    });
                }
                AuthEvent::SignedOut => {
                    Self::unsubscribe_feed(&feed, &tasks);
                }
            }))
        };

        let push_timer = {
            let engine = Arc::clone(&self.engine);
            let every = self.config.push_interval;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(every).await;
                    engine.push().await;
                }
            })
        };
        let pull_timer = {
            let engine = Arc::clone(&self.engine);
            let every = self.config.pull_interval;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(every).await;
                    engine.pull().await;
                }
            })
        };

        let mut bus_subs = Vec::new();
        for event in [AppEvent::DataChanged, AppEvent::ProjectsChanged] {
            let engine = Arc::clone(&self.engine);
            let tasks = Arc::clone(&self.tasks);
            let quiet = self.config.push_debounce;
            bus_subs.push(
                self.bus
                    .subscribe(event, move || Self::arm_push(&engine, &tasks, quiet)),
            );
        }

        let mut tasks = self.tasks.lock().unwrap();
        tasks.push_timer = Some(push_timer);
        tasks.pull_timer = Some(pull_timer);
        tasks.auth_sub = Some(auth_sub);
        tasks.bus_subs = bus_subs;
    }

    /// Arm (or re-arm) the debounced push. A burst of local edits lands as
    /// one push once the burst goes quiet for the debounce window.
    fn arm_push(engine: &Arc<SyncEngine>, tasks: &Arc<Mutex<ScheduledTasks>>, quiet: Duration) {
        let mut tasks = tasks.lock().unwrap();
        if let Some(pending) = tasks.pending_push.take() {
            pending.abort();
        }
        let engine = Arc::clone(engine);
        tasks.pending_push = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            engine.push().await;
        }));
        debug!("push scheduled");
    }

    /// Whether a debounced push is armed and not yet delivered.
    pub fn push_pending(&self) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .pending_push
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn subscribe_feed(
        engine: &Arc<SyncEngine>,
        bus: &Arc<EventBus>,
        feed: &Option<Arc<dyn ChangeFeed>>,
        tasks: &Arc<Mutex<ScheduledTasks>>,
        user: &UserId,
    ) {
        Self::unsubscribe_feed(feed, tasks);
        let Some(feed) = feed else {
            return;
        };
        let engine = Arc::clone(engine);
        let bus = Arc::clone(bus);
        let sub = feed.subscribe(
            user,
            Arc::new(move || {
                let engine = Arc::clone(&engine);
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    if engine.pull().await {
                        bus.publish(AppEvent::RefreshRequested);
                    }
                });
            }),
        );
        tasks.lock().unwrap().feed_sub = Some(sub);
        debug!(user = %user, "change feed subscribed");
    }

    fn unsubscribe_feed(feed: &Option<Arc<dyn ChangeFeed>>, tasks: &Arc<Mutex<ScheduledTasks>>) {
        let sub = tasks.lock().unwrap().feed_sub.take();
        if let (Some(sub), Some(feed)) = (sub, feed) {
            feed.unsubscribe(sub);
            debug!("change feed unsubscribed");
        }
    }

    /// Cancel every timer and subscription together. In-flight network calls
    /// are not interrupted; they finish and their results stand.
    pub fn shutdown(&self) {
        let (handles, bus_subs, auth_sub) = {
            let mut tasks = self.tasks.lock().unwrap();
            (
                [
                    tasks.push_timer.take(),
                    tasks.pull_timer.take(),
                    tasks.pending_push.take(),
                ],
                std::mem::take(&mut tasks.bus_subs),
                tasks.auth_sub.take(),
            )
        };
        for handle in handles.into_iter().flatten() {
            handle.abort();
        }
        for sub in bus_subs {
            self.bus.unsubscribe(sub);
        }
        if let Some(sub) = auth_sub {
            self.identity.unsubscribe(sub);
        }
        Self::unsubscribe_feed(&self.feed, &self.tasks);
        debug!("scheduler shut down");
    }
}
