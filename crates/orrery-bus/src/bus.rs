//! The topic map, per-topic groups, and the observer loop.
//!
//! Each topic owns one [`TopicGroup`]: a single "latest event" slot, a
//! publish counter, and the number of attached observers, all behind one
//! mutex paired with a condvar. Publishing stores the event and bumps the
//! counter under that mutex before `notify_all`, and observers re-check
//! the counter under the same mutex before they wait, so an observer can
//! never see the old counter and then sleep through the wake for the new
//! one.
//!
//! Lock order is topic map, then group.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use serde::Serialize;

use crate::config::{BusConfig, OverrunPolicy};
use crate::connection::{Connection, Probe};
use crate::error::BusError;

type TeardownHook = Box<dyn Fn(&str) + Send + Sync>;

/// Result of a successful [`NotificationBus::publish`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nobody is subscribed to the topic; the event was dropped.
    NoObservers,
    /// The event is now the topic's latest and its observers were woken.
    Delivered {
        /// The topic's publish counter after this event.
        counter: u64,
        /// Observers attached at publish time.
        observers: usize,
    },
}

/// Why a [`NotificationBus::subscribe`] call returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverExit {
    /// The connection probe reported the peer gone.
    Disconnected,
    /// The peer sent data on a receive-only watch.
    PeerMessage,
    /// Sending an event failed.
    SendFailed,
    /// The topic was stopped (explicitly or by bus shutdown).
    TopicStopped,
}

struct GroupState {
    latest: Option<Arc<str>>,
    counter: u64,
    claimed: u64,
    observers: usize,
    stopped: bool,
}

struct TopicGroup {
    state: Mutex<GroupState>,
    wake: Condvar,
}

impl TopicGroup {
    fn new() -> Self {
        Self {
            state: Mutex::new(GroupState {
                latest: None,
                counter: 0,
                claimed: 0,
                observers: 0,
                stopped: false,
            }),
            wake: Condvar::new(),
        }
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.stopped = true;
        state.latest = None;
        self.wake.notify_all();
    }
}

/// Topic-based broadcast of "this changed, re-fetch" signals.
///
/// Carries only the most recent event per topic. An observer that wakes
/// after several publishes sees just the newest one.
///
/// # Examples
///
/// ```
/// use orrery_bus::{NotificationBus, PublishOutcome};
///
/// let bus = NotificationBus::default();
/// // No observers yet: the event is dropped.
/// let out = bus.publish("world/1/status-watch", &"OK").unwrap();
/// assert_eq!(out, PublishOutcome::NoObservers);
/// assert!(bus.topics().is_empty());
/// ```
pub struct NotificationBus {
    config: BusConfig,
    topics: Mutex<HashMap<String, Arc<TopicGroup>>>,
    teardown: Option<TeardownHook>,
    shut_down: AtomicBool,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl NotificationBus {
    /// Create a bus. Call [`BusConfig::validate`] first when the config
    /// comes from outside.
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            topics: Mutex::new(HashMap::new()),
            teardown: None,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Install a hook called with the topic name whenever the last
    /// observer of a topic leaves.
    pub fn with_teardown_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.teardown = Some(Box::new(hook));
        self
    }

    /// The bus configuration.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    // ── Publishing ──────────────────────────────────────────────

    /// Make `event` the topic's latest event and wake its observers.
    ///
    /// With no observers this is a no-op. Under
    /// [`OverrunPolicy::Error`], publishing while the previous event has
    /// not reached any observer returns [`BusError::Overrun`] *after*
    /// storing the new event and waking observers.
    pub fn publish<E: Serialize + ?Sized>(
        &self,
        topic: &str,
        event: &E,
    ) -> Result<PublishOutcome, BusError> {
        let text: Arc<str> = serde_json::to_string(event)
            .map_err(|e| BusError::Encode {
                detail: e.to_string(),
            })?
            .into();

        let group = match self.topics.lock().unwrap().get(topic) {
            Some(group) => Arc::clone(group),
            None => return Ok(PublishOutcome::NoObservers),
        };

        let mut state = group.state.lock().unwrap();
        if state.stopped || state.observers == 0 {
            return Ok(PublishOutcome::NoObservers);
        }
        let pending = state.counter - state.claimed;
        state.latest = Some(text);
        state.counter += 1;
        let counter = state.counter;
        let observers = state.observers;
        group.wake.notify_all();
        drop(state);

        if pending > 0 && self.config.overrun == OverrunPolicy::Error {
            return Err(BusError::Overrun {
                topic: topic.to_string(),
                pending,
            });
        }
        Ok(PublishOutcome::Delivered { counter, observers })
    }

    // ── Subscribing ─────────────────────────────────────────────

    /// Attach `conn` to `topic` and serve it until it disconnects or the
    /// topic stops.
    ///
    /// Blocks the calling thread for the whole connection lifetime. The
    /// topic is created on its first observer and torn down when its last
    /// observer leaves. An observer that joins after a publish receives
    /// the topic's current latest event right away.
    pub fn subscribe(
        &self,
        topic: &str,
        conn: &mut dyn Connection,
    ) -> Result<ObserverExit, BusError> {
        let group = {
            let mut topics = self.topics.lock().unwrap();
            if self.shut_down.load(Ordering::Acquire) {
                return Err(BusError::ShutDown);
            }
            let group = topics.entry(topic.to_string()).or_insert_with(|| {
                log::info!("topic {topic} created");
                Arc::new(TopicGroup::new())
            });
            let group = Arc::clone(group);
            let mut state = group.state.lock().unwrap();
            state.observers += 1;
            log::debug!("subscribed to {topic}, {} observer(s)", state.observers);
            drop(state);
            group
        };

        let exit = self.observe(&group, conn);
        conn.close();
        log::debug!("observer of {topic} left: {exit:?}");
        self.unregister(topic, &group);
        Ok(exit)
    }

    fn observe(&self, group: &TopicGroup, conn: &mut dyn Connection) -> ObserverExit {
        let mut last_seen = 0u64;
        loop {
            match conn.probe(self.config.probe_timeout) {
                Probe::Idle => {}
                Probe::Inbound => return ObserverExit::PeerMessage,
                Probe::Closed => return ObserverExit::Disconnected,
            }

            let event = {
                let state = group.state.lock().unwrap();
                let (mut state, _) = group
                    .wake
                    .wait_timeout_while(state, self.config.wake_interval, |s| {
                        !s.stopped && s.counter == last_seen
                    })
                    .unwrap();
                if state.stopped {
                    return ObserverExit::TopicStopped;
                }
                if state.counter == last_seen {
                    None
                } else {
                    last_seen = state.counter;
                    state.claimed = state.claimed.max(last_seen);
                    state.latest.clone()
                }
            };

            if let Some(text) = event {
                if let Err(e) = conn.send_text(&text) {
                    log::debug!("send to observer failed: {e}");
                    return ObserverExit::SendFailed;
                }
            }
        }
    }

    fn unregister(&self, topic: &str, group: &Arc<TopicGroup>) {
        let emptied = {
            let mut topics = self.topics.lock().unwrap();
            let mut state = group.state.lock().unwrap();
            state.observers -= 1;
            let emptied = state.observers == 0;
            if emptied {
                state.stopped = true;
                state.latest = None;
                group.wake.notify_all();
                if topics.get(topic).is_some_and(|g| Arc::ptr_eq(g, group)) {
                    topics.remove(topic);
                }
            }
            emptied
        };
        if emptied {
            log::info!("all observers left {topic}");
            if let Some(hook) = &self.teardown {
                hook(topic);
            }
        }
    }

    // ── Inspection and teardown ─────────────────────────────────

    /// Observers currently attached to `topic`.
    pub fn observer_count(&self, topic: &str) -> usize {
        match self.topics.lock().unwrap().get(topic) {
            Some(group) => group.state.lock().unwrap().observers,
            None => 0,
        }
    }

    /// Names of all live topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<_> = self.topics.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stop a topic: wake all of its observers so they disconnect.
    ///
    /// Returns `false` if the topic did not exist. A later subscribe to
    /// the same name starts a fresh group.
    pub fn stop_topic(&self, topic: &str) -> bool {
        let group = self.topics.lock().unwrap().remove(topic);
        match group {
            Some(group) => {
                log::info!("stopping topic {topic}");
                group.stop();
                true
            }
            None => false,
        }
    }

    /// Stop every topic and refuse new observers.
    pub fn shutdown(&self) {
        let groups: Vec<_> = {
            let mut topics = self.topics.lock().unwrap();
            self.shut_down.store(true, Ordering::Release);
            topics.drain().collect()
        };
        log::info!("notification bus shutting down, {} topic(s)", groups.len());
        for (_, group) in groups {
            group.stop();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}
