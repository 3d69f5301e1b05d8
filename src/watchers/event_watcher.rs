//! # EventWatcher: wait for one event.
//!
//! ```text
//!            new()                 trigger
//!   Idle ───────────► Waiting ───────────────► Triggered
//!     │   wait()         │
//!     │                  └── deadline ───────► TimedOut ──(trigger)──► Triggered
//!     └──────────────────────── trigger ─────► Triggered
//! ```
//!
//! The watcher registers itself on construction, so a trigger that happens
//! before `wait_*` is called is not lost. Only the first delivery is kept;
//! later ones are ignored until [`EventWatcher::reset`].
//!
//! Every reset bumps a generation and registers a fresh listener. A delivery
//! snapshotted for an older listener may still run after the reset; it sees a
//! stale generation and is dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::Dispatcher;
use crate::error::BusError;
use crate::events::{Event, EventType, Sender};
use crate::subscribers::{ConditionRef, Listener, ListenerId, ListenerRef, SubscriptionSpec};
use crate::watchers::deadline_after;

/// Observable state of an [`EventWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Registered, nobody waiting yet.
    Idle,
    /// A thread is blocked in `wait_*`.
    Waiting,
    /// The event arrived.
    Triggered,
    /// The last wait ended at its deadline.
    TimedOut,
}

struct Slot {
    state: WatchState,
    event: Option<Event>,
    generation: u64,
}

struct WatchSignal {
    slot: Mutex<Slot>,
    cv: Condvar,
}

impl WatchSignal {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: WatchState::Idle,
                event: None,
                generation: 0,
            }),
            cv: Condvar::new(),
        }
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut slot = self.slot.lock();
        if slot.state == WatchState::Triggered {
            return true;
        }

        slot.state = WatchState::Waiting;
        while slot.state != WatchState::Triggered {
            match deadline {
                None => self.cv.wait(&mut slot),
                Some(at) => {
                    if self.cv.wait_until(&mut slot, at).timed_out() {
                        break;
                    }
                }
            }
        }

        if slot.state == WatchState::Triggered {
            true
        } else {
            slot.state = WatchState::TimedOut;
            false
        }
    }
}

/// Internal listener: records the first delivery of its generation and wakes waiters.
struct WatchListener {
    generation: u64,
    signal: Arc<WatchSignal>,
}

impl Listener for WatchListener {
    fn event_triggered(&self, _sender: &Sender, event: &Event) {
        let mut slot = self.signal.slot.lock();
        if slot.generation != self.generation || slot.state == WatchState::Triggered {
            return;
        }
        slot.state = WatchState::Triggered;
        slot.event = Some(event.clone());
        self.signal.cv.notify_all();
    }

    fn name(&self) -> &'static str {
        "event-watcher"
    }

    fn is_non_blocking(&self) -> bool {
        true
    }
}

/// Blocks a thread until one event type is triggered.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use eventvisor::{value, Config, Dispatcher, Event, EventWatcher};
///
/// let bus = Dispatcher::new(Config::default()).unwrap();
/// let mut watcher = EventWatcher::new(&bus, "Ready").unwrap();
///
/// bus.trigger(value(()), Event::new("Ready"), None).unwrap();
/// assert!(watcher.wait_until_triggered_then_unregister(Duration::from_secs(5)));
/// assert!(!bus.is_subscribed(watcher.listener_id(), "Ready"));
/// ```
pub struct EventWatcher {
    bus: Dispatcher,
    event_type: EventType,
    condition: Option<ConditionRef>,
    signal: Arc<WatchSignal>,
    listener: Arc<WatchListener>,
    registered: bool,
}

impl EventWatcher {
    /// Creates a watcher for every event of `event_type`.
    pub fn new(bus: &Dispatcher, event_type: impl Into<EventType>) -> Result<Self, BusError> {
        Self::with_condition(bus, event_type, None)
    }

    /// Creates a watcher that only fires when `condition` matches.
    ///
    /// With a condition, the watcher only fires for triggers that carry an expression.
    pub fn with_condition(
        bus: &Dispatcher,
        event_type: impl Into<EventType>,
        condition: Option<ConditionRef>,
    ) -> Result<Self, BusError> {
        let signal = Arc::new(WatchSignal::new());
        let mut watcher = Self {
            bus: bus.clone(),
            event_type: event_type.into(),
            condition,
            listener: Arc::new(WatchListener {
                generation: 0,
                signal: Arc::clone(&signal),
            }),
            signal,
            registered: false,
        };
        watcher.register()?;
        Ok(watcher)
    }

    fn register(&mut self) -> Result<(), BusError> {
        let listener: ListenerRef = self.listener.clone();
        let spec = SubscriptionSpec::new(listener, self.event_type.clone())
            .with_condition_opt(self.condition.clone());
        self.bus.register(spec)?;
        self.registered = true;
        Ok(())
    }

    /// Waits up to `timeout` (`Duration::ZERO` = forever) and keeps the registration.
    ///
    /// Returns `true` immediately if the event already arrived.
    pub fn wait_until_triggered(&self, timeout: Duration) -> bool {
        self.signal.wait(timeout)
    }

    /// Waits up to `timeout`, then unregisters regardless of the outcome.
    pub fn wait_until_triggered_then_unregister(&mut self, timeout: Duration) -> bool {
        let triggered = self.signal.wait(timeout);
        self.unregister();
        triggered
    }

    /// Removes the internal listener. Idempotent.
    pub fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        if let Err(e) = self.bus.unregister(self.listener_id(), &self.event_type) {
            if !e.is_not_found() {
                tracing::debug!(error = %e, event_type = %self.event_type, "watcher unregister skipped");
            }
        }
    }

    /// Re-arms the watcher: clears the recorded event and registers a fresh listener.
    ///
    /// Deliveries already in flight for the previous listener are ignored.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.unregister();
        let generation = {
            let mut slot = self.signal.slot.lock();
            slot.state = WatchState::Idle;
            slot.event = None;
            slot.generation += 1;
            slot.generation
        };
        self.listener = Arc::new(WatchListener {
            generation,
            signal: Arc::clone(&self.signal),
        });
        self.register()
    }

    /// Current state.
    pub fn state(&self) -> WatchState {
        self.signal.slot.lock().state
    }

    /// Returns `true` once the event arrived.
    pub fn is_triggered(&self) -> bool {
        self.state() == WatchState::Triggered
    }

    /// The event that fired the watcher, if any.
    pub fn triggered_event(&self) -> Option<Event> {
        self.signal.slot.lock().event.clone()
    }

    /// Watched event type.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Identity of the current internal listener; changes on every [`reset`](Self::reset).
    pub fn listener_id(&self) -> ListenerId {
        ListenerId::of(&self.listener)
    }

    /// Returns `true` while the internal listener is registered.
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.unregister();
    }
}
