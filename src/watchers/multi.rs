//! # MultiEventWatcher: wait for any or all of several events.
//!
//! ```text
//! pairs:  [0] OrderPlaced      ─► PairListener{0} ─┐
//!         [1] PaymentReceived  ─► PairListener{1} ─┼─► MultiSignal { has_been_triggered,
//!         [2] PaymentReceived? ─► PairListener{2} ─┘                 triggered_event,
//!              (other condition)                                      fired: [bool; n] } + Condvar
//! ```
//!
//! Every pair registers its own listener handle. Subscriptions are deduplicated
//! by (listener, event type), so one shared handle would silently drop the
//! second pair on the same type; separate handles keep every pair live.
//!
//! [`MultiEventWatcher::re_enable`] swaps every handle for a new one tagged
//! with the next generation; late deliveries to the old handles are dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::Dispatcher;
use crate::error::BusError;
use crate::events::{Event, EventType, Sender, Value};
use crate::subscribers::{ConditionRef, Listener, ListenerId, ListenerRef, SubscriptionSpec};
use crate::watchers::deadline_after;

#[derive(Default)]
struct MultiState {
    has_been_triggered: bool,
    triggered_event: Option<Event>,
    fired: Vec<bool>,
    generation: u64,
}

#[derive(Default)]
struct MultiSignal {
    state: Mutex<MultiState>,
    cv: Condvar,
}

impl MultiSignal {
    /// Blocks until `done(state)` holds or the deadline passes; returns the final `done`.
    fn wait_until<F>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&MultiState) -> bool,
    {
        let deadline = deadline_after(timeout);
        let mut st = self.state.lock();
        while !done(&st) {
            match deadline {
                None => self.cv.wait(&mut st),
                Some(at) => {
                    if self.cv.wait_until(&mut st, at).timed_out() {
                        break;
                    }
                }
            }
        }
        done(&st)
    }
}

struct PairListener {
    index: usize,
    generation: u64,
    signal: Arc<MultiSignal>,
}

impl Listener for PairListener {
    fn event_triggered(&self, _sender: &Sender, event: &Event) {
        let mut st = self.signal.state.lock();
        if st.generation != self.generation {
            return;
        }
        st.has_been_triggered = true;
        st.triggered_event = Some(event.clone());
        if let Some(flag) = st.fired.get_mut(self.index) {
            *flag = true;
        }
        self.signal.cv.notify_all();
    }

    fn name(&self) -> &'static str {
        "multi-event-watcher"
    }

    fn is_non_blocking(&self) -> bool {
        true
    }
}

struct WatchedPair {
    event_type: EventType,
    condition: Option<ConditionRef>,
    listener: Arc<PairListener>,
    registered: bool,
}

impl WatchedPair {
    fn listener_id(&self) -> ListenerId {
        ListenerId::of(&self.listener)
    }
}

/// Blocks a thread until any or all of several (event type, condition) pairs fire.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use eventvisor::{value, Config, Dispatcher, Event, MultiEventWatcher};
///
/// let bus = Dispatcher::new(Config::default()).unwrap();
/// let mut w = MultiEventWatcher::new(&bus);
/// w.add_event("OrderPlaced", None).unwrap();
/// w.add_event("PaymentReceived", None).unwrap();
///
/// bus.trigger(value(()), Event::new("OrderPlaced"), None).unwrap();
/// bus.trigger(value(()), Event::new("PaymentReceived"), None).unwrap();
///
/// assert!(w.wait_for_all_events_then_unregister(Duration::from_secs(5)));
/// ```
pub struct MultiEventWatcher {
    bus: Dispatcher,
    signal: Arc<MultiSignal>,
    pairs: Vec<WatchedPair>,
}

impl MultiEventWatcher {
    /// Creates an empty watcher bound to `bus`.
    pub fn new(bus: &Dispatcher) -> Self {
        Self {
            bus: bus.clone(),
            signal: Arc::new(MultiSignal::default()),
            pairs: Vec::new(),
        }
    }

    /// Adds a pair and registers its listener immediately.
    ///
    /// Pairs are indexed in insertion order (see [`is_triggered`](Self::is_triggered)).
    pub fn add_event(
        &mut self,
        event_type: impl Into<EventType>,
        condition: Option<ConditionRef>,
    ) -> Result<(), BusError> {
        let index = self.pairs.len();
        let generation = {
            let mut st = self.signal.state.lock();
            st.fired.push(false);
            st.generation
        };

        let mut pair = WatchedPair {
            event_type: event_type.into(),
            condition,
            listener: self.pair_listener(index, generation),
            registered: false,
        };
        let res = self.register(&mut pair);
        self.pairs.push(pair);
        res
    }

    fn pair_listener(&self, index: usize, generation: u64) -> Arc<PairListener> {
        Arc::new(PairListener {
            index,
            generation,
            signal: Arc::clone(&self.signal),
        })
    }

    fn register(&self, pair: &mut WatchedPair) -> Result<(), BusError> {
        let listener: ListenerRef = pair.listener.clone();
        let spec = SubscriptionSpec::new(listener, pair.event_type.clone())
            .with_condition_opt(pair.condition.clone());
        self.bus.register(spec)?;
        pair.registered = true;
        Ok(())
    }

    /// Waits until at least one pair fired; `Duration::ZERO` waits forever.
    pub fn wait_for_any_event(&self, timeout: Duration) -> bool {
        self.signal
            .wait_until(timeout, |st| st.has_been_triggered)
    }

    /// Waits until every pair fired; `Duration::ZERO` waits forever.
    ///
    /// An empty watcher returns `true` immediately.
    pub fn wait_for_all_events(&self, timeout: Duration) -> bool {
        self.signal
            .wait_until(timeout, |st| st.fired.iter().all(|f| *f))
    }

    /// [`wait_for_any_event`](Self::wait_for_any_event), then unregisters every pair.
    pub fn wait_for_any_event_then_unregister(&mut self, timeout: Duration) -> bool {
        let triggered = self.wait_for_any_event(timeout);
        self.unregister_all();
        triggered
    }

    /// [`wait_for_all_events`](Self::wait_for_all_events), then unregisters every pair.
    pub fn wait_for_all_events_then_unregister(&mut self, timeout: Duration) -> bool {
        let triggered = self.wait_for_all_events(timeout);
        self.unregister_all();
        triggered
    }

    /// Unregisters every pair's listener. Pairs stay known for [`re_enable`](Self::re_enable).
    pub fn unregister_all(&mut self) {
        for pair in self.pairs.iter_mut().filter(|p| p.registered) {
            pair.registered = false;
            let id = pair.listener_id();
            if let Err(e) = self.bus.unregister(id, &pair.event_type) {
                if !e.is_not_found() {
                    tracing::debug!(error = %e, event_type = %pair.event_type, "watcher unregister skipped");
                }
            }
        }
    }

    /// Clears every flag and the recorded event, then registers all pairs again
    /// with their conditions.
    ///
    /// Each pair gets a fresh listener, so deliveries still in flight for the
    /// previous round cannot mark the new round as triggered.
    pub fn re_enable(&mut self) -> Result<(), BusError> {
        self.unregister_all();
        let generation = {
            let mut st = self.signal.state.lock();
            st.has_been_triggered = false;
            st.triggered_event = None;
            st.fired.iter_mut().for_each(|f| *f = false);
            st.generation += 1;
            st.generation
        };

        let mut pairs = std::mem::take(&mut self.pairs);
        for (index, pair) in pairs.iter_mut().enumerate() {
            pair.listener = self.pair_listener(index, generation);
        }
        let res = pairs.iter_mut().try_for_each(|p| self.register(p));
        self.pairs = pairs;
        res
    }

    /// Returns `true` once any pair fired.
    pub fn has_been_triggered(&self) -> bool {
        self.signal.state.lock().has_been_triggered
    }

    /// The most recent event delivered to any pair.
    pub fn triggered_event(&self) -> Option<Event> {
        self.signal.state.lock().triggered_event.clone()
    }

    /// Payload of the most recent event, if it carried one.
    pub fn triggered_event_payload(&self) -> Option<Value> {
        self.signal
            .state
            .lock()
            .triggered_event
            .as_ref()
            .and_then(|e| e.payload.clone())
    }

    /// Returns `true` when every pair fired (also for an empty watcher).
    pub fn are_all_events_triggered(&self) -> bool {
        self.signal.state.lock().fired.iter().all(|f| *f)
    }

    /// Whether pair `index` fired; `None` if there is no such pair.
    pub fn is_triggered(&self, index: usize) -> Option<bool> {
        self.signal.state.lock().fired.get(index).copied()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no pair was added.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Listener identities of all pairs, in insertion order; renewed by [`re_enable`](Self::re_enable).
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.pairs.iter().map(WatchedPair::listener_id).collect()
    }
}

impl Drop for MultiEventWatcher {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
