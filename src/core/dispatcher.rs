//! # Dispatcher: registration, trigger, scheduling and shutdown.
//!
//! The [`Dispatcher`] is the façade of the event bus. It owns the subscription
//! registry, a tokio runtime that runs every delivery, the report bus, and the
//! root cancellation token of all schedules.
//!
//! ## High-level architecture
//! ```text
//! register(spec) ──► Registry (parking_lot::Mutex) ──► Extension::after_register
//!
//! trigger(sender, event, expr?)
//!     └─► Shared::dispatch ──► snapshot_for(type) ──► one task per subscription
//!                                                     ├─ Listener      → blocking pool
//!                                                     └─ AsyncListener → runtime workers
//!
//! trigger_after_delay / trigger_periodically
//!     └─► root.child_token() ──► timer task ──► Shared::dispatch (per firing)
//!
//! shutdown()
//!     ├─► closed = true        (further calls → BusError::Closed)
//!     ├─► root.cancel()        (every schedule stops)
//!     └─► runtime.shutdown_background()   (queued deliveries are dropped)
//! ```
//!
//! ## Rules
//! - All methods are synchronous and may be called from any thread, including
//!   from inside a listener.
//! - `Dispatcher` is a cheap handle (`Clone`); the runtime stops when the last
//!   handle is dropped or [`Dispatcher::shutdown`] is called.
//! - No ordering is guaranteed between listeners or between triggers.
//! - A listener that captures a `Dispatcher` handle keeps the bus alive while it
//!   is registered; call [`Dispatcher::shutdown`] explicitly in that case.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eventvisor::{value, Config, Dispatcher, Event, EventWatcher, ListenerFn, ListenerRef};
//!
//! let bus = Dispatcher::new(Config::default()).unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let s = seen.clone();
//! let audit: ListenerRef = ListenerFn::arc("audit", move |_, _| {
//!     s.fetch_add(1, Ordering::SeqCst);
//! });
//! bus.subscribe(audit, "OrderPlaced").unwrap();
//!
//! let mut done = EventWatcher::new(&bus, "OrderPlaced").unwrap();
//! bus.trigger(value("checkout"), Event::new("OrderPlaced"), None).unwrap();
//!
//! assert!(done.wait_until_triggered_then_unregister(Duration::from_secs(5)));
//! bus.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::builder::DispatcherBuilder;
use crate::core::config::Config;
use crate::core::context::ContextKey;
use crate::core::delivery::{Delivery, Shared};
use crate::core::registry::RegistrySnapshot;
use crate::core::schedule::{self, ScheduleHandle};
use crate::error::BusError;
use crate::events::{Event, EventType, Expression, Report, Sender};
use crate::subscribers::{ConditionRef, Handler, ListenerId, Registered, SubscriptionSpec};
use crate::watchers::EventWatcher;

struct Inner {
    shared: Arc<Shared>,
    runtime: Mutex<Option<Runtime>>,
    root: CancellationToken,
}

impl Inner {
    fn shutdown(&self) {
        if !self.shared.close() {
            return;
        }
        self.root.cancel();
        let runtime = self.runtime.lock().take();
        if let Some(rt) = runtime {
            rt.shutdown_background();
        }
        tracing::info!("event bus shut down");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// In-process event bus.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher with the given configuration and no extension.
    ///
    /// Fails with [`BusError::Runtime`] if the delivery runtime cannot start.
    pub fn new(cfg: Config) -> Result<Self, BusError> {
        Self::builder(cfg).build()
    }

    /// Returns a builder for a dispatcher with optional features.
    pub fn builder(cfg: Config) -> DispatcherBuilder {
        DispatcherBuilder::new(cfg)
    }

    pub(crate) fn new_internal(shared: Arc<Shared>, runtime: Runtime) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared,
                runtime: Mutex::new(Some(runtime)),
                root: CancellationToken::new(),
            }),
        }
    }

    fn open(&self) -> Result<&Arc<Shared>, BusError> {
        let shared = &self.inner.shared;
        if shared.is_closed() {
            Err(BusError::Closed)
        } else {
            Ok(shared)
        }
    }

    /// Registers a subscription.
    ///
    /// If the listener is already registered for the event type the existing
    /// subscription (and its condition) is kept and
    /// [`Registered::AlreadyPresent`] is returned. The context, if any, is
    /// recorded in both cases.
    pub fn register(&self, spec: SubscriptionSpec) -> Result<Registered, BusError> {
        let shared = self.open()?;
        let (sub, ctx) = spec.into_parts();
        let outcome = shared.registry.register(sub.clone(), ctx);

        tracing::debug!(
            listener = sub.listener_name(),
            event_type = %sub.event_type(),
            conditional = sub.condition().is_some(),
            ?outcome,
            "listener registered"
        );
        shared.after_register(&sub, outcome);
        Ok(outcome)
    }

    /// Registers `listener` for every event of `event_type`, without condition or context.
    pub fn subscribe(
        &self,
        listener: impl Into<Handler>,
        event_type: impl Into<EventType>,
    ) -> Result<Registered, BusError> {
        self.register(SubscriptionSpec::new(listener, event_type))
    }

    /// Removes the subscription of `listener` for `event_type`.
    ///
    /// Returns [`BusError::NotFound`] if there is none; deliveries already
    /// submitted still run.
    pub fn unregister(
        &self,
        listener: ListenerId,
        event_type: impl Into<EventType>,
    ) -> Result<(), BusError> {
        let event_type = event_type.into();
        match self.inner.shared.registry.unregister(listener, &event_type) {
            Some(sub) => {
                tracing::debug!(
                    listener = sub.listener_name(),
                    event_type = %event_type,
                    "listener unregistered"
                );
                Ok(())
            }
            None => Err(BusError::NotFound {
                listener,
                event_type,
            }),
        }
    }

    /// Removes every subscription registered under `ctx`; returns how many were removed.
    pub fn unregister_all_for_context(&self, ctx: impl Into<ContextKey>) -> usize {
        let ctx = ctx.into();
        let n = self.inner.shared.registry.unregister_context(&ctx);
        tracing::debug!(context = %ctx, removed = n, "context unregistered");
        n
    }

    /// Removes every subscription and context; returns how many subscriptions were removed.
    pub fn unregister_all(&self) -> usize {
        let n = self.inner.shared.registry.clear();
        tracing::debug!(removed = n, "all listeners unregistered");
        n
    }

    /// Delivers `event` to every matching subscription, asynchronously.
    ///
    /// Returns as soon as the deliveries are submitted. A subscription with a
    /// condition is only invoked when `expression` is `Some` and the condition
    /// matches.
    pub fn trigger(
        &self,
        sender: Sender,
        event: Event,
        expression: Option<Expression>,
    ) -> Result<(), BusError> {
        let shared = self.open()?;
        shared.dispatch(Delivery::new(sender, event, expression));
        Ok(())
    }

    /// Triggers `event` once after `delay`.
    ///
    /// The registry is consulted when the timer fires, not now.
    pub fn trigger_after_delay(
        &self,
        sender: Sender,
        event: Event,
        expression: Option<Expression>,
        delay: Duration,
    ) -> Result<ScheduleHandle, BusError> {
        let shared = self.open()?;
        Ok(schedule::once(
            shared,
            &self.inner.root,
            Delivery::new(sender, event, expression),
            delay,
        ))
    }

    /// Triggers `event` after `initial_delay`, then every `period` until cancelled.
    ///
    /// Fails with [`BusError::InvalidSchedule`] when `period` is zero.
    pub fn trigger_periodically(
        &self,
        sender: Sender,
        event: Event,
        expression: Option<Expression>,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduleHandle, BusError> {
        let shared = self.open()?;
        if period.is_zero() {
            return Err(BusError::InvalidSchedule {
                reason: "period must be non-zero",
                period,
            });
        }
        Ok(schedule::periodic(
            shared,
            &self.inner.root,
            Delivery::new(sender, event, expression),
            initial_delay,
            period,
        ))
    }

    /// Blocks the calling thread until `event_type` is triggered (and `condition`
    /// matches, if given) or `timeout` elapses. `Duration::ZERO` waits forever.
    ///
    /// Returns whether the event arrived. The temporary registration is always
    /// removed before returning.
    ///
    /// Must not be called from an async context.
    pub fn wait_until_triggered(
        &self,
        event_type: impl Into<EventType>,
        timeout: Duration,
        condition: Option<ConditionRef>,
    ) -> Result<bool, BusError> {
        let mut watcher = EventWatcher::with_condition(self, event_type, condition)?;
        Ok(watcher.wait_until_triggered_then_unregister(timeout))
    }

    /// Subscribes to failure reports (listener panics, hook failures).
    ///
    /// Only reports published after this call are received.
    pub fn reports(&self) -> broadcast::Receiver<Report> {
        self.inner.shared.reports.subscribe()
    }

    /// Stops the dispatcher. Idempotent.
    ///
    /// Cancels all schedules and drops deliveries that have not started yet.
    /// Running listeners are not interrupted.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Returns `true` after [`shutdown`](Self::shutdown).
    pub fn is_closed(&self) -> bool {
        self.inner.shared.is_closed()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.shared.registry.len()
    }

    /// Returns `true` if `listener` is registered for `event_type`.
    pub fn is_subscribed(&self, listener: ListenerId, event_type: impl Into<EventType>) -> bool {
        self.inner
            .shared
            .registry
            .contains(listener, &event_type.into())
    }

    /// Event types with at least one subscription, sorted.
    pub fn event_types(&self) -> Vec<EventType> {
        self.inner.shared.registry.event_types()
    }

    /// Copy of all subscriptions, grouped by event type.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.shared.registry.snapshot()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.is_closed())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    use async_trait::async_trait;
    use tokio::sync::broadcast::error::TryRecvError;

    use crate::core::extension::Extension;
    use crate::events::{value, ReportKind};
    use crate::subscribers::{
        condition, when_expression, AsyncListener, AsyncListenerRef, Listener, ListenerFn,
        ListenerRef, Subscription,
    };
    use crate::testing::{dispatcher, settle, Recorder};

    const WAIT: Duration = Duration::from_secs(5);

    struct Payment {
        amount: u64,
    }

    fn recv_report(rx: &mut broadcast::Receiver<Report>, timeout: Duration) -> Option<Report> {
        let deadline = Instant::now() + timeout;
        loop {
            match rx.try_recv() {
                Ok(r) => return Some(r),
                Err(TryRecvError::Empty) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => return None,
            }
        }
    }

    #[test]
    fn order_placed_reaches_every_subscriber() {
        let bus = dispatcher();
        let a = Recorder::arc("a");
        let b = Recorder::arc("b");
        bus.subscribe(a.clone() as ListenerRef, "OrderPlaced").expect("a");
        bus.subscribe(b.clone() as ListenerRef, "OrderPlaced").expect("b");

        bus.trigger(value("checkout"), Event::new("OrderPlaced").with_payload(42_u64), None)
            .expect("trigger");

        assert!(a.wait_for(1, WAIT));
        assert!(b.wait_for(1, WAIT));
        assert_eq!(a.events()[0].payload_as::<u64>(), Some(&42));
        assert_eq!(a.senders()[0].downcast_ref::<&str>(), Some(&"checkout"));
    }

    #[test]
    fn payment_condition_filters_by_expression() {
        let bus = dispatcher();
        let large = Recorder::arc("large");
        bus.register(
            SubscriptionSpec::new(large.clone() as ListenerRef, "PaymentReceived")
                .with_condition(when_expression(|p: &Payment| p.amount > 100)),
        )
        .expect("register");

        let ev = || Event::new("PaymentReceived");
        bus.trigger(value(()), ev(), Some(value(Payment { amount: 50 })))
            .expect("trigger");
        bus.trigger(value(()), ev(), None).expect("trigger");
        settle();
        assert_eq!(large.count(), 0);

        bus.trigger(value(()), ev(), Some(value(Payment { amount: 150 })))
            .expect("trigger");
        assert!(large.wait_for(1, WAIT));
        settle();
        assert_eq!(large.count(), 1);
    }

    #[test]
    fn first_registered_condition_wins() {
        let bus = dispatcher();
        let l = Recorder::arc("l");
        let first = SubscriptionSpec::new(l.clone() as ListenerRef, "PaymentReceived")
            .with_condition(when_expression(|p: &Payment| p.amount > 100));
        let second = SubscriptionSpec::new(l.clone() as ListenerRef, "PaymentReceived")
            .with_condition(condition(|_, _, _| true));

        assert_eq!(bus.register(first).expect("first"), Registered::Inserted);
        assert_eq!(bus.register(second).expect("second"), Registered::AlreadyPresent);
        assert_eq!(bus.subscription_count(), 1);

        bus.trigger(
            value(()),
            Event::new("PaymentReceived"),
            Some(value(Payment { amount: 10 })),
        )
        .expect("trigger");
        settle();
        assert_eq!(l.count(), 0);
    }

    #[test]
    fn trigger_without_subscribers_is_a_noop() {
        let bus = dispatcher();
        bus.trigger(value(()), Event::new("Nobody"), None)
            .expect("trigger");
        assert!(bus.event_types().is_empty());
    }

    #[test]
    fn context_teardown_removes_only_its_group() {
        let bus = dispatcher();
        let a = Recorder::arc("a");
        let b = Recorder::arc("b");
        let c = Recorder::arc("c");
        let ctx = ContextKey::from("batch-7");

        bus.register(SubscriptionSpec::new(a.clone() as ListenerRef, "OrderPlaced").with_context(&ctx))
            .expect("a");
        bus.register(
            SubscriptionSpec::new(b.clone() as ListenerRef, "PaymentReceived").with_context(&ctx),
        )
        .expect("b");
        bus.subscribe(c.clone() as ListenerRef, "OrderPlaced").expect("c");

        assert_eq!(bus.unregister_all_for_context(&ctx), 2);
        assert_eq!(bus.unregister_all_for_context(&ctx), 0);
        assert_eq!(bus.unregister_all_for_context(ContextKey::unique()), 0);

        bus.trigger(value(()), Event::new("OrderPlaced"), None)
            .expect("trigger");
        bus.trigger(value(()), Event::new("PaymentReceived"), None)
            .expect("trigger");
        assert!(c.wait_for(1, WAIT));
        settle();
        assert_eq!(a.count(), 0);
        assert_eq!(b.count(), 0);
    }

    #[test]
    fn unregister_unknown_subscription_is_not_found() {
        let bus = dispatcher();
        let l: ListenerRef = ListenerFn::arc("l", |_, _| {});
        let id = ListenerId::of(&l);

        let err = bus.unregister(id, "Never").expect_err("not found");
        assert!(err.is_not_found());

        bus.subscribe(l, "T").expect("subscribe");
        assert!(bus.is_subscribed(id, "T"));
        bus.unregister(id, "T").expect("unregister");
        assert!(!bus.is_subscribed(id, "T"));
        assert!(bus.unregister(id, "T").expect_err("gone").is_not_found());
    }

    #[test]
    fn unregister_all_clears_registry() {
        let bus = dispatcher();
        let l = Recorder::arc("l");
        bus.subscribe(l.clone() as ListenerRef, "A").expect("a");
        bus.register(SubscriptionSpec::new(l.clone() as ListenerRef, "B").with_context("g"))
            .expect("b");

        assert_eq!(bus.unregister_all(), 2);
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(bus.unregister_all_for_context("g"), 0);

        bus.trigger(value(()), Event::new("A"), None).expect("trigger");
        settle();
        assert_eq!(l.count(), 0);
    }

    #[test]
    fn periodic_trigger_fires_until_cancelled() {
        let bus = dispatcher();
        let early = Recorder::arc("early");
        bus.subscribe(early.clone() as ListenerRef, "Heartbeat")
            .expect("early");

        let started = Instant::now();
        let handle = bus
            .trigger_periodically(
                value(()),
                Event::new("Heartbeat"),
                None,
                Duration::ZERO,
                Duration::from_millis(100),
            )
            .expect("schedule");

        assert!(early.wait_for(1, Duration::from_millis(90)));
        let late = Recorder::arc("late");
        bus.subscribe(late.clone() as ListenerRef, "Heartbeat")
            .expect("late");

        assert!(early.wait_for(3, Duration::from_millis(450)));
        assert!(started.elapsed() < Duration::from_millis(450));
        assert!(late.wait_for(2, Duration::from_millis(200)));

        handle.cancel();
        assert!(handle.is_cancelled());
        settle();
        let frozen = early.count();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(early.count(), frozen);
        assert!(handle.fired() >= 3);
    }

    #[test]
    fn unbounded_initial_delay_never_fires() {
        let bus = dispatcher();
        let l = Recorder::arc("l");
        bus.subscribe(l.clone() as ListenerRef, "Someday").expect("subscribe");

        let handle = bus
            .trigger_periodically(
                value(()),
                Event::new("Someday"),
                None,
                Duration::MAX,
                Duration::from_millis(10),
            )
            .expect("schedule");

        settle();
        assert_eq!(handle.fired(), 0);
        assert_eq!(l.count(), 0);
        assert!(!bus.is_closed());
        handle.cancel();
    }

    #[test]
    fn zero_period_is_rejected() {
        let bus = dispatcher();
        let err = bus
            .trigger_periodically(value(()), Event::new("X"), None, Duration::ZERO, Duration::ZERO)
            .expect_err("invalid");
        assert_eq!(err.as_label(), "invalid_schedule");
    }

    #[test]
    fn delayed_trigger_fires_once_and_can_be_cancelled() {
        let bus = dispatcher();
        let l = Recorder::arc("l");
        bus.subscribe(l.clone() as ListenerRef, "Later").expect("subscribe");

        let started = Instant::now();
        let handle = bus
            .trigger_after_delay(value(()), Event::new("Later"), None, Duration::from_millis(100))
            .expect("schedule");
        assert!(l.wait_for(1, WAIT));
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(handle.fired(), 1);

        let cancelled = bus
            .trigger_after_delay(value(()), Event::new("Later"), None, Duration::from_millis(100))
            .expect("schedule");
        cancelled.cancel();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(l.count(), 1);
        assert_eq!(cancelled.fired(), 0);
    }

    #[test]
    fn shutdown_closes_the_bus_and_cancels_schedules() {
        let bus = dispatcher();
        let l: ListenerRef = ListenerFn::arc("l", |_, _| {});
        let pending = bus
            .trigger_after_delay(value(()), Event::new("X"), None, Duration::from_secs(60))
            .expect("schedule");

        bus.shutdown();
        bus.shutdown();

        assert!(bus.is_closed());
        assert!(pending.is_cancelled());
        assert!(matches!(
            bus.trigger(value(()), Event::new("X"), None),
            Err(BusError::Closed)
        ));
        assert!(matches!(bus.subscribe(l, "X"), Err(BusError::Closed)));
        assert!(matches!(
            bus.trigger_after_delay(value(()), Event::new("X"), None, Duration::ZERO),
            Err(BusError::Closed)
        ));
    }

    #[test]
    fn panicking_listener_is_isolated_and_reported() {
        let bus = dispatcher();
        let mut reports = bus.reports();
        let bad: ListenerRef = ListenerFn::arc("bad", |_, _| panic!("listener exploded"));
        let good = Recorder::arc("good");
        bus.subscribe(bad, "Risky").expect("bad");
        bus.subscribe(good.clone() as ListenerRef, "Risky").expect("good");

        bus.trigger(value(()), Event::new("Risky"), None)
            .expect("trigger");
        assert!(good.wait_for(1, WAIT));

        let report = recv_report(&mut reports, WAIT).expect("report");
        assert_eq!(report.kind, ReportKind::ListenerPanicked);
        assert_eq!(report.listener, Some("bad"));
        assert_eq!(report.event_type, Some(EventType::new("Risky")));
        assert_eq!(report.reason.as_deref(), Some("listener exploded"));
    }

    #[test]
    fn panicking_condition_skips_delivery() {
        let bus = dispatcher();
        let mut reports = bus.reports();
        let l = Recorder::arc("l");
        bus.register(
            SubscriptionSpec::new(l.clone() as ListenerRef, "T")
                .with_condition(condition(|_, _, _| panic!("bad condition"))),
        )
        .expect("register");

        bus.trigger(value(()), Event::new("T"), Some(value(1_u8)))
            .expect("trigger");
        let report = recv_report(&mut reports, WAIT).expect("report");
        assert_eq!(report.kind, ReportKind::ConditionPanicked);
        settle();
        assert_eq!(l.count(), 0);
    }

    #[derive(Default)]
    struct CountingExtension {
        inserted: AtomicUsize,
        duplicates: AtomicUsize,
        triggers: AtomicUsize,
    }

    impl Extension for CountingExtension {
        fn after_register(&self, sub: &Subscription, outcome: Registered, snapshot: &RegistrySnapshot) {
            assert!(snapshot.contains_key(sub.event_type()));
            match outcome {
                Registered::Inserted => self.inserted.fetch_add(1, Ordering::SeqCst),
                Registered::AlreadyPresent => self.duplicates.fetch_add(1, Ordering::SeqCst),
            };
        }

        fn after_trigger(&self, _: &Sender, _: &Event, _: Option<&Expression>) {
            self.triggers.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn extension_observes_registrations_and_triggers() {
        let ext = Arc::new(CountingExtension::default());
        let bus = Dispatcher::builder(Config::default())
            .with_extension(ext.clone())
            .build()
            .expect("dispatcher");
        let l: ListenerRef = ListenerFn::arc("l", |_, _| {});

        bus.subscribe(l.clone(), "T").expect("first");
        bus.subscribe(l, "T").expect("second");
        assert_eq!(ext.inserted.load(Ordering::SeqCst), 1);
        assert_eq!(ext.duplicates.load(Ordering::SeqCst), 1);

        bus.trigger(value(()), Event::new("T"), None).expect("trigger");
        let deadline = Instant::now() + WAIT;
        while ext.triggers.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ext.triggers.load(Ordering::SeqCst), 1);
    }

    struct ExplodingExtension;

    impl Extension for ExplodingExtension {
        fn after_register(&self, _: &Subscription, _: Registered, _: &RegistrySnapshot) {
            panic!("hook down");
        }
    }

    #[test]
    fn failing_extension_does_not_fail_registration() {
        let bus = Dispatcher::builder(Config::default())
            .with_extension(Arc::new(ExplodingExtension))
            .build()
            .expect("dispatcher");
        let mut reports = bus.reports();
        let l: ListenerRef = ListenerFn::arc("l", |_, _| {});

        assert_eq!(bus.subscribe(l, "T").expect("register"), Registered::Inserted);
        let report = recv_report(&mut reports, WAIT).expect("report");
        assert_eq!(report.kind, ReportKind::HookFailed);
        assert_eq!(report.reason.as_deref(), Some("after_register: hook down"));
    }

    #[test]
    fn in_flight_limit_serializes_deliveries() {
        let bus = Dispatcher::new(Config {
            max_in_flight: 1,
            ..Config::default()
        })
        .expect("dispatcher");

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Recorder::arc("done");

        for _ in 0..3 {
            let running = running.clone();
            let peak = peak.clone();
            let done = done.clone();
            let l: ListenerRef = ListenerFn::arc("slow", move |s, e| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                running.fetch_sub(1, Ordering::SeqCst);
                done.event_triggered(s, e);
            });
            bus.subscribe(l, "Work").expect("subscribe");
        }

        bus.trigger(value(()), Event::new("Work"), None).expect("trigger");
        assert!(done.wait_for(3, WAIT));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    struct AsyncRecorder {
        inner: Arc<Recorder>,
    }

    #[async_trait]
    impl AsyncListener for AsyncRecorder {
        async fn on_event(&self, sender: &Sender, event: &Event) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inner.event_triggered(sender, event);
        }

        fn name(&self) -> &'static str {
            "async-recorder"
        }
    }

    #[test]
    fn async_listeners_are_delivered_on_the_runtime() {
        let bus = dispatcher();
        let rec = Recorder::arc("rec");
        let l: AsyncListenerRef = Arc::new(AsyncRecorder { inner: rec.clone() });
        bus.subscribe(l, "Async").expect("subscribe");

        bus.trigger(value(()), Event::new("Async"), None)
            .expect("trigger");
        assert!(rec.wait_for(1, WAIT));
    }

    #[test]
    fn listeners_may_trigger_from_inside_a_delivery() {
        let bus = dispatcher();
        let second = Recorder::arc("second");
        bus.subscribe(second.clone() as ListenerRef, "Second")
            .expect("second");

        let relay_bus = bus.clone();
        let relay: ListenerRef = ListenerFn::arc("relay", move |s, _| {
            let _ = relay_bus.trigger(s.clone(), Event::new("Second"), None);
        });
        bus.subscribe(relay, "First").expect("relay");

        bus.trigger(value(()), Event::new("First"), None)
            .expect("trigger");
        assert!(second.wait_for(1, WAIT));

        // the relay keeps a handle, so drop alone would not stop the runtime
        bus.shutdown();
    }
}
