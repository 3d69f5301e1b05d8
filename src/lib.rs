//! # eventvisor
//!
//! **Eventvisor** is an in-process event bus for Rust.
//!
//! Components register listeners for event types, optionally filtered by a
//! condition and grouped under a context. Producers trigger events immediately,
//! after a delay, or periodically; every matching listener runs off the
//! producer's thread. Threads that need to wait for an event can block on a
//! watcher with a timeout.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer threads                                   plain threads
//!   ─────────────────                                  ─────────────
//!   trigger / trigger_after_delay /                    EventWatcher / MultiEventWatcher
//!   trigger_periodically                                     │ (internal listeners)
//!        │                                                   │
//!        ▼                                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - Registry   (EventType → {(ListenerId, EventType) → Subscription})│
//! │  - Contexts   (ContextKey → [subscription keys])                  │
//! │  - Runtime    (workers + bounded blocking pool)                   │
//! │  - ReportBus  (listener / condition / hook failures)              │
//! │  - root CancellationToken (all schedules)                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────────┐
//!   │ delivery │       │ delivery │       │ after_trigger│
//!   │ cond? ─► │       │ cond? ─► │       │  (Extension) │
//!   │ Listener │       │ Async    │       └──────────────┘
//!   └──────────┘       │ Listener │
//!                      └──────────┘
//! ```
//!
//! ### Delivery rules
//! ```text
//! trigger(sender, event, expression?)
//!   for sub in snapshot(event.event_type):
//!     ├─ sub.condition == None                 ─► deliver
//!     ├─ sub.condition != None, expression None ─► skip
//!     └─ condition.matches(sender, event, expr) ─► deliver / skip
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Listeners**     | Blocking and async callbacks, closure adapter.                | [`Listener`], [`AsyncListener`], [`ListenerFn`] |
//! | **Registration**  | Conditions, contexts, dedup by (listener, event type).        | [`SubscriptionSpec`], [`Condition`], [`ContextKey`] |
//! | **Dispatch**      | Immediate, delayed, periodic triggers with cancellation.      | [`Dispatcher`], [`ScheduleHandle`]          |
//! | **Waiting**       | Block a thread until one / any / all events arrive.           | [`EventWatcher`], [`MultiEventWatcher`]     |
//! | **Failures**      | Typed API errors, broadcast reports for isolated panics.      | [`BusError`], [`Report`]                    |
//! | **Extension**     | Observe every registration and trigger.                       | [`Extension`]                               |
//! | **Configuration** | Pool sizes, in-flight limit, report capacity.                 | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use eventvisor::{
//!     value, Config, ContextKey, Dispatcher, Event, ListenerFn, ListenerRef, SubscriptionSpec,
//! };
//! use eventvisor::subscribers::when_expression;
//!
//! struct Payment { amount: u64 }
//!
//! let bus = Dispatcher::new(Config::default()).unwrap();
//!
//! let large: ListenerRef = ListenerFn::arc("large-payments", |_, ev| {
//!     println!("large payment #{}", ev.seq);
//! });
//! bus.register(
//!     SubscriptionSpec::new(large, "PaymentReceived")
//!         .with_condition(when_expression(|p: &Payment| p.amount > 100))
//!         .with_context("batch-7"),
//! )
//! .unwrap();
//!
//! bus.trigger(value("gateway"), Event::new("PaymentReceived"), Some(value(Payment { amount: 150 })))
//!     .unwrap();
//!
//! assert_eq!(bus.unregister_all_for_context(ContextKey::from("batch-7")), 1);
//! bus.shutdown();
//! ```

pub mod core;
pub mod error;
pub mod events;
pub mod subscribers;
pub mod watchers;

#[cfg(test)]
mod testing;

pub use crate::core::{
    Config, ContextKey, Dispatcher, DispatcherBuilder, Extension, ExtensionRef, RegistrySnapshot,
    ScheduleHandle,
};
pub use error::BusError;
pub use events::{value, Event, EventType, Expression, Report, ReportKind, Sender, Value};
pub use subscribers::{
    AsyncListener, AsyncListenerRef, Condition, ConditionRef, Handler, Listener, ListenerFn,
    ListenerId, ListenerRef, Registered, Subscription, SubscriptionSpec,
};
pub use watchers::{EventWatcher, MultiEventWatcher, WatchState};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
