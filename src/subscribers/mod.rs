//! # Listeners, conditions and subscriptions.
//!
//! This module provides what a consumer hands to the dispatcher:
//!
//! ```text
//! SubscriptionSpec
//!   ├─ Handler ──────── Listener (blocking)  /  AsyncListener (async)
//!   ├─ EventType
//!   ├─ Condition?       (sender, event, expression) → bool
//!   └─ ContextKey?      bulk teardown group
//!         │
//!         ▼
//! Dispatcher::register ──► Subscription (immutable, keyed by listener + type)
//! ```
//!
//! ## Implementing listeners
//! ```no_run
//! use std::sync::Arc;
//! use eventvisor::{Dispatcher, Config, Event, Listener, ListenerRef, Sender};
//!
//! struct Metrics;
//!
//! impl Listener for Metrics {
//!     fn event_triggered(&self, _sender: &Sender, event: &Event) {
//!         // increment a counter keyed by event.event_type
//!     }
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//!
//! let bus = Dispatcher::new(Config::default()).unwrap();
//! let metrics: ListenerRef = Arc::new(Metrics);
//! bus.subscribe(metrics, "OrderPlaced").unwrap();
//! ```

mod condition;
mod listener;
mod listener_fn;
mod spec;
mod subscription;

#[cfg(feature = "logging")]
mod embedded;

pub use condition::{condition, when_expression, Condition, ConditionRef};
pub use listener::{AsyncListener, AsyncListenerRef, Handler, Listener, ListenerId, ListenerRef};
pub use listener_fn::ListenerFn;
pub use spec::SubscriptionSpec;
pub use subscription::{Registered, Subscription, SubscriptionKey};

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
