//! # Function-backed listener (`ListenerFn`)
//!
//! [`ListenerFn`] wraps a closure `F: Fn(&Sender, &Event)` so simple listeners do
//! not need a dedicated type.
//!
//! ## Concurrency semantics
//! - The closure may be called concurrently from several pool threads.
//! - There is no hidden state; if you need shared state, capture an `Arc<...>`
//!   explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use eventvisor::{ListenerFn, ListenerRef};
//!
//! let l: ListenerRef = ListenerFn::arc("printer", |_sender, event| {
//!     println!("got {}", event.event_type);
//! });
//!
//! assert_eq!(l.name(), "printer");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::events::{Event, Sender};
use crate::subscribers::listener::Listener;

/// Function-backed listener implementation.
pub struct ListenerFn<F> {
    name: &'static str,
    f: F,
}

impl<F> ListenerFn<F>
where
    F: Fn(&Sender, &Event) + Send + Sync + 'static,
{
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`ListenerFn::arc`] when you immediately need a [`ListenerRef`](crate::ListenerRef).
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Listener for ListenerFn<F>
where
    F: Fn(&Sender, &Event) + Send + Sync + 'static,
{
    fn event_triggered(&self, sender: &Sender, event: &Event) {
        (self.f)(sender, event);
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for ListenerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerFn").field("name", &self.name).finish()
    }
}
