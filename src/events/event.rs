//! # Events published through the dispatcher.
//!
//! An [`Event`] is an immutable value made of an [`EventType`] (the category used
//! for subscription matching) and an optional, arbitrary payload. Producers create
//! events and hand them to [`Dispatcher::trigger`](crate::Dispatcher::trigger);
//! every listener receives its own clone.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically at construction time. Delivery order across subscribers is not
//! guaranteed; use `seq` if you need to restore creation order.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, EventType};
//!
//! #[derive(Debug, PartialEq)]
//! struct Order { id: u64 }
//!
//! let ev = Event::new("OrderPlaced").with_payload(Order { id: 1 });
//!
//! assert_eq!(ev.event_type, EventType::new("OrderPlaced"));
//! assert_eq!(ev.payload_as::<Order>(), Some(&Order { id: 1 }));
//! ```

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Type-erased shared value used for payloads, senders and conditional expressions.
pub type Value = Arc<dyn Any + Send + Sync>;

/// The object that triggered an event.
pub type Sender = Value;

/// Extra value supplied at trigger time and checked by subscription conditions.
pub type Expression = Value;

/// Wraps any value into a [`Value`].
///
/// ```rust
/// let sender = eventvisor::value("checkout-service");
/// assert_eq!(sender.downcast_ref::<&str>(), Some(&"checkout-service"));
/// ```
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// Stable identifier for a category of events.
///
/// Compared and hashed by name; cloning is cheap (`Arc<str>`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Arc<str>);

impl EventType {
    /// Creates an event type from its name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the event type name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&EventType> for EventType {
    fn from(ty: &EventType) -> Self {
        ty.clone()
    }
}

impl Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Event instance with optional payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `payload`: arbitrary value, read it with [`Event::payload_as`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification used for subscription matching.
    pub event_type: EventType,
    /// Attached payload, if any.
    pub payload: Option<Value>,
}

impl Event {
    /// Creates a new event of the given type with current timestamp and next sequence number.
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            event_type: event_type.into(),
            payload: None,
        }
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Attaches an already shared payload.
    #[inline]
    pub fn with_shared_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns the payload downcast to `T`, or `None` if absent or of another type.
    #[inline]
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    /// Returns true if the event is of the given type.
    #[inline]
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type.name() == event_type
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("event_type", &self.event_type)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
