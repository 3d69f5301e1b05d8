//! # Subscription records.
//!
//! A [`Subscription`] binds one [`Handler`] to one [`EventType`] with an optional
//! [`Condition`](crate::subscribers::Condition). It is immutable: unregistering
//! removes it, nothing edits it in place.
//!
//! ## Deduplication
//! The registry keys subscriptions by [`SubscriptionKey`] = (listener identity,
//! event type). The condition is **not** part of the key:
//! ```text
//! register(L, OrderPlaced, cond_a)  → Inserted
//! register(L, OrderPlaced, cond_b)  → AlreadyPresent (cond_a stays in effect)
//! unregister(L, OrderPlaced)        → removed
//! register(L, OrderPlaced, cond_b)  → Inserted (cond_b now in effect)
//! ```

use std::fmt;

use crate::events::{Event, EventType, Expression, Sender};
use crate::subscribers::condition::ConditionRef;
use crate::subscribers::listener::{Handler, ListenerId};

/// Deduplication key of a subscription: (listener identity, event type).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionKey {
    listener: ListenerId,
    event_type: EventType,
}

impl SubscriptionKey {
    /// Creates a key for `listener` on `event_type`.
    pub fn new(listener: ListenerId, event_type: EventType) -> Self {
        Self {
            listener,
            event_type,
        }
    }

    /// Returns the listener identity.
    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Returns the event type.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }
}

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// A new subscription was stored.
    Inserted,
    /// A subscription with the same key already existed and was kept unchanged.
    AlreadyPresent,
}

/// Binding of one listener to one event type, with an optional filter.
#[derive(Clone)]
pub struct Subscription {
    handler: Handler,
    event_type: EventType,
    condition: Option<ConditionRef>,
}

impl Subscription {
    /// Creates a subscription.
    pub fn new(handler: Handler, event_type: EventType, condition: Option<ConditionRef>) -> Self {
        Self {
            handler,
            event_type,
            condition,
        }
    }

    /// Returns the deduplication key.
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.handler.id(), self.event_type.clone())
    }

    /// Returns the registered handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns the listener identity.
    pub fn listener_id(&self) -> ListenerId {
        self.handler.id()
    }

    /// Returns the listener name.
    pub fn listener_name(&self) -> &'static str {
        self.handler.name()
    }

    /// Returns the subscribed event type.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Returns the condition, if any.
    pub fn condition(&self) -> Option<&ConditionRef> {
        self.condition.as_ref()
    }

    /// Decides whether a trigger should be delivered to this subscription.
    ///
    /// - no condition → always
    /// - condition but no expression → never
    /// - condition and expression → `condition.matches(..)`
    pub fn accepts(&self, sender: &Sender, event: &Event, expression: Option<&Expression>) -> bool {
        match (&self.condition, expression) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(cond), Some(expr)) => cond.matches(sender, event, expr),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.handler.name())
            .field("event_type", &self.event_type)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}
