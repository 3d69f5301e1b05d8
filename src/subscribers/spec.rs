//! # Subscription specification.
//!
//! [`SubscriptionSpec`] bundles everything a registration needs:
//! - the listener ([`Handler`])
//! - the event type
//! - an optional [`Condition`](crate::subscribers::Condition)
//! - an optional [`ContextKey`] for bulk teardown
//!
//! The spec is passed to [`Dispatcher::register`](crate::Dispatcher::register).
//!
//! ## Example
//! ```rust
//! use eventvisor::{ContextKey, ListenerFn, ListenerRef, SubscriptionSpec};
//! use eventvisor::subscribers::when_expression;
//!
//! struct Payment { amount: u64 }
//!
//! let l: ListenerRef = ListenerFn::arc("large-payments", |_, _| {});
//!
//! let spec = SubscriptionSpec::new(l, "PaymentReceived")
//!     .with_condition(when_expression(|p: &Payment| p.amount > 100))
//!     .with_context("batch-7");
//!
//! assert!(spec.condition().is_some());
//! assert_eq!(spec.context(), Some(&ContextKey::from("batch-7")));
//! ```

use std::fmt;

use crate::core::ContextKey;
use crate::events::EventType;
use crate::subscribers::condition::ConditionRef;
use crate::subscribers::listener::Handler;
use crate::subscribers::subscription::Subscription;

/// Specification for registering a listener.
#[derive(Clone)]
pub struct SubscriptionSpec {
    handler: Handler,
    event_type: EventType,
    condition: Option<ConditionRef>,
    context: Option<ContextKey>,
}

impl SubscriptionSpec {
    /// Creates a spec without condition and without context.
    pub fn new(handler: impl Into<Handler>, event_type: impl Into<EventType>) -> Self {
        Self {
            handler: handler.into(),
            event_type: event_type.into(),
            condition: None,
            context: None,
        }
    }

    /// Returns a new spec with the given condition.
    pub fn with_condition(mut self, condition: ConditionRef) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns a new spec with an optional condition.
    pub fn with_condition_opt(mut self, condition: Option<ConditionRef>) -> Self {
        self.condition = condition;
        self
    }

    /// Returns a new spec recorded under the given context.
    pub fn with_context(mut self, context: impl Into<ContextKey>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns the event type.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Returns the condition, if configured.
    pub fn condition(&self) -> Option<&ConditionRef> {
        self.condition.as_ref()
    }

    /// Returns the context, if configured.
    pub fn context(&self) -> Option<&ContextKey> {
        self.context.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Subscription, Option<ContextKey>) {
        (
            Subscription::new(self.handler, self.event_type, self.condition),
            self.context,
        )
    }
}

impl fmt::Debug for SubscriptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSpec")
            .field("handler", &self.handler)
            .field("event_type", &self.event_type)
            .field("conditional", &self.condition.is_some())
            .field("context", &self.context)
            .finish()
    }
}
