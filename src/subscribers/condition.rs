//! # Delivery conditions.
//!
//! A [`Condition`] filters deliveries for one subscription. It is evaluated per
//! trigger with the sender, the event, and the conditional expression supplied
//! by the producer.
//!
//! ## Rules
//! - A subscription **without** a condition receives every event of its type.
//! - A subscription **with** a condition is only invoked when the trigger carries
//!   an expression **and** [`Condition::matches`] returns `true`.
//! - Conditions run on the delivery thread, never under the registry lock.
//! - A panicking condition skips the delivery and is reported as
//!   [`ReportKind::ConditionPanicked`](crate::ReportKind::ConditionPanicked).
//!
//! ## Example
//! ```rust
//! use eventvisor::subscribers::when_expression;
//!
//! struct Payment { amount: u64 }
//!
//! // Only deliver when the expression is a `Payment` above 100.
//! let large = when_expression(|p: &Payment| p.amount > 100);
//! # let _ = large;
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::events::{Event, Expression, Sender};

/// Predicate deciding whether a subscription receives a triggered event.
///
/// Implemented for every `Fn(&Sender, &Event, &Expression) -> bool` closure.
pub trait Condition: Send + Sync + 'static {
    /// Returns `true` if the subscription should receive `event`.
    fn matches(&self, sender: &Sender, event: &Event, expression: &Expression) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&Sender, &Event, &Expression) -> bool + Send + Sync + 'static,
{
    fn matches(&self, sender: &Sender, event: &Event, expression: &Expression) -> bool {
        self(sender, event, expression)
    }
}

/// Shared handle to a condition.
pub type ConditionRef = Arc<dyn Condition>;

/// Wraps a closure into a [`ConditionRef`].
pub fn condition<F>(f: F) -> ConditionRef
where
    F: Fn(&Sender, &Event, &Expression) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds a condition that downcasts the expression to `T` and applies `predicate`.
///
/// Expressions of any other type never match.
pub fn when_expression<T, F>(predicate: F) -> ConditionRef
where
    T: Any,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(move |_: &Sender, _: &Event, expression: &Expression| {
        expression.downcast_ref::<T>().is_some_and(&predicate)
    })
}
