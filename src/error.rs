//! Error types used by the eventvisor bus.
//!
//! [`BusError`] covers every failure the public API can return. Failures that
//! must never reach the producer (listener panics, extension hook failures) are
//! not errors here; they are logged and published on the report bus instead
//! (see [`ReportKind`](crate::ReportKind)).
//!
//! Like the rest of the crate, the enum provides `as_label` / `as_message`
//! helpers for logs and metrics.

use std::time::Duration;
use thiserror::Error;

use crate::events::EventType;
use crate::subscribers::ListenerId;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// No subscription exists for this listener and event type.
    ///
    /// Returned by `unregister` when the listener was never registered for the
    /// type, was already removed, or when the type has no subscriptions at all.
    #[error("no subscription for {listener} on event type {event_type}")]
    NotFound {
        /// Identity of the listener that was looked up.
        listener: ListenerId,
        /// The event type that was looked up.
        event_type: EventType,
    },

    /// The dispatcher has been shut down and no longer accepts work.
    #[error("event bus is shut down")]
    Closed,

    /// A scheduled trigger was requested with unusable timing.
    #[error("invalid schedule: {reason} (period={period:?})")]
    InvalidSchedule {
        /// What is wrong with the schedule.
        reason: &'static str,
        /// The requested period.
        period: Duration,
    },

    /// The delivery runtime could not be started.
    #[error("failed to start delivery runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::BusError;
    ///
    /// assert_eq!(BusError::Closed.as_label(), "bus_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NotFound { .. } => "subscription_not_found",
            BusError::Closed => "bus_closed",
            BusError::InvalidSchedule { .. } => "invalid_schedule",
            BusError::Runtime(_) => "runtime_start_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::NotFound {
                listener,
                event_type,
            } => format!("not found: listener={listener} event_type={event_type}"),
            BusError::Closed => "bus closed".to_string(),
            BusError::InvalidSchedule { reason, period } => {
                format!("invalid schedule: {reason}; period={period:?}")
            }
            BusError::Runtime(e) => format!("runtime: {e}"),
        }
    }

    /// Indicates whether the error only means "nothing to remove".
    ///
    /// Teardown paths (watchers, context unregistration) treat these as no-ops.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BusError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::{ListenerFn, ListenerRef};

    fn audit() -> ListenerRef {
        ListenerFn::arc("audit", |_, _| {})
    }

    #[test]
    fn labels_are_stable() {
        let l = audit();
        let id = ListenerId::of(&l);
        let nf = BusError::NotFound {
            listener: id,
            event_type: EventType::new("OrderPlaced"),
        };
        assert_eq!(nf.as_label(), "subscription_not_found");
        assert!(nf.is_not_found());
        assert_eq!(
            nf.as_message(),
            format!("not found: listener={id} event_type=OrderPlaced")
        );

        let sched = BusError::InvalidSchedule {
            reason: "period must be non-zero",
            period: Duration::ZERO,
        };
        assert_eq!(sched.as_label(), "invalid_schedule");
        assert!(!sched.is_not_found());
        assert!(!BusError::Closed.is_not_found());
    }

    #[test]
    fn display_includes_event_type() {
        let l = audit();
        let nf = BusError::NotFound {
            listener: ListenerId::of(&l),
            event_type: EventType::new("PaymentReceived"),
        };
        assert!(nf.to_string().contains("PaymentReceived"));
    }
}
