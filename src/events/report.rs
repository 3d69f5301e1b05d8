//! # Failure reports emitted by the dispatcher.
//!
//! Listener code and extension hooks run inside the dispatcher, so their
//! failures cannot be returned to the producer. They are caught, logged, and
//! published as [`Report`]s on the report bus instead
//! (see [`Dispatcher::reports`](crate::Dispatcher::reports)).
//!
//! ## Example
//! ```rust
//! use eventvisor::{Report, ReportKind};
//!
//! let r = Report::new(ReportKind::ListenerPanicked)
//!     .with_listener("audit")
//!     .with_reason("boom");
//!
//! assert_eq!(r.kind, ReportKind::ListenerPanicked);
//! assert_eq!(r.listener, Some("audit"));
//! assert_eq!(r.reason.as_deref(), Some("boom"));
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::events::EventType;

/// Global sequence counter for report ordering.
static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// A listener panicked while handling an event.
    ///
    /// Sets:
    /// - `listener`: listener name
    /// - `event_type`: the delivered event type
    /// - `reason`: panic message
    ListenerPanicked,

    /// A subscription condition panicked while being evaluated.
    ///
    /// The delivery is skipped. Sets the same fields as `ListenerPanicked`.
    ConditionPanicked,

    /// The extension hook panicked.
    ///
    /// Sets:
    /// - `event_type`: type being registered or triggered
    /// - `reason`: `"after_register: ..."` or `"after_trigger: ..."`
    HookFailed,
}

/// Failure report with optional metadata.
#[derive(Debug, Clone)]
pub struct Report {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Report classification.
    pub kind: ReportKind,
    /// Name of the listener involved, if applicable.
    pub listener: Option<&'static str>,
    /// Event type involved, if applicable.
    pub event_type: Option<EventType>,
    /// Human-readable reason (panic message).
    pub reason: Option<Arc<str>>,
}

impl Report {
    /// Creates a new report of the given kind with current timestamp and next sequence number.
    pub fn new(kind: ReportKind) -> Self {
        Self {
            seq: REPORT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            listener: None,
            event_type: None,
            reason: None,
        }
    }

    /// Attaches a listener name.
    #[inline]
    pub fn with_listener(mut self, listener: &'static str) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Attaches the event type.
    #[inline]
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.kind {
            ReportKind::ListenerPanicked => "listener_panicked",
            ReportKind::ConditionPanicked => "condition_panicked",
            ReportKind::HookFailed => "hook_failed",
        }
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
