//! # Failure reports.
//!
//! A delivery that goes wrong cannot return an error to whoever triggered it:
//! the trigger call returned long ago. Instead the delivery task publishes a
//! [`Report`] naming the listener, the event type and the panic message, and
//! anyone holding a receiver from [`Dispatcher::reports`](crate::Dispatcher::reports)
//! can react to it.
//!
//! ```text
//! delivery task ── panic caught ──► tracing::warn!
//!                                └─► ReportBus::publish ──► rx 1, rx 2, ...
//! ```
//!
//! `publish` is fire-and-forget, so a report never stalls or fails the delivery
//! that produced it. Receivers only see reports published after they
//! subscribed. The buffer holds `report_capacity` reports; a receiver that
//! falls further behind gets `Lagged(n)` and resumes at the oldest report still
//! buffered. The `tracing` line is written either way.

use tokio::sync::broadcast;

use super::report::Report;

/// Fan-out of [`Report`]s to every live receiver. Clones share one channel.
#[derive(Clone, Debug)]
pub struct ReportBus {
    tx: broadcast::Sender<Report>,
}

impl ReportBus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Report>(capacity);
        Self { tx }
    }

    /// Hands `report` to every live receiver; with none, it is discarded.
    pub fn publish(&self, report: Report) {
        let _ = self.tx.send(report);
    }

    /// New receiver; it starts with the next published report.
    pub fn subscribe(&self) -> broadcast::Receiver<Report> {
        self.tx.subscribe()
    }
}
