//! # LogWriter: event logger
//!
//! A minimal listener that logs every delivered [`Event`] through `tracing`.
//! Use it for tests, demos, or to trace one event type while debugging.
//!
//! ## Example output (with a fmt subscriber installed)
//! ```text
//! INFO eventvisor: event delivered event_type=OrderPlaced seq=12 payload=true
//! ```

use crate::events::{Event, Sender};
use crate::subscribers::Listener;

/// Event logger listener.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Listener for LogWriter {
    fn event_triggered(&self, _sender: &Sender, e: &Event) {
        tracing::info!(
            event_type = %e.event_type,
            seq = e.seq,
            payload = e.payload.is_some(),
            "event delivered"
        );
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::value;

    #[test]
    fn logs_without_an_installed_subscriber() {
        let w = LogWriter::new();
        w.event_triggered(&value(()), &Event::new("OrderPlaced").with_payload(1_u8));
        assert_eq!(w.name(), "LogWriter");
    }
}
