//! # Blocking watchers.
//!
//! Watchers turn "an event happened" into something a plain thread can wait on.
//! Each watcher registers ordinary internal listeners and parks the waiting
//! thread on a private `parking_lot::Condvar` until a delivery arrives or an
//! absolute deadline passes.
//!
//! - [`EventWatcher`]: one event type, one trigger.
//! - [`MultiEventWatcher`]: several (event type, condition) pairs, any/all.
//!
//! ## Rules
//! - `Duration::ZERO` as timeout means "wait forever".
//! - Watcher listeners never block. They run on runtime workers and bypass
//!   `max_in_flight`, so a listener waiting on a watcher cannot starve it.
//! - Dropping a watcher unregisters its listeners.
//! - Waiting blocks the thread: never call it from an async task.

mod event_watcher;
mod multi;

pub use event_watcher::{EventWatcher, WatchState};
pub use multi::MultiEventWatcher;

use std::time::{Duration, Instant};

/// Converts a timeout into an absolute deadline; `None` means unbounded.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    if timeout.is_zero() {
        None
    } else {
        Instant::now().checked_add(timeout)
    }
}
