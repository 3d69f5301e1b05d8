//! # Delayed and periodic triggers.
//!
//! Every schedule runs as one task on the dispatcher's runtime and owns a child
//! of the dispatcher's root [`CancellationToken`]:
//!
//! ```text
//! root token (Dispatcher::shutdown)
//!   ├─ child ─► once:     sleep(delay) ─► dispatch
//!   └─ child ─► periodic: tick(initial) ─► dispatch ─► tick(+period) ─► dispatch ─► ...
//! ```
//!
//! ## Rules
//! - Each firing snapshots the registry anew; subscribers added later receive later firings.
//! - Missed periodic ticks are delayed, never bursted.
//! - Cancelling a [`ScheduleHandle`] stops future firings; a delivery already
//!   submitted still completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::delivery::{Delivery, Shared};

/// Stand-in deadline for delays that overflow `Instant` (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Handle to a delayed or periodic trigger.
///
/// Cloning is cheap; all clones control the same schedule. Dropping the handle
/// does **not** cancel the schedule.
#[derive(Clone, Debug)]
pub struct ScheduleHandle {
    token: CancellationToken,
    fired: Arc<AtomicU64>,
}

impl ScheduleHandle {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stops further firings. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the schedule was cancelled (directly or by shutdown).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of times the trigger has fired so far.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }
}

/// Fires `delivery` once after `delay`.
pub(crate) fn once(
    shared: &Arc<Shared>,
    parent: &CancellationToken,
    delivery: Arc<Delivery>,
    delay: Duration,
) -> ScheduleHandle {
    let handle = ScheduleHandle::new(parent.child_token());
    let token = handle.token.clone();
    let fired = Arc::clone(&handle.fired);
    let me = Arc::clone(shared);

    shared.handle().spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = time::sleep(delay) => {
                fired.fetch_add(1, Ordering::AcqRel);
                me.dispatch(delivery);
            }
        }
    });
    handle
}

/// Fires `delivery` after `initial_delay`, then every `period`.
pub(crate) fn periodic(
    shared: &Arc<Shared>,
    parent: &CancellationToken,
    delivery: Arc<Delivery>,
    initial_delay: Duration,
    period: Duration,
) -> ScheduleHandle {
    let handle = ScheduleHandle::new(parent.child_token());
    let token = handle.token.clone();
    let fired = Arc::clone(&handle.fired);
    let me = Arc::clone(shared);

    shared.handle().spawn(async move {
        let mut ticks = time::interval_at(first_tick(initial_delay), period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    fired.fetch_add(1, Ordering::AcqRel);
                    me.dispatch(Arc::clone(&delivery));
                }
            }
        }
        tracing::debug!(
            event_type = %delivery.event.event_type,
            fired = fired.load(Ordering::Acquire),
            "periodic trigger stopped"
        );
    });
    handle
}

/// Start instant of a periodic schedule; saturates instead of overflowing.
fn first_tick(initial_delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(initial_delay)
        .unwrap_or_else(|| now + FAR_FUTURE)
}
