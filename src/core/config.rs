//! # Global dispatcher configuration.
//!
//! Provides [`Config`], the centralized settings for the dispatcher runtime.
//!
//! Config is consumed once, at `Dispatcher::new(config)` /
//! `Dispatcher::builder(config).build()`; changing it afterwards has no effect.
//!
//! ## Sentinel values
//! - `worker_threads = 0` → one runtime worker per CPU core
//! - `delivery_threads = 0` → `cores × 32` blocking-pool threads
//! - `max_in_flight = 0` → unlimited (no semaphore created)

use std::thread;

/// Blocking-pool threads per core when `delivery_threads = 0`.
pub const DELIVERY_THREADS_PER_CORE: usize = 32;

/// Global configuration for the dispatcher runtime.
///
/// ## Field semantics
/// - `worker_threads`: async workers (timers, async listeners; `0` = cores)
/// - `delivery_threads`: upper bound of the blocking pool that runs [`Listener`](crate::Listener)s
/// - `max_in_flight`: deliveries running at once (`0` = unlimited)
/// - `report_capacity`: report bus ring buffer size (min 1)
/// - `thread_name`: prefix for runtime threads
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of async runtime workers.
    ///
    /// - `0` = one per available core
    /// - `n > 0` = exactly `n`
    pub worker_threads: usize,

    /// Maximum number of blocking-pool threads running listeners.
    ///
    /// Blocking listeners may sleep or do I/O; each one occupies a thread for the
    /// duration of its call. `0` = `cores × DELIVERY_THREADS_PER_CORE`.
    pub delivery_threads: usize,

    /// Maximum number of deliveries executing concurrently.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = further deliveries wait for a permit
    ///
    /// Applied across blocking and async listeners alike.
    pub max_in_flight: usize,

    /// Capacity of the report broadcast channel.
    ///
    /// Slow report consumers that lag behind more than `report_capacity` reports
    /// receive `Lagged` and skip older items.
    pub report_capacity: usize,

    /// Thread name prefix for runtime workers and the blocking pool.
    pub thread_name: String,
}

impl Config {
    fn cores() -> usize {
        thread::available_parallelism().map_or(1, |n| n.get())
    }

    /// Returns the effective number of runtime workers.
    #[inline]
    pub fn worker_threads_resolved(&self) -> usize {
        if self.worker_threads == 0 {
            Self::cores()
        } else {
            self.worker_threads
        }
    }

    /// Returns the effective blocking-pool size.
    #[inline]
    pub fn delivery_threads_resolved(&self) -> usize {
        if self.delivery_threads == 0 {
            Self::cores().saturating_mul(DELIVERY_THREADS_PER_CORE)
        } else {
            self.delivery_threads
        }
    }

    /// Returns the in-flight limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` deliveries run at once
    #[inline]
    pub fn in_flight_limit(&self) -> Option<usize> {
        if self.max_in_flight == 0 {
            None
        } else {
            Some(self.max_in_flight)
        }
    }

    /// Returns a report capacity clamped to a minimum of 1.
    #[inline]
    pub fn report_capacity_clamped(&self) -> usize {
        self.report_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `worker_threads = 0` (one per core)
    /// - `delivery_threads = 0` (cores × 32)
    /// - `max_in_flight = 0` (unlimited)
    /// - `report_capacity = 1024`
    /// - `thread_name = "eventvisor"`
    fn default() -> Self {
        Self {
            worker_threads: 0,
            delivery_threads: 0,
            max_in_flight: 0,
            report_capacity: 1024,
            thread_name: "eventvisor".to_string(),
        }
    }
}
