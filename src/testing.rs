//! Test helpers shared by in-crate tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::{Config, Dispatcher};
use crate::events::{Event, Sender};
use crate::subscribers::Listener;

/// Listener that records every delivery and lets a test wait for a count.
pub(crate) struct Recorder {
    name: &'static str,
    seen: Mutex<Vec<(Sender, Event)>>,
    cv: Condvar,
}

impl Recorder {
    pub(crate) fn arc(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            seen: Mutex::new(Vec::new()),
            cv: Condvar::new(),
        })
    }

    /// Waits until at least `n` deliveries were recorded; returns whether that happened.
    pub(crate) fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut seen = self.seen.lock();
        while seen.len() < n {
            if self.cv.wait_until(&mut seen, deadline).timed_out() {
                break;
            }
        }
        seen.len() >= n
    }

    pub(crate) fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.seen.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn senders(&self) -> Vec<Sender> {
        self.seen.lock().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl Listener for Recorder {
    fn event_triggered(&self, sender: &Sender, event: &Event) {
        self.seen.lock().push((sender.clone(), event.clone()));
        self.cv.notify_all();
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Small dispatcher for tests.
pub(crate) fn dispatcher() -> Dispatcher {
    Dispatcher::new(Config {
        worker_threads: 2,
        delivery_threads: 16,
        ..Config::default()
    })
    .expect("dispatcher")
}

/// Lets in-flight deliveries finish before asserting that nothing arrived.
pub(crate) fn settle() {
    std::thread::sleep(Duration::from_millis(150));
}
