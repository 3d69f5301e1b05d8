//! # Delivery engine.
//!
//! [`Shared`] is the part of the dispatcher that background work can hold on to:
//! spawned deliveries and schedules keep an `Arc<Shared>`, never the dispatcher
//! itself, so dropping the last [`Dispatcher`](crate::Dispatcher) still shuts
//! the runtime down.
//!
//! ## Architecture
//! ```text
//! dispatch(delivery)
//!     │  snapshot_for(event_type)            (registry lock, then released)
//!     ├──► sub 1 ──► [blocking pool] ──► condition? ──► listener.event_triggered()
//!     │                                     └─ panic → ConditionPanicked
//!     ├──► sub 2 ──► [runtime task]  ──► condition? ──► listener.on_event().await
//!     │                                                    └─ panic → ListenerPanicked
//!     └──► extension.after_trigger()  [blocking pool]       └─ panic → HookFailed
//! ```
//!
//! ## Rules
//! - One task per (trigger, subscription); no ordering between them.
//! - Conditions are evaluated inside the delivery task, off the producer thread.
//! - With `max_in_flight > 0`, every delivery first waits for a semaphore permit
//!   and holds it until the listener returns.
//! - Listeners that declare [`Listener::is_non_blocking`](crate::Listener::is_non_blocking)
//!   (the watchers' internal listeners) skip the permit and the blocking pool; they
//!   run directly on a runtime worker.
//!
//! **Warning**: panics are caught with `AssertUnwindSafe`; a listener that panics
//! while holding a lock on its own state may leave that state inconsistent.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::core::extension::ExtensionRef;
use crate::core::registry::Registry;
use crate::events::{panic_message, Event, EventType, Expression, Report, ReportBus, ReportKind, Sender};
use crate::subscribers::{Handler, Registered, Subscription};

/// One trigger: what every matching subscription receives.
pub(crate) struct Delivery {
    pub(crate) sender: Sender,
    pub(crate) event: Event,
    pub(crate) expression: Option<Expression>,
}

impl Delivery {
    pub(crate) fn new(sender: Sender, event: Event, expression: Option<Expression>) -> Arc<Self> {
        Arc::new(Self {
            sender,
            event,
            expression,
        })
    }
}

/// State shared between the dispatcher façade and its background work.
pub(crate) struct Shared {
    pub(crate) registry: Registry,
    pub(crate) reports: ReportBus,
    extension: Option<ExtensionRef>,
    semaphore: Option<Arc<Semaphore>>,
    handle: Handle,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn new(
        reports: ReportBus,
        extension: Option<ExtensionRef>,
        semaphore: Option<Arc<Semaphore>>,
        handle: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Registry::new(),
            reports,
            extension,
            semaphore,
            handle,
            closed: AtomicBool::new(false),
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Marks the engine closed; returns `false` if it already was.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Snapshots matching subscriptions and submits one delivery task per match.
    pub(crate) fn dispatch(self: &Arc<Self>, delivery: Arc<Delivery>) {
        if self.is_closed() {
            return;
        }

        let subs = self.registry.snapshot_for(&delivery.event.event_type);
        tracing::debug!(
            event_type = %delivery.event.event_type,
            seq = delivery.event.seq,
            matches = subs.len(),
            "event triggered"
        );

        for sub in subs {
            self.submit(sub, Arc::clone(&delivery));
        }

        if let Some(ext) = &self.extension {
            let ext = Arc::clone(ext);
            let me = Arc::clone(self);
            self.handle.spawn_blocking(move || {
                let d = &delivery;
                let res = panic::catch_unwind(AssertUnwindSafe(|| {
                    ext.after_trigger(&d.sender, &d.event, d.expression.as_ref())
                }));
                if let Err(panic_err) = res {
                    me.report_hook_failure(
                        "after_trigger",
                        &d.event.event_type,
                        panic_message(&*panic_err),
                    );
                }
            });
        }
    }

    /// Runs the extension's `after_register` on the caller's thread.
    pub(crate) fn after_register(&self, sub: &Subscription, outcome: Registered) {
        let Some(ext) = &self.extension else {
            return;
        };
        let snapshot = self.registry.snapshot();
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            ext.after_register(sub, outcome, &snapshot)
        }));
        if let Err(panic_err) = res {
            self.report_hook_failure("after_register", sub.event_type(), panic_message(&*panic_err));
        }
    }

    fn submit(self: &Arc<Self>, sub: Subscription, delivery: Arc<Delivery>) {
        let me = Arc::clone(self);

        // never blocks: no permit, no blocking-pool thread
        if sub.handler().is_non_blocking() {
            self.handle
                .spawn(async move { me.deliver_blocking(&sub, &delivery) });
            return;
        }

        let Some(sem) = &self.semaphore else {
            if sub.handler().is_async() {
                self.handle
                    .spawn(async move { me.deliver_async(&sub, &delivery).await });
            } else {
                self.handle
                    .spawn_blocking(move || me.deliver_blocking(&sub, &delivery));
            }
            return;
        };

        let sem = Arc::clone(sem);
        self.handle.spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            if sub.handler().is_async() {
                me.deliver_async(&sub, &delivery).await;
            } else {
                let _ = tokio::task::spawn_blocking(move || me.deliver_blocking(&sub, &delivery)).await;
            }
        });
    }

    fn deliver_blocking(&self, sub: &Subscription, d: &Delivery) {
        if !self.accepts(sub, d) {
            return;
        }
        let Handler::Blocking(listener) = sub.handler() else {
            return;
        };
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            listener.event_triggered(&d.sender, &d.event)
        }));
        if let Err(panic_err) = res {
            self.report_panic(ReportKind::ListenerPanicked, sub, &d.event, panic_message(&*panic_err));
        }
    }

    async fn deliver_async(&self, sub: &Subscription, d: &Delivery) {
        if !self.accepts(sub, d) {
            return;
        }
        let Handler::Async(listener) = sub.handler() else {
            return;
        };
        let fut = listener.on_event(&d.sender, &d.event);
        if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
            self.report_panic(ReportKind::ListenerPanicked, sub, &d.event, panic_message(&*panic_err));
        }
    }

    fn accepts(&self, sub: &Subscription, d: &Delivery) -> bool {
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            sub.accepts(&d.sender, &d.event, d.expression.as_ref())
        }));
        match res {
            Ok(accepted) => accepted,
            Err(panic_err) => {
                self.report_panic(ReportKind::ConditionPanicked, sub, &d.event, panic_message(&*panic_err));
                false
            }
        }
    }

    fn report_panic(&self, kind: ReportKind, sub: &Subscription, event: &Event, reason: String) {
        tracing::warn!(
            listener = sub.listener_name(),
            event_type = %event.event_type,
            seq = event.seq,
            %reason,
            "delivery panicked"
        );
        self.reports.publish(
            Report::new(kind)
                .with_listener(sub.listener_name())
                .with_event_type(event.event_type.clone())
                .with_reason(reason),
        );
    }

    fn report_hook_failure(&self, stage: &'static str, event_type: &EventType, reason: String) {
        tracing::warn!(hook = stage, event_type = %event_type, %reason, "extension hook panicked");
        self.reports.publish(
            Report::new(ReportKind::HookFailed)
                .with_event_type(event_type.clone())
                .with_reason(format!("{stage}: {reason}")),
        );
    }
}
