//! # Listener traits.
//!
//! Provides the two callback contracts the dispatcher delivers to:
//! - [`Listener`]: a synchronous callback, run on the dispatcher's blocking pool;
//! - [`AsyncListener`]: an async callback, run as a task on the dispatcher's runtime.
//!
//! Both are wrapped into a [`Handler`] when registered.
//!
//! ## Identity
//! A listener is identified by the address of the `Arc` it was registered
//! through ([`ListenerId`]). Registering the same `Arc` twice for one event type
//! is deduplicated; two separate `Arc`s of the same type are two listeners.
//!
//! ## Rules
//! - Each delivery runs in its own task; there is no ordering between listeners.
//! - Panics are caught per delivery and reported as
//!   [`ReportKind::ListenerPanicked`](crate::ReportKind::ListenerPanicked); other
//!   listeners are unaffected.
//! - A blocking listener may block (it occupies one blocking-pool thread); an async
//!   listener must not.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, Listener, Sender};
//!
//! struct Audit;
//!
//! impl Listener for Audit {
//!     fn event_triggered(&self, _sender: &Sender, event: &Event) {
//!         println!("audit: {} #{}", event.event_type, event.seq);
//!     }
//!
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{Event, Sender};

/// Synchronous event listener.
pub trait Listener: Send + Sync + 'static {
    /// Handles a single delivered event.
    ///
    /// Called from a dispatcher pool thread, never from the producer's thread.
    fn event_triggered(&self, sender: &Sender, event: &Event);

    /// Returns the listener name used in logs and failure reports.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns `true` if the callback never blocks (no I/O, no sleeping, no waiting).
    ///
    /// Such listeners run on a runtime worker instead of the blocking pool and
    /// bypass `Config::max_in_flight`, so they are delivered even while every
    /// permit is held by listeners that wait on them.
    fn is_non_blocking(&self) -> bool {
        false
    }
}

/// Shared handle to a synchronous listener.
pub type ListenerRef = Arc<dyn Listener>;

/// Asynchronous event listener.
///
/// Runs on the dispatcher's runtime workers; use async I/O and avoid blocking.
#[async_trait]
pub trait AsyncListener: Send + Sync + 'static {
    /// Handles a single delivered event.
    async fn on_event(&self, sender: &Sender, event: &Event);

    /// Returns the listener name used in logs and failure reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to an asynchronous listener.
pub type AsyncListenerRef = Arc<dyn AsyncListener>;

/// Identity of a registered listener.
///
/// Derived from the `Arc` allocation, so it stays stable for as long as the
/// listener is registered (the registry keeps it alive).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

impl ListenerId {
    /// Returns the identity of the listener behind `listener`.
    ///
    /// Works for concrete and trait-object `Arc`s alike: coercing an
    /// `Arc<MyListener>` to `Arc<dyn Listener>` keeps the same identity.
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener).cast::<()>() as usize)
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({:#x})", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener@{:#x}", self.0)
    }
}

/// A registered callback: blocking or async.
#[derive(Clone)]
pub enum Handler {
    /// Delivered on the blocking pool.
    Blocking(ListenerRef),
    /// Delivered as a runtime task.
    Async(AsyncListenerRef),
}

impl Handler {
    /// Returns the identity of the wrapped listener.
    pub fn id(&self) -> ListenerId {
        match self {
            Handler::Blocking(l) => ListenerId::of(l),
            Handler::Async(l) => ListenerId::of(l),
        }
    }

    /// Returns the wrapped listener's name.
    pub fn name(&self) -> &'static str {
        match self {
            Handler::Blocking(l) => l.name(),
            Handler::Async(l) => l.name(),
        }
    }

    /// Returns true for async listeners.
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }

    /// Returns true for blocking-trait listeners that declare they never block.
    pub fn is_non_blocking(&self) -> bool {
        match self {
            Handler::Blocking(l) => l.is_non_blocking(),
            Handler::Async(_) => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_async() { "async" } else { "blocking" };
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("kind", &kind)
            .field("id", &self.id())
            .finish()
    }
}

impl From<ListenerRef> for Handler {
    fn from(listener: ListenerRef) -> Self {
        Handler::Blocking(listener)
    }
}

impl From<AsyncListenerRef> for Handler {
    fn from(listener: AsyncListenerRef) -> Self {
        Handler::Async(listener)
    }
}
