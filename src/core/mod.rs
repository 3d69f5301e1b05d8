//! Runtime core: registry, delivery and lifecycle.
//!
//! The only entry point most users need from this module is [`Dispatcher`].
//!
//! Internal modules:
//! - [`registry`]: subscriptions keyed by (listener, event type) under one lock;
//! - [`context`]: context groups for bulk teardown;
//! - [`delivery`]: snapshot-and-submit of one trigger, panic isolation;
//! - [`schedule`]: delayed and periodic triggers with cancellation;
//! - [`dispatcher`]: the façade, shutdown;
//! - [`extension`]: after-register / after-trigger hook.

mod builder;
mod config;
mod context;
mod delivery;
mod dispatcher;
mod extension;
mod registry;
mod schedule;

pub use builder::DispatcherBuilder;
pub use config::{Config, DELIVERY_THREADS_PER_CORE};
pub use context::ContextKey;
pub use dispatcher::Dispatcher;
pub use extension::{Extension, ExtensionRef};
pub use registry::RegistrySnapshot;
pub use schedule::ScheduleHandle;
