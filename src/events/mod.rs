//! Event data model and the failure report bus.
//!
//! ## Contents
//! - [`EventType`], [`Event`]: what producers trigger and listeners receive
//! - [`Value`], [`Sender`], [`Expression`]: type-erased values passed alongside events
//! - [`Report`], [`ReportKind`]: failure reports (listener panics, hook failures)
//! - [`ReportBus`]: thin wrapper over `tokio::sync::broadcast` carrying reports

mod bus;
mod event;
mod report;

pub use bus::ReportBus;
pub use event::{value, Event, EventType, Expression, Sender, Value};
pub(crate) use report::panic_message;
pub use report::{Report, ReportKind};
