//! # Extension hook.
//!
//! An [`Extension`] observes the dispatcher from the inside: it is told about
//! every registration (with a full registry snapshot) and every trigger. Use it
//! for auditing, mirroring subscriptions elsewhere, or bridging events out of
//! process.
//!
//! ```text
//! register(spec) ──► registry.insert ──► after_register(sub, outcome, snapshot)   (caller thread)
//! trigger(..)    ──► submit deliveries ─► after_trigger(sender, event, expr)     (blocking pool)
//! ```
//!
//! ## Rules
//! - Hooks never run under the registry lock.
//! - A panicking hook is caught, logged and reported as
//!   [`ReportKind::HookFailed`](crate::ReportKind::HookFailed); the operation
//!   that invoked it still succeeds.
//! - Both methods default to no-ops; implement only what you need.

use std::sync::Arc;

use crate::core::registry::RegistrySnapshot;
use crate::events::{Event, Expression, Sender};
use crate::subscribers::{Registered, Subscription};

/// Observer invoked after registration and after trigger.
pub trait Extension: Send + Sync + 'static {
    /// Called after every registration attempt, duplicates included.
    ///
    /// `subscription` is what the caller asked for; `outcome` tells whether it
    /// was stored. `snapshot` is the registry right after the attempt.
    fn after_register(
        &self,
        _subscription: &Subscription,
        _outcome: Registered,
        _snapshot: &RegistrySnapshot,
    ) {
    }

    /// Called once per trigger, after all deliveries were submitted.
    fn after_trigger(&self, _sender: &Sender, _event: &Event, _expression: Option<&Expression>) {}
}

/// Shared handle to an extension.
pub type ExtensionRef = Arc<dyn Extension>;
