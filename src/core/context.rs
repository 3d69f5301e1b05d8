//! # Context groups.
//!
//! A [`ContextKey`] tags subscriptions so they can be removed together with
//! [`Dispatcher::unregister_all_for_context`](crate::Dispatcher::unregister_all_for_context).
//!
//! ```text
//! register(A, OrderPlaced,     ctx=batch-7) ─┐
//! register(B, PaymentReceived, ctx=batch-7) ─┼─► ContextIndex["batch-7"] = [A/OrderPlaced, B/PaymentReceived]
//! register(C, OrderPlaced)                   │
//!                                            ▼
//! unregister_all_for_context(batch-7) → removes A and B, C stays
//! ```
//!
//! ## Rules
//! - Named keys compare by value: two `ContextKey::named("x")` are the same group.
//! - [`ContextKey::unique`] returns a fresh key that equals only its own clones.
//! - Unregistering one subscription individually also drops it from its groups.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::subscribers::SubscriptionKey;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifier of a group of subscriptions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ContextKey {
    /// Caller-chosen name; equal names are the same group.
    Named(Arc<str>),
    /// Process-unique token created by [`ContextKey::unique`].
    Token(u64),
}

impl ContextKey {
    /// Creates a named context.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        ContextKey::Named(name.into())
    }

    /// Creates a context distinct from every other key in the process.
    pub fn unique() -> Self {
        ContextKey::Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKey::Named(name) => f.write_str(name),
            ContextKey::Token(t) => write!(f, "ctx#{t}"),
        }
    }
}

impl From<&str> for ContextKey {
    fn from(name: &str) -> Self {
        ContextKey::named(name)
    }
}

impl From<String> for ContextKey {
    fn from(name: String) -> Self {
        ContextKey::named(name)
    }
}

impl From<&ContextKey> for ContextKey {
    fn from(key: &ContextKey) -> Self {
        key.clone()
    }
}

/// Context → subscription keys. Lives inside the registry lock.
#[derive(Default, Debug)]
pub(crate) struct ContextIndex {
    groups: HashMap<ContextKey, Vec<SubscriptionKey>>,
}

impl ContextIndex {
    /// Records `key` under `ctx` (no duplicates within one group).
    pub(crate) fn record(&mut self, ctx: ContextKey, key: SubscriptionKey) {
        let group = self.groups.entry(ctx).or_default();
        if !group.contains(&key) {
            group.push(key);
        }
    }

    /// Removes the group and returns its members.
    pub(crate) fn take(&mut self, ctx: &ContextKey) -> Vec<SubscriptionKey> {
        self.groups.remove(ctx).unwrap_or_default()
    }

    /// Drops `key` from every group; empty groups are removed.
    pub(crate) fn forget(&mut self, key: &SubscriptionKey) {
        self.groups.retain(|_, members| {
            members.retain(|k| k != key);
            !members.is_empty()
        });
    }

    pub(crate) fn clear(&mut self) {
        self.groups.clear();
    }

    #[cfg(test)]
    pub(crate) fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::{ListenerFn, ListenerId, ListenerRef};

    fn key(l: &ListenerRef, ty: &str) -> SubscriptionKey {
        SubscriptionKey::new(ListenerId::of(l), ty.into())
    }

    #[test]
    fn named_keys_compare_by_value_tokens_do_not() {
        assert_eq!(ContextKey::from("batch-7"), ContextKey::named("batch-7"));
        let a = ContextKey::unique();
        let b = ContextKey::unique();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(ContextKey::from("x").to_string(), "x");
    }

    #[test]
    fn record_take_and_forget() {
        let l: ListenerRef = ListenerFn::arc("a", |_, _| {});
        let ctx = ContextKey::from("batch-7");
        let mut idx = ContextIndex::default();

        idx.record(ctx.clone(), key(&l, "OrderPlaced"));
        idx.record(ctx.clone(), key(&l, "OrderPlaced"));
        idx.record(ctx.clone(), key(&l, "PaymentReceived"));
        idx.record(ContextKey::from("other"), key(&l, "OrderPlaced"));
        assert_eq!(idx.group_count(), 2);

        idx.forget(&key(&l, "OrderPlaced"));
        assert_eq!(idx.group_count(), 1);

        let members = idx.take(&ctx);
        assert_eq!(members, vec![key(&l, "PaymentReceived")]);
        assert!(idx.take(&ctx).is_empty());
        assert_eq!(idx.group_count(), 0);
    }
}
