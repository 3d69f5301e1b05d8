//! # Subscription registry.
//!
//! Registry owns every live [`Subscription`] and the context groups they belong to.
//!
//! ## Layout
//! ```text
//! Registry (one parking_lot::Mutex)
//!   ├─ by_type: EventType ─► { SubscriptionKey ─► Subscription }
//!   └─ contexts: ContextKey ─► [SubscriptionKey]
//! ```
//!
//! ## Rules
//! - One lock guards both maps; every operation is atomic with respect to the others.
//! - The lock is never held while user code runs (listeners, conditions, hooks).
//!   Delivery works on a cloned snapshot taken under the lock.
//! - Empty per-type maps are removed, so `event_types()` lists only live types.
//! - Registration keeps the first subscription for a key; later ones are ignored.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::core::context::{ContextIndex, ContextKey};
use crate::events::EventType;
use crate::subscribers::{ListenerId, Registered, Subscription, SubscriptionKey};

/// Point-in-time copy of all subscriptions, grouped by event type.
pub type RegistrySnapshot = HashMap<EventType, Vec<Subscription>>;

#[derive(Default)]
struct State {
    by_type: HashMap<EventType, HashMap<SubscriptionKey, Subscription>>,
    contexts: ContextIndex,
}

/// Thread-safe store of subscriptions.
#[derive(Default)]
pub(crate) struct Registry {
    state: Mutex<State>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `sub` unless its key already exists; records the context either way.
    pub(crate) fn register(&self, sub: Subscription, ctx: Option<ContextKey>) -> Registered {
        let key = sub.key();
        let mut st = self.state.lock();

        let outcome = match st
            .by_type
            .entry(sub.event_type().clone())
            .or_default()
            .entry(key.clone())
        {
            Entry::Occupied(_) => Registered::AlreadyPresent,
            Entry::Vacant(slot) => {
                slot.insert(sub);
                Registered::Inserted
            }
        };

        if let Some(ctx) = ctx {
            st.contexts.record(ctx, key);
        }
        outcome
    }

    /// Removes the subscription of `listener` for `event_type`.
    pub(crate) fn unregister(
        &self,
        listener: ListenerId,
        event_type: &EventType,
    ) -> Option<Subscription> {
        let key = SubscriptionKey::new(listener, event_type.clone());
        let mut st = self.state.lock();
        let removed = Self::remove_locked(&mut st, &key);
        if removed.is_some() {
            st.contexts.forget(&key);
        }
        removed
    }

    /// Removes every subscription recorded under `ctx`; returns how many were removed.
    pub(crate) fn unregister_context(&self, ctx: &ContextKey) -> usize {
        let mut st = self.state.lock();
        let members = st.contexts.take(ctx);
        let mut removed = 0;
        for key in &members {
            if Self::remove_locked(&mut st, key).is_some() {
                st.contexts.forget(key);
                removed += 1;
            }
        }
        removed
    }

    /// Removes all subscriptions and all context groups.
    pub(crate) fn clear(&self) -> usize {
        let mut st = self.state.lock();
        let n = st.by_type.values().map(HashMap::len).sum();
        st.by_type.clear();
        st.contexts.clear();
        n
    }

    /// Clones the subscriptions for one event type.
    pub(crate) fn snapshot_for(&self, event_type: &EventType) -> Vec<Subscription> {
        self.state
            .lock()
            .by_type
            .get(event_type)
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Clones all subscriptions.
    pub(crate) fn snapshot(&self) -> RegistrySnapshot {
        self.state
            .lock()
            .by_type
            .iter()
            .map(|(ty, subs)| (ty.clone(), subs.values().cloned().collect()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().by_type.values().map(HashMap::len).sum()
    }

    pub(crate) fn contains(&self, listener: ListenerId, event_type: &EventType) -> bool {
        let key = SubscriptionKey::new(listener, event_type.clone());
        self.state
            .lock()
            .by_type
            .get(event_type)
            .is_some_and(|subs| subs.contains_key(&key))
    }

    /// Returns the event types with at least one subscription, sorted.
    pub(crate) fn event_types(&self) -> Vec<EventType> {
        let mut types: Vec<EventType> = self.state.lock().by_type.keys().cloned().collect();
        types.sort_unstable();
        types
    }

    fn remove_locked(st: &mut State, key: &SubscriptionKey) -> Option<Subscription> {
        let subs = st.by_type.get_mut(key.event_type())?;
        let removed = subs.remove(key);
        if subs.is_empty() {
            st.by_type.remove(key.event_type());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::{condition, ListenerFn, ListenerRef};

    fn listener(name: &'static str) -> ListenerRef {
        ListenerFn::arc(name, |_, _| {})
    }

    fn sub(l: &ListenerRef, ty: &str) -> Subscription {
        Subscription::new(l.clone().into(), ty.into(), None)
    }

    #[test]
    fn first_registration_wins() {
        let reg = Registry::new();
        let l = listener("a");
        let first = Subscription::new(l.clone().into(), "T".into(), Some(condition(|_, _, _| true)));

        assert_eq!(reg.register(first, None), Registered::Inserted);
        assert_eq!(reg.register(sub(&l, "T"), None), Registered::AlreadyPresent);
        assert_eq!(reg.len(), 1);

        let kept = reg.snapshot_for(&"T".into());
        assert!(kept[0].condition().is_some());
    }

    #[test]
    fn unregister_drops_empty_types() {
        let reg = Registry::new();
        let l = listener("a");
        let ty: EventType = "T".into();
        reg.register(sub(&l, "T"), None);

        assert!(reg.contains(ListenerId::of(&l), &ty));
        assert!(reg.unregister(ListenerId::of(&l), &ty).is_some());
        assert!(reg.unregister(ListenerId::of(&l), &ty).is_none());
        assert!(reg.event_types().is_empty());
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn context_teardown_only_touches_its_group() {
        let reg = Registry::new();
        let (a, b, c) = (listener("a"), listener("b"), listener("c"));
        let ctx = ContextKey::from("batch-7");

        reg.register(sub(&a, "OrderPlaced"), Some(ctx.clone()));
        reg.register(sub(&b, "PaymentReceived"), Some(ctx.clone()));
        reg.register(sub(&c, "OrderPlaced"), None);

        assert_eq!(reg.unregister_context(&ctx), 2);
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(ListenerId::of(&c), &"OrderPlaced".into()));
        assert_eq!(reg.unregister_context(&ctx), 0);
    }

    #[test]
    fn individually_removed_members_leave_the_group() {
        let reg = Registry::new();
        let a = listener("a");
        let ctx = ContextKey::unique();
        reg.register(sub(&a, "T"), Some(ctx.clone()));
        reg.unregister(ListenerId::of(&a), &"T".into());

        // re-registered without context: must survive the group teardown
        reg.register(sub(&a, "T"), None);
        assert_eq!(reg.unregister_context(&ctx), 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let reg = Registry::new();
        let a = listener("a");
        reg.register(sub(&a, "T"), Some("g".into()));
        reg.register(sub(&a, "U"), None);

        assert_eq!(reg.clear(), 2);
        assert_eq!(reg.len(), 0);
        assert_eq!(reg.unregister_context(&"g".into()), 0);
    }
}
