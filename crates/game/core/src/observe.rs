//! Subscribe/unsubscribe lists for attribute, tag and ammo changes.
//!
//! Listeners are plain data naming who reacts; the world dispatches committed
//! changes to them in commit order.

use std::collections::BTreeMap;

use crate::attributes::AttributeChange;
use crate::tags::TagCountChange;
use crate::types::EntityId;

/// Identifies one subscription so it can be removed later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Who reacts to a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Life-cycle state machine of the owning entity.
    LifeCycle,
    /// Health/mana/shield relay to the owning entity's HUD.
    Hud,
    /// Pushes the current weapon to its owner once the change window closes.
    WeaponSync,
    /// Ammo relay for the weapon `entity` has equipped.
    EquippedAmmo { entity: EntityId },
}

/// When a tag subscription fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TagTrigger {
    /// Only when the tag appears or disappears.
    #[default]
    NewOrRemoved,
    /// On every count change.
    AnyCountChange,
}

impl TagTrigger {
    pub fn fires_on(self, change: &TagCountChange) -> bool {
        match self {
            Self::NewOrRemoved => change.is_new_or_removed(),
            Self::AnyCountChange => change.old_count != change.new_count,
        }
    }
}

/// A change queued for dispatch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateEvent {
    Attribute(AttributeChange),
    Tag(TagCountChange),
}

#[derive(Clone, Debug)]
struct Subscription {
    id: SubscriptionId,
    listener: Listener,
    trigger: TagTrigger,
}

/// Subscription lists keyed by what is observed.
#[derive(Clone, Debug)]
pub struct Subscriptions<K> {
    next_id: u64,
    entries: BTreeMap<K, Vec<Subscription>>,
}

impl<K> Default for Subscriptions<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> Subscriptions<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, key: K, listener: Listener) -> SubscriptionId {
        self.subscribe_with(key, listener, TagTrigger::default())
    }

    pub fn subscribe_with(&mut self, key: K, listener: Listener, trigger: TagTrigger) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.entry(key).or_default().push(Subscription {
            id,
            listener,
            trigger,
        });
        id
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for subs in self.entries.values_mut() {
            let before = subs.len();
            subs.retain(|sub| sub.id != id);
            removed |= subs.len() != before;
        }
        self.entries.retain(|_, subs| !subs.is_empty());
        removed
    }

    /// Listeners registered on `key`, in subscription order.
    pub fn listeners(&self, key: K) -> Vec<Listener> {
        self.entries
            .get(&key)
            .map(|subs| subs.iter().map(|sub| sub.listener).collect())
            .unwrap_or_default()
    }

    /// Listeners on `key` whose trigger fires for `change`.
    pub fn tag_listeners(&self, key: K, change: &TagCountChange) -> Vec<Listener> {
        self.entries
            .get(&key)
            .map(|subs| {
                subs.iter()
                    .filter(|sub| sub.trigger.fires_on(change))
                    .map(|sub| sub.listener)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, key: K, listener: Listener) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|subs| subs.iter().any(|sub| sub.listener == listener))
    }
}
