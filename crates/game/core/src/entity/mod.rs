//! Entities: heroes and minions with attributes, tags, effects and abilities.
//!
//! An [`Entity`] owns its state and records every committed attribute and tag
//! change in a queue. The world drains that queue after each operation and
//! routes the events to subscribed listeners in commit order.

mod template;

pub use template::{
    EntityTemplate, death_effect, default_hero_attributes, knock_down_effect, revive_effect,
};

use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec3;
use tracing::error;

use crate::abilities::{AbilityError, AbilityHandle, AbilityKind, AbilitySource, Abilities};
use crate::attributes::{Attribute, AttributeStore};
use crate::config::GameConfig;
use crate::effects::{
    ActiveEffects, DamageOutcome, EffectContext, EffectHandle, EffectSpec, resolve_damage,
};
use crate::movement::{self, MovePredictor, MovementComponent, SpeedContext};
use crate::observe::{StateEvent, SubscriptionId, Subscriptions};
use crate::tags::{GameplayTag, TagCountChange, TagCounts, TagError};
use crate::types::{Controller, ControllerId, EntityId, NetRole, Tick, WeaponId};
use crate::weapon::Inventory;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Hero,
    Minion,
}

/// Life-cycle state derived from tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifeState {
    Alive,
    KnockedDown,
    Dead,
}

/// Camera perspective and the value to restore after a revive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Perspective {
    pub first_person: bool,
    pub was_first_person_before_knock_down: bool,
}

/// Listener registrations held for the currently equipped weapon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmmoBindings {
    pub weapon: WeaponId,
    /// Primary clip ammo on the weapon.
    pub clip: SubscriptionId,
    /// Primary reserve ammo on the entity.
    pub reserve: Option<SubscriptionId>,
}

/// Result of applying one effect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppliedEffect {
    /// `None` for instant effects.
    pub handle: Option<EffectHandle>,
    pub damage: Option<ResolvedDamage>,
}

/// Damage resolved by one execution, with the alive state before it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedDamage {
    pub outcome: DamageOutcome,
    pub was_alive: bool,
}

// ============================================================================
// Capabilities
// ============================================================================

pub trait Damageable {
    fn is_alive(&self) -> bool;
    fn can_be_knocked_down(&self) -> bool;
}

pub trait Interactable {
    fn is_available_for_interaction(&self) -> bool;
    /// Seconds the interaction must be held.
    fn interaction_duration(&self) -> f32;
}

pub trait Movable {
    fn max_speed(&self) -> f32;
}

/// One hero or minion as seen by one machine.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub template: Arc<EntityTemplate>,
    pub role: NetRole,
    pub controller: Option<Controller>,
    pub location: Vec3,
    pub attributes: AttributeStore,
    tags: TagCounts,
    /// Client side: last effect-granted tag counts received from the server.
    replicated_tags: TagCounts,
    effects: ActiveEffects,
    abilities: Abilities,
    pub inventory: Inventory,
    pub current_weapon: Option<WeaponId>,
    /// Loose tag describing the equipped weapon.
    pub current_weapon_tag: GameplayTag,
    /// Set when the owning client switched weapons ahead of the server.
    pub changed_weapon_locally: bool,
    pub ammo_bindings: Option<AmmoBindings>,
    pub weapon_sync: Option<SubscriptionId>,
    pub character_abilities_given: bool,
    pub startup_effects_applied: bool,
    pub movement: MovementComponent,
    pub predictor: MovePredictor,
    pub perspective: Perspective,
    pub attribute_listeners: Subscriptions<Attribute>,
    pub tag_listeners: Subscriptions<GameplayTag>,
    pending: VecDeque<StateEvent>,
    config: Arc<GameConfig>,
}

impl Entity {
    pub fn new(
        id: EntityId,
        template: Arc<EntityTemplate>,
        role: NetRole,
        controller: Option<Controller>,
        location: Vec3,
        config: Arc<GameConfig>,
    ) -> Self {
        let mut attributes = AttributeStore::new(&config);
        attributes.initialize(&template.attributes);
        attributes.drain_changes();
        let first_person = template.start_in_first_person;
        Self {
            id,
            kind: template.kind,
            role,
            controller,
            location,
            attributes,
            tags: TagCounts::new(),
            replicated_tags: TagCounts::new(),
            effects: ActiveEffects::new(),
            abilities: Abilities::new(),
            inventory: Inventory::new(),
            current_weapon: None,
            current_weapon_tag: GameplayTag::WeaponEquippedNone,
            changed_weapon_locally: false,
            ammo_bindings: None,
            weapon_sync: None,
            character_abilities_given: false,
            startup_effects_applied: false,
            movement: MovementComponent::default(),
            predictor: MovePredictor::new(),
            perspective: Perspective {
                first_person,
                was_first_person_before_knock_down: first_person,
            },
            attribute_listeners: Subscriptions::new(),
            tag_listeners: Subscriptions::new(),
            pending: VecDeque::new(),
            template,
            config,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn tags(&self) -> &TagCounts {
        &self.tags
    }

    pub fn has_tag(&self, tag: GameplayTag) -> bool {
        self.tags.has(tag)
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn abilities(&self) -> &Abilities {
        &self.abilities
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn life_state(&self) -> LifeState {
        if self.tags.has(GameplayTag::Dead) {
            LifeState::Dead
        } else if self.tags.has(GameplayTag::KnockedDown) {
            LifeState::KnockedDown
        } else {
            LifeState::Alive
        }
    }

    pub fn has_authority(&self) -> bool {
        self.role.has_authority()
    }

    pub fn is_locally_controlled(&self) -> bool {
        matches!(self.role, NetRole::AutonomousProxy)
    }

    pub fn controller_id(&self) -> Option<ControllerId> {
        self.controller.map(|c| c.id)
    }

    /// Tag counts granted by active effects, i.e. the replicated tag set.
    pub fn granted_tag_counts(&self) -> TagCounts {
        let mut counts = TagCounts::new();
        for effect in self.effects.iter() {
            for tag in &effect.spec.granted_tags {
                counts.add(*tag, 1);
            }
        }
        counts
    }

    pub fn speed_context(&self) -> SpeedContext {
        SpeedContext {
            alive: self.is_alive(),
            knocked_down: self.tags.has(GameplayTag::KnockedDown),
            interacting: self.tags.count(GameplayTag::Interacting),
            interacting_removal: self.tags.count(GameplayTag::InteractingRemoval),
            move_speed: self.attributes.get(Attribute::MoveSpeed),
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Pops the next committed change, oldest first.
    pub fn take_event(&mut self) -> Option<StateEvent> {
        self.pull_attribute_changes();
        self.pending.pop_front()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops every queued event without dispatching it.
    pub fn discard_events(&mut self) -> usize {
        self.pull_attribute_changes();
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    fn pull_attribute_changes(&mut self) {
        self.pending
            .extend(self.attributes.drain_changes().into_iter().map(StateEvent::Attribute));
    }

    fn record_tag(&mut self, change: Option<TagCountChange>) {
        self.pull_attribute_changes();
        if let Some(change) = change {
            self.pending.push_back(StateEvent::Tag(change));
        }
    }

    fn record_tags(&mut self, changes: Vec<TagCountChange>) {
        for change in changes {
            self.record_tag(Some(change));
        }
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Adds a local tag that is never replicated.
    pub fn add_loose_tag(&mut self, tag: GameplayTag) {
        let change = self.tags.add(tag, 1);
        self.record_tag(change);
    }

    /// Removes one count of a local tag.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Underflow`] if the tag is not present; nothing is
    /// changed in that case.
    pub fn remove_loose_tag(&mut self, tag: GameplayTag) -> Result<(), TagError> {
        let change = self.tags.remove(tag, 1)?;
        self.record_tag(change);
        Ok(())
    }

    /// Client side: adopts the effect-granted tag counts sent by the server.
    pub fn apply_replicated_tags(&mut self, counts: &[(GameplayTag, u32)]) {
        let mut incoming = TagCounts::new();
        for (tag, count) in counts {
            incoming.set_count(*tag, *count);
        }
        let mut touched: Vec<GameplayTag> = self.replicated_tags.iter().map(|(t, _)| t).collect();
        touched.extend(incoming.iter().map(|(t, _)| t));
        touched.sort();
        touched.dedup();

        for tag in touched {
            let old = self.replicated_tags.count(tag);
            let new = incoming.count(tag);
            let change = if new > old {
                self.tags.add(tag, new - old)
            } else {
                match self.tags.remove(tag, old - new) {
                    Ok(change) => change,
                    Err(err) => {
                        error!(target: "arena::replication", entity = %self.id, %err, "replicated tag underflow");
                        self.tags.set_count(tag, 0)
                    }
                }
            };
            self.record_tag(change);
        }
        self.replicated_tags = incoming;
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Applies an effect to this entity.
    ///
    /// Instant effects execute against base values, and damage accumulated in
    /// the `Damage` meta attribute is resolved immediately. Duration effects
    /// are registered with their granted tags; non-periodic ones also hold
    /// their modifiers until removed.
    pub fn apply_effect(&mut self, spec: &EffectSpec, context: EffectContext, now: Tick) -> AppliedEffect {
        for tag in &spec.remove_effects_granting {
            self.remove_effects_granting(*tag);
        }

        if spec.is_instant() {
            let damage = self.execute(spec);
            return AppliedEffect {
                handle: None,
                damage,
            };
        }

        let handle = self.effects.insert(spec.clone(), context, now);
        for tag in &spec.granted_tags {
            let change = self.tags.add(*tag, 1);
            self.record_tag(change);
        }
        if spec.period.is_none() {
            for modifier in &spec.modifiers {
                self.attributes.add_modifier(handle, *modifier);
            }
        }
        AppliedEffect {
            handle: Some(handle),
            damage: None,
        }
    }

    /// Runs one period of a periodic effect.
    ///
    /// Returns the effect context along with any damage resolved.
    pub fn execute_periodic(&mut self, handle: EffectHandle) -> Option<(EffectContext, Option<ResolvedDamage>)> {
        let effect = self.effects.get(handle)?;
        let spec = effect.spec.clone();
        let context = effect.context.clone();
        let damage = self.execute(&spec);
        Some((context, damage))
    }

    fn execute(&mut self, spec: &EffectSpec) -> Option<ResolvedDamage> {
        let was_alive = self.is_alive();
        for modifier in &spec.modifiers {
            self.attributes
                .apply_mod(modifier.attribute, modifier.op, modifier.magnitude);
        }
        if !spec.deals_damage() {
            return None;
        }
        resolve_damage(&mut self.attributes).map(|outcome| ResolvedDamage { outcome, was_alive })
    }

    /// Removes an active effect, its modifiers and its granted tags.
    pub fn remove_effect(&mut self, handle: EffectHandle) -> bool {
        let Some(effect) = self.effects.remove(handle) else {
            return false;
        };
        self.attributes.remove_modifiers(handle);
        for tag in &effect.spec.granted_tags {
            match self.tags.remove(*tag, 1) {
                Ok(change) => self.record_tag(change),
                Err(err) => {
                    error!(target: "arena::effects", entity = %self.id, effect = %effect.spec.name, %err, "granted tag already gone");
                }
            }
        }
        true
    }

    pub fn remove_effects_with_asset_tag(&mut self, tag: GameplayTag) -> usize {
        let handles = self.effects.with_asset_tag(tag);
        handles.into_iter().filter(|h| self.remove_effect(*h)).count()
    }

    pub fn remove_effects_granting(&mut self, tag: GameplayTag) -> usize {
        let handles = self.effects.granting(tag);
        handles.into_iter().filter(|h| self.remove_effect(*h)).count()
    }

    pub fn expired_effects(&self, now: Tick) -> Vec<EffectHandle> {
        self.effects.expired(now)
    }

    pub fn due_periodic_effects(&mut self, now: Tick) -> Vec<EffectHandle> {
        self.effects.take_due_periods(now)
    }

    // ========================================================================
    // Abilities
    // ========================================================================

    pub fn grant_ability(&mut self, def: crate::abilities::AbilityDef, source: AbilitySource) -> AbilityHandle {
        self.abilities.grant_once(def, source)
    }

    pub fn find_ability(&self, kind: AbilityKind) -> Option<AbilityHandle> {
        self.abilities.find_kind(kind)
    }

    /// # Errors
    ///
    /// Returns [`AbilityError::Blocked`] with the blocking tags when a
    /// blocked-by tag is present.
    pub fn try_activate_ability(&mut self, handle: AbilityHandle) -> Result<AbilityKind, AbilityError> {
        let (kind, changes) = self.abilities.try_activate(handle, &mut self.tags)?;
        self.record_tags(changes);
        Ok(kind)
    }

    pub fn end_ability(&mut self, handle: AbilityHandle) {
        let changes = self.abilities.end(handle, &mut self.tags);
        self.record_tags(changes);
    }

    pub fn cancel_all_abilities(&mut self) {
        let changes = self.abilities.cancel_all(&mut self.tags);
        self.record_tags(changes);
    }

    pub fn cancel_abilities_with_tag(&mut self, parent: GameplayTag) {
        let changes = self.abilities.cancel_with_tag(parent, &mut self.tags);
        self.record_tags(changes);
    }

    pub fn remove_abilities_from(&mut self, source: AbilitySource) {
        let changes = self.abilities.remove_source(source, &mut self.tags);
        self.record_tags(changes);
    }
}

impl Damageable for Entity {
    fn is_alive(&self) -> bool {
        self.attributes.get(Attribute::Health) > 0.0
    }

    fn can_be_knocked_down(&self) -> bool {
        matches!(self.kind, EntityKind::Hero)
    }
}

impl Interactable for Entity {
    fn is_available_for_interaction(&self) -> bool {
        self.tags.has(GameplayTag::KnockedDown) && !self.tags.has(GameplayTag::Interacting)
    }

    fn interaction_duration(&self) -> f32 {
        if self.tags.has(GameplayTag::KnockedDown) {
            self.config.revive_duration
        } else {
            0.0
        }
    }
}

impl Movable for Entity {
    fn max_speed(&self) -> f32 {
        movement::max_speed(&self.config, self.movement.intent, self.speed_context())
    }
}
