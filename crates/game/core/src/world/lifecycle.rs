//! Alive → KnockedDown → Dead transitions, revive cosmetics and respawn.
//!
//! State lives entirely in tags: `State.KnockedDown` is granted by the
//! knock-down effect, `State.Dead` by the death effect. Transitions are
//! triggered by health reaching zero and run on the server only; the
//! cosmetic reactions to `State.KnockedDown` run on every machine.

use glam::Vec3;
use tracing::{info, warn};

use super::{World, WorldResult};
use crate::abilities::AbilitySource;
use crate::attributes::Attribute;
use crate::effects::{EffectContext, ModOp};
use crate::entity::{Damageable, EntityKind};
use crate::notify::{HudUpdate, Notification};
use crate::observe::Listener;
use crate::tags::{GameplayTag, TagCountChange};
use crate::types::{Controller, EntityId};

/// Attributes refilled when a dead hero is possessed again.
const RESPAWN_REFILL: [Attribute; 4] = [
    Attribute::Health,
    Attribute::Mana,
    Attribute::Stamina,
    Attribute::Shield,
];

impl World {
    // ========================================================================
    // Transitions
    // ========================================================================

    pub(crate) fn on_health_changed(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if !entity.has_authority() || entity.is_alive() || entity.has_tag(GameplayTag::Dead) {
            return;
        }
        if !entity.can_be_knocked_down() {
            self.die(id);
        } else if entity.has_tag(GameplayTag::KnockedDown) {
            self.finish_dying(id);
        } else {
            self.knock_down(id);
        }
    }

    /// Server: health reached zero for the first time.
    fn knock_down(&mut self, id: EntityId) {
        let now = self.tick;
        let fraction = self.config.knock_down_health_fraction;
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.cancel_all_abilities();
        entity.remove_effects_with_asset_tag(GameplayTag::EffectRemoveOnDeath);
        let effect = entity.template.knock_down_effect.clone();
        entity.apply_effect(&effect, EffectContext::default(), now);

        let health = entity.attributes.get(Attribute::MaxHealth) * fraction;
        entity.attributes.apply_mod(Attribute::Health, ModOp::Override, health);
        entity.attributes.apply_mod(Attribute::Shield, ModOp::Override, 0.0);
        info!(target: "arena::lifecycle", entity = %id, health, "knocked down");
    }

    /// Server: health reached zero while knocked down.
    ///
    /// Events raised here are dispatched after the whole sequence, when
    /// `State.Dead` is already present, so losing `State.KnockedDown` does not
    /// play the revive cosmetics.
    pub(crate) fn finish_dying(&mut self, id: EntityId) {
        if let Err(err) = self.remove_all_weapons(id) {
            warn!(target: "arena::lifecycle", entity = %id, %err, "failed to drop weapons");
        }
        let now = self.tick;
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if let Some(subscription) = entity.weapon_sync.take() {
            entity.tag_listeners.unsubscribe(subscription);
        }
        entity.remove_abilities_from(AbilitySource::Character);
        entity.character_abilities_given = false;
        entity.cancel_all_abilities();
        entity.remove_effects_with_asset_tag(GameplayTag::EffectRemoveOnDeath);
        let death = entity.template.death_effect.clone();
        entity.apply_effect(&death, EffectContext::default(), now);
        let controller = entity.controller_id();

        info!(target: "arena::lifecycle", entity = %id, "died");
        self.notify(Notification::EntityDied {
            entity: id,
            controller,
        });
    }

    /// Server: minions skip the knocked-down state.
    fn die(&mut self, id: EntityId) {
        let now = self.tick;
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.remove_abilities_from(AbilitySource::Character);
        entity.cancel_all_abilities();
        entity.remove_effects_with_asset_tag(GameplayTag::EffectRemoveOnDeath);
        let death = entity.template.death_effect.clone();
        entity.apply_effect(&death, EffectContext::default(), now);
        let controller = entity.controller_id();
        if let Some(montage) = entity.template.death_montage.clone() {
            self.notify(Notification::PlayMontage {
                entity: id,
                montage,
            });
        }
        info!(target: "arena::lifecycle", entity = %id, "minion died");
        self.notify(Notification::EntityDied {
            entity: id,
            controller,
        });
    }

    // ========================================================================
    // Cosmetics
    // ========================================================================

    pub(crate) fn on_knock_down_tag_changed(&mut self, id: EntityId, change: TagCountChange) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if change.added() {
            self.play_knock_down_effects(id);
        } else if change.removed() && !entity.has_tag(GameplayTag::Dead) {
            self.play_revive_effects(id);
        }
    }

    fn play_knock_down_effects(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.perspective.was_first_person_before_knock_down = entity.perspective.first_person;
        let location = entity.location;
        let montage = entity.template.death_montage.clone();
        self.set_perspective(id, false);
        if let Some(montage) = montage {
            self.notify(Notification::PlayMontage {
                entity: id,
                montage,
            });
        }
        self.notify(Notification::PlayVisualCue {
            entity: id,
            cue: GameplayTag::CueHeroKnockedDown,
            location,
        });
    }

    fn play_revive_effects(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        let restore = entity.perspective.was_first_person_before_knock_down;
        let location = entity.location;
        self.set_perspective(id, restore);
        self.notify(Notification::PlayVisualCue {
            entity: id,
            cue: GameplayTag::CueHeroRevived,
            location,
        });
    }

    /// Switches perspective; only the local player's camera is told.
    pub(crate) fn set_perspective(&mut self, id: EntityId, first_person: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.perspective.first_person = first_person;
        if entity.is_locally_controlled() {
            self.notify(Notification::SetPerspective {
                entity: id,
                first_person,
            });
        }
    }

    /// Local player toggles first/third person. Refused while knocked down.
    pub fn toggle_perspective(&mut self, id: EntityId) -> WorldResult<bool> {
        let entity = self.entity_ref(id)?;
        if entity.has_tag(GameplayTag::KnockedDown) || entity.has_tag(GameplayTag::Dead) {
            return Ok(entity.perspective.first_person);
        }
        let first_person = !entity.perspective.first_person;
        self.set_perspective(id, first_person);
        Ok(first_person)
    }

    // ========================================================================
    // Possession and respawn
    // ========================================================================

    /// Server: hands `id` to `controller` and (re)initializes it.
    ///
    /// On a dead entity this is the respawn path: health, mana, stamina and
    /// shield are refilled and the effects granting `State.Dead` removed.
    pub fn possess(&mut self, id: EntityId, controller: Controller) -> WorldResult<()> {
        self.require_authority(id, "possess")?;
        self.entity_mut(id)?.controller = Some(controller);
        self.initialize_possessed(id)
    }

    /// Server: brings a dead entity back at `location`.
    pub fn respawn(&mut self, id: EntityId, location: Vec3) -> WorldResult<()> {
        self.require_authority(id, "respawn")?;
        let entity = self.entity_mut(id)?;
        entity.location = location;
        entity.predictor.clear();
        self.initialize_possessed(id)?;
        info!(target: "arena::lifecycle", entity = %id, ?location, "respawned");
        Ok(())
    }

    fn initialize_possessed(&mut self, id: EntityId) -> WorldResult<()> {
        let now = self.tick;
        let entity = self.entity_mut(id)?;
        let template = entity.template.clone();

        if !entity.startup_effects_applied {
            for effect in &template.startup_effects {
                entity.apply_effect(effect, EffectContext::default(), now);
            }
            entity.startup_effects_applied = true;
        }
        if !entity.character_abilities_given && template.kind == EntityKind::Hero {
            for def in &template.abilities {
                entity.grant_ability(def.clone(), AbilitySource::Character);
            }
            entity.character_abilities_given = true;
        }
        if entity.has_tag(GameplayTag::Dead) {
            for attribute in RESPAWN_REFILL {
                if let Some(max) = attribute.max_attribute() {
                    let value = entity.attributes.get(max);
                    entity.attributes.reset_to(attribute, value);
                }
            }
        }
        entity.remove_effects_granting(GameplayTag::Dead);
        if entity.weapon_sync.is_none() {
            entity.weapon_sync = Some(entity.tag_listeners.subscribe(
                GameplayTag::AbilityWeaponIsChangingDelayReplication,
                Listener::WeaponSync,
            ));
        }
        entity.perspective.first_person = template.start_in_first_person;
        self.process_events(id);

        if self.entity_ref(id)?.inventory.is_empty() {
            self.spawn_default_inventory(id)?;
        }
        self.hud(id, HudUpdate::HealthPercentage(1.0));
        Ok(())
    }
}
