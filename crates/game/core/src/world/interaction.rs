//! Interaction contract used to revive knocked-down heroes.
//!
//! The interactor's side (prompt timing, hold duration) is driven by the
//! host. The world answers availability queries and runs the revive ability
//! on the knocked-down target.

use tracing::info;

use super::{World, WorldResult};
use crate::abilities::AbilityKind;
use crate::effects::{EffectContext, EffectSpec};
use crate::entity::Interactable;
use crate::net::ClientRpc;
use crate::notify::HudUpdate;
use crate::tags::GameplayTag;
use crate::types::EntityId;

impl World {
    /// True if `target` is knocked down and nobody is reviving it yet.
    pub fn is_available_for_interaction(&self, target: EntityId) -> bool {
        self.entities
            .get(&target)
            .is_some_and(Interactable::is_available_for_interaction)
    }

    /// Seconds `target` must be interacted with; zero unless knocked down.
    pub fn interaction_duration(&self, target: EntityId) -> f32 {
        self.entities
            .get(&target)
            .map_or(0.0, Interactable::interaction_duration)
    }

    /// Server: an interactor started holding the interaction on `target`.
    ///
    /// Starts the target's revive ability and roots both sides with a
    /// replicated `State.Interacting` effect, which also keeps the target
    /// off-limits to other interactors.
    pub fn pre_interact(&mut self, target: EntityId, interactor: EntityId) -> WorldResult<()> {
        let entity = self.entity_ref(target)?;
        if !entity.has_authority() || !entity.has_tag(GameplayTag::KnockedDown) {
            return Ok(());
        }
        self.activate_ability(target, AbilityKind::Revive)?;
        let context = EffectContext {
            source: Some(interactor),
            ..EffectContext::default()
        };
        self.apply_effect(target, &interaction_lock(), context.clone())?;
        if self.entities.contains_key(&interactor) {
            self.apply_effect(interactor, &interaction_lock(), context)?;
        }
        info!(target: "arena::interaction", %target, %interactor, "revive started");
        Ok(())
    }

    /// Server: the interaction was held for its full duration.
    pub fn post_interact(&mut self, target: EntityId, interactor: EntityId) -> WorldResult<()> {
        let entity = self.entity_ref(target)?;
        if entity.has_authority() && entity.has_tag(GameplayTag::KnockedDown) {
            let effect = entity.template.revive_effect.clone();
            let context = EffectContext {
                source: Some(interactor),
                ..EffectContext::default()
            };
            self.apply_effect(target, &effect, context)?;
            self.end_ability(target, AbilityKind::Revive)?;
            info!(target: "arena::interaction", %target, %interactor, "revived");
        }
        self.release_interaction_lock(target)?;
        self.release_interaction_lock(interactor)
    }

    /// The interactor let go early. Either side may already be gone.
    pub fn cancel_interaction(&mut self, target: EntityId, interactor: EntityId) -> WorldResult<()> {
        if self.entities.contains_key(&target) {
            self.cancel_abilities(target, GameplayTag::AbilityRevive)?;
            self.release_interaction_lock(target)?;
        }
        self.release_interaction_lock(interactor)
    }

    /// Frees an entity rooted by an interaction.
    ///
    /// `State.InteractingRemoval` is held while the lock unwinds so movement
    /// is released before `State.Interacting` itself drops.
    fn release_interaction_lock(&mut self, id: EntityId) -> WorldResult<()> {
        let Some(entity) = self.entities.get_mut(&id) else {
            return Ok(());
        };
        if !entity.has_authority() || !entity.has_tag(GameplayTag::Interacting) {
            return Ok(());
        }
        entity.add_loose_tag(GameplayTag::InteractingRemoval);
        let unlock = EffectSpec::instant("InteractingRemoval")
            .removing_effects_granting(GameplayTag::Interacting);
        self.apply_effect(id, &unlock, EffectContext::default())?;
        self.entity_mut(id)?
            .remove_loose_tag(GameplayTag::InteractingRemoval)?;
        self.process_events(id);
        Ok(())
    }

    /// Shows the interaction prompt to the player controlling `interactor`.
    pub fn show_interaction_prompt(&mut self, interactor: EntityId, duration: f32) -> WorldResult<()> {
        self.relay_prompt(interactor, Some(duration))
    }

    pub fn hide_interaction_prompt(&mut self, interactor: EntityId) -> WorldResult<()> {
        self.relay_prompt(interactor, None)
    }

    fn relay_prompt(&mut self, interactor: EntityId, duration: Option<f32>) -> WorldResult<()> {
        if self.entity_ref(interactor)?.is_locally_controlled() {
            self.hud(interactor, prompt_update(duration));
        } else {
            self.send_to_owner(
                interactor,
                ClientRpc::InteractionPrompt {
                    entity: interactor,
                    duration,
                },
            );
        }
        Ok(())
    }
}

/// Roots its holder in place until removed; dropped on death.
fn interaction_lock() -> EffectSpec {
    EffectSpec::infinite("Interacting")
        .granting(GameplayTag::Interacting)
        .with_asset_tag(GameplayTag::EffectRemoveOnDeath)
}

pub(crate) fn prompt_update(duration: Option<f32>) -> HudUpdate {
    match duration {
        Some(duration) => HudUpdate::ShowInteractionPrompt { duration },
        None => HudUpdate::HideInteractionPrompt,
    }
}
