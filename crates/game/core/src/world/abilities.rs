//! Ability activation, predicted on the owning client and confirmed by the
//! server.

use tracing::debug;

use super::{World, WorldError, WorldResult};
use crate::abilities::{AbilityHandle, AbilityKind};
use crate::effects::{EffectContext, EffectSpec};
use crate::net::{ClientRpc, ServerRpc};
use crate::tags::GameplayTag;
use crate::types::{EntityId, WeaponId};

impl World {
    /// Activates the granted ability of `kind`.
    ///
    /// On the owning client the activation is checked against local tags,
    /// a weapon change is applied ahead of the server, and the request is
    /// sent with the weapon switched to. On the server the activation is
    /// authoritative.
    ///
    /// # Errors
    ///
    /// [`WorldError::AbilityNotGranted`] if no such ability is granted, or
    /// [`WorldError::Ability`] with the blocking tags.
    pub fn activate_ability(&mut self, id: EntityId, kind: AbilityKind) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        let handle = entity
            .find_ability(kind)
            .ok_or(WorldError::AbilityNotGranted { entity: id, kind })?;

        if entity.has_authority() {
            return self.activate_on_server(id, handle, kind, None);
        }

        let result = self.entity_mut(id)?.try_activate_ability(handle);
        self.process_events(id);
        result?;

        let mut target_weapon = None;
        if kind.changes_weapon() {
            target_weapon = self.cycle_target(id, kind == AbilityKind::NextWeapon)?;
            if let Some(target) = target_weapon {
                self.unequip_current_weapon(id);
                self.set_current_weapon(id, Some(target), None);
                self.entity_mut(id)?.changed_weapon_locally = true;
            }
        }
        self.send_to_server(ServerRpc::ActivateAbility {
            entity: id,
            kind,
            target_weapon,
        });
        Ok(())
    }

    /// Ends an active ability, releasing its owned tags.
    pub fn end_ability(&mut self, id: EntityId, kind: AbilityKind) -> WorldResult<()> {
        let entity = self.entity_mut(id)?;
        if let Some(handle) = entity.find_ability(kind) {
            entity.end_ability(handle);
        }
        self.process_events(id);
        Ok(())
    }

    /// Cancels every active ability tagged with `parent`.
    pub fn cancel_abilities(&mut self, id: EntityId, parent: GameplayTag) -> WorldResult<()> {
        self.entity_mut(id)?.cancel_abilities_with_tag(parent);
        self.process_events(id);
        Ok(())
    }

    /// Server: a client asked to activate a predicted ability.
    ///
    /// A refusal is reported back with its fail tags.
    pub(crate) fn server_activate_ability(
        &mut self,
        id: EntityId,
        kind: AbilityKind,
        target_weapon: Option<WeaponId>,
    ) -> WorldResult<()> {
        let handle = self.entity_ref(id)?.find_ability(kind);
        let result = match handle {
            Some(handle) => self.activate_on_server(id, handle, kind, target_weapon),
            None => Err(WorldError::AbilityNotGranted { entity: id, kind }),
        };
        if let Err(err) = &result {
            let fail_tags = match err {
                WorldError::Ability(err) => err.fail_tags().to_vec(),
                _ => Vec::new(),
            };
            self.send_to_owner(
                id,
                ClientRpc::AbilityActivationFailed {
                    entity: id,
                    kind,
                    fail_tags,
                },
            );
        }
        result
    }

    fn activate_on_server(
        &mut self,
        id: EntityId,
        handle: AbilityHandle,
        kind: AbilityKind,
        target_weapon: Option<WeaponId>,
    ) -> WorldResult<()> {
        let result = self.entity_mut(id)?.try_activate_ability(handle);
        self.process_events(id);
        result?;
        debug!(target: "arena::abilities", entity = %id, ?kind, "ability activated");

        if kind.changes_weapon() {
            let held = target_weapon.filter(|w| {
                self.entities
                    .get(&id)
                    .is_some_and(|e| e.inventory.contains(*w))
            });
            let target = match held {
                Some(weapon) => Some(weapon),
                None => self.cycle_target(id, kind == AbilityKind::NextWeapon)?,
            };
            let current = self.entity_ref(id)?.current_weapon;
            if let Some(target) = target.filter(|t| Some(*t) != current) {
                self.unequip_current_weapon(id);
                self.set_current_weapon(id, Some(target), None);
            }
            self.open_weapon_change_windows(id)?;
        }
        Ok(())
    }

    /// Blocks further weapon changes for a short cooldown and delays the
    /// push of the current weapon back to the owner.
    fn open_weapon_change_windows(&mut self, id: EntityId) -> WorldResult<()> {
        let cooldown = EffectSpec::for_ticks("WeaponChangeDelay", self.config.weapon_change_delay_ticks)
            .granting(GameplayTag::WeaponChanging);
        let delay = EffectSpec::for_ticks(
            "WeaponChangeDelayReplication",
            self.config.weapon_change_replication_delay_ticks,
        )
        .granting(GameplayTag::AbilityWeaponIsChangingDelayReplication);
        self.apply_effect(id, &cooldown, EffectContext::default())?;
        self.apply_effect(id, &delay, EffectContext::default())?;
        Ok(())
    }
}
