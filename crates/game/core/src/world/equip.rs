//! Current weapon selection and the client/server reconciliation around it.
//!
//! The owning client changes weapons ahead of the server and flags the
//! change as local. The server never replicates the current weapon back to
//! its owner through snapshots; it pushes an explicit sync instead, once the
//! delay-replication window after a change closes or when a predicted change
//! failed.

use tracing::{debug, warn};

use super::{World, WorldError, WorldResult};
use crate::abilities::AbilityKind;
use crate::entity::AmmoBindings;
use crate::net::{ClientRpc, ServerRpc};
use crate::notify::{HudUpdate, Notification};
use crate::observe::Listener;
use crate::tags::{GameplayTag, TagCountChange};
use crate::types::{EntityId, WeaponId};
use crate::weapon::{AmmoSlot, next_index, previous_index};

impl World {
    // ========================================================================
    // Equip
    // ========================================================================

    /// Equips `weapon`, or clears the current weapon with `None`.
    ///
    /// On a client the change is applied locally, sent to the server and
    /// flagged as a local change awaiting confirmation.
    pub fn equip_weapon(&mut self, id: EntityId, weapon: Option<WeaponId>) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        let last = entity.current_weapon;
        if entity.has_authority() {
            self.set_current_weapon(id, weapon, last);
        } else {
            self.send_to_server(ServerRpc::EquipWeapon { entity: id, weapon });
            self.set_current_weapon(id, weapon, last);
            self.entity_mut(id)?.changed_weapon_locally = true;
        }
        Ok(())
    }

    /// Selects the next weapon in inventory order, wrapping around.
    pub fn next_weapon(&mut self, id: EntityId) -> WorldResult<()> {
        self.cycle_weapon(id, true)
    }

    /// Selects the previous weapon in inventory order, wrapping around.
    pub fn previous_weapon(&mut self, id: EntityId) -> WorldResult<()> {
        self.cycle_weapon(id, false)
    }

    fn cycle_weapon(&mut self, id: EntityId, forward: bool) -> WorldResult<()> {
        let Some(target) = self.cycle_target(id, forward)? else {
            return Ok(());
        };
        self.unequip_current_weapon(id);
        self.equip_weapon(id, Some(target))
    }

    /// Weapon a next/previous switch would select; `None` with fewer than two
    /// weapons.
    pub(crate) fn cycle_target(&self, id: EntityId, forward: bool) -> WorldResult<Option<WeaponId>> {
        let entity = self.entity_ref(id)?;
        let len = entity.inventory.len();
        if len < 2 {
            return Ok(None);
        }
        let current = entity
            .current_weapon
            .and_then(|weapon| entity.inventory.position(weapon));
        let index = if forward {
            next_index(current, len)
        } else {
            previous_index(current, len)
        };
        Ok(index.and_then(|index| entity.inventory.get(index)))
    }

    /// Makes `new` the current weapon, replacing `last`.
    ///
    /// Does nothing when they are equal. Active weapon abilities are
    /// cancelled, the old weapon loses its listeners, and the new one takes
    /// over the current-weapon tag, HUD and ammo listeners.
    pub(crate) fn set_current_weapon(&mut self, id: EntityId, new: Option<WeaponId>, last: Option<WeaponId>) {
        if new == last {
            return;
        }
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.cancel_abilities_with_tag(GameplayTag::AbilityWeapon);
        self.unequip_weapon(id, last);

        let Some(new) = new else {
            self.unequip_current_weapon(id);
            return;
        };
        let Some(def) = self.weapon_def(new).cloned() else {
            warn!(target: "arena::equip", entity = %id, weapon = %new, "equipping unknown weapon");
            return;
        };
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };

        let old_tag = entity.current_weapon_tag;
        if let Err(err) = entity.remove_loose_tag(old_tag) {
            warn!(target: "arena::equip", entity = %id, %err, "current weapon tag missing");
        }
        entity.current_weapon = Some(new);
        entity.current_weapon_tag = def.weapon_tag;
        entity.add_loose_tag(def.weapon_tag);

        let reserve_attribute = def.reserve_attribute(AmmoSlot::Primary);
        let reserve = reserve_attribute.map_or(0.0, |a| entity.attributes.get(a));
        let reserve_subscription = reserve_attribute.map(|attribute| {
            entity
                .attribute_listeners
                .subscribe(attribute, Listener::EquippedAmmo { entity: id })
        });

        let Some(weapon) = self.weapons.get_mut(&new) else {
            return;
        };
        weapon.set_owner(Some(id));
        weapon.equip();
        let clip = weapon.primary_clip_ammo;
        let clip_subscription = weapon.subscribe_ammo(AmmoSlot::Primary, Listener::EquippedAmmo { entity: id });

        if let Some(entity) = self.entities.get_mut(&id) {
            entity.ammo_bindings = Some(AmmoBindings {
                weapon: new,
                clip: clip_subscription,
                reserve: reserve_subscription,
            });
        }

        self.hud(id, HudUpdate::EquippedWeaponIcon(Some(def.icon.clone())));
        self.hud(id, HudUpdate::ClipAmmo(clip));
        self.hud(id, HudUpdate::ReserveAmmo(reserve.max(0.0) as u32));
        if let Some(montage) = def.equip_montage {
            self.notify(Notification::PlayMontage { entity: id, montage });
        }
        debug!(target: "arena::equip", entity = %id, weapon = %new, "equipped");
        self.process_events(id);
    }

    /// Detaches `weapon` from the entity's ammo listeners and unequips it.
    fn unequip_weapon(&mut self, id: EntityId, weapon: Option<WeaponId>) {
        let Some(weapon) = weapon else {
            return;
        };
        if let Some(entity) = self.entities.get_mut(&id) {
            if let Some(bindings) = entity.ammo_bindings.take_if(|b| b.weapon == weapon) {
                if let Some(reserve) = bindings.reserve {
                    entity.attribute_listeners.unsubscribe(reserve);
                }
                if let Some(item) = self.weapons.get_mut(&weapon) {
                    item.unsubscribe_ammo(bindings.clip);
                }
            }
        }
        if let Some(item) = self.weapons.get_mut(&weapon) {
            item.unequip();
        }
    }

    /// Clears the current weapon, swapping its tag for `Weapon.Equipped.None`
    /// and blanking the HUD.
    pub(crate) fn unequip_current_weapon(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let old_tag = entity.current_weapon_tag;
        if let Err(err) = entity.remove_loose_tag(old_tag) {
            warn!(target: "arena::equip", entity = %id, %err, "current weapon tag missing");
        }
        entity.current_weapon_tag = GameplayTag::WeaponEquippedNone;
        entity.add_loose_tag(GameplayTag::WeaponEquippedNone);
        let current = entity.current_weapon.take();
        self.unequip_weapon(id, current);

        self.hud(id, HudUpdate::EquippedWeaponIcon(None));
        self.hud(id, HudUpdate::ClipAmmo(0));
        self.hud(id, HudUpdate::ReserveAmmo(0));
        self.process_events(id);
    }

    // ========================================================================
    // Clip ammo
    // ========================================================================

    /// Writes a clip ammo value, bounded by the weapon's capacity, and relays
    /// primary clip changes to the HUD of the equipping entity.
    pub fn set_clip_ammo(&mut self, weapon: WeaponId, slot: AmmoSlot, value: u32) -> WorldResult<()> {
        let kind = self
            .weapons
            .get(&weapon)
            .ok_or(WorldError::UnknownWeapon(weapon))?
            .kind;
        let def = self
            .catalog
            .get(kind)
            .ok_or(WorldError::UnknownWeaponKind(kind))?;
        let Some(item) = self.weapons.get_mut(&weapon) else {
            return Err(WorldError::UnknownWeapon(weapon));
        };
        let Some(change) = item.set_clip_ammo(def, slot, value) else {
            return Ok(());
        };
        let listeners = item.ammo_listeners(slot);
        for listener in listeners {
            if let Listener::EquippedAmmo { entity } = listener {
                self.hud(entity, HudUpdate::ClipAmmo(change.new_value));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Server: an owning client asked to equip a weapon.
    pub(crate) fn server_equip_weapon(&mut self, id: EntityId, weapon: Option<WeaponId>) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        if let Some(weapon) = weapon.filter(|w| !entity.inventory.contains(*w)) {
            warn!(target: "arena::equip", entity = %id, %weapon, "client equipped a weapon it does not hold");
            self.server_sync_current_weapon(id);
            return Ok(());
        }
        self.equip_weapon(id, weapon)
    }

    /// Server: replies with the authoritative current weapon.
    pub(crate) fn server_sync_current_weapon(&mut self, id: EntityId) {
        let current = self.entities.get(&id).and_then(|e| e.current_weapon);
        self.send_to_owner(
            id,
            ClientRpc::SyncCurrentWeapon {
                entity: id,
                weapon: current,
            },
        );
    }

    /// Client: the server pushed its current weapon.
    pub(crate) fn client_sync_current_weapon(&mut self, id: EntityId, weapon: Option<WeaponId>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let last = std::mem::replace(&mut entity.current_weapon, weapon);
        self.on_rep_current_weapon(id, last);
    }

    /// Client: the current weapon changed by replication.
    pub(crate) fn on_rep_current_weapon(&mut self, id: EntityId, last: Option<WeaponId>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.changed_weapon_locally = false;
        let current = entity.current_weapon;
        self.set_current_weapon(id, current, last);
    }

    /// Client: the replicated inventory changed.
    ///
    /// The owner never receives its current weapon through replication, so
    /// it asks for it once weapons arrive.
    pub(crate) fn on_rep_inventory(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if entity.is_locally_controlled() && !entity.inventory.is_empty() && entity.current_weapon.is_none() {
            self.send_to_server(ServerRpc::SyncCurrentWeapon { entity: id });
        }
    }

    /// Server: the delay-replication window after a weapon change closed.
    pub(crate) fn on_weapon_change_delay_tag_changed(&mut self, id: EntityId, change: TagCountChange) {
        if change.tag == GameplayTag::AbilityWeaponIsChangingDelayReplication && change.new_count < 1 {
            self.server_sync_current_weapon(id);
        }
    }

    /// Client: the server refused a predicted ability.
    ///
    /// A refused weapon change that was already applied locally triggers a
    /// resync of the current weapon.
    pub(crate) fn on_ability_activation_failed(&mut self, id: EntityId, kind: AbilityKind, fail_tags: &[GameplayTag]) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        let changes_weapon = entity
            .find_ability(kind)
            .and_then(|handle| entity.abilities().get(handle))
            .is_some_and(|a| a.def.tags.contains(&GameplayTag::AbilityWeaponIsChanging));
        if changes_weapon && entity.changed_weapon_locally {
            warn!(
                target: "arena::equip",
                entity = %id,
                ?kind,
                ?fail_tags,
                "weapon change activation failed, syncing current weapon"
            );
            self.send_to_server(ServerRpc::SyncCurrentWeapon { entity: id });
        }
    }
}
