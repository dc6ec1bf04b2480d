//! Server-authoritative inventory: adds, removals, drops and pickups.

use std::f32::consts::TAU;

use glam::Vec3;
use tracing::{debug, info};

use super::{World, WorldError, WorldResult};
use crate::abilities::AbilitySource;
use crate::effects::ModOp;
use crate::net::ClientRpc;
use crate::tags::GameplayTag;
use crate::types::{EntityId, WeaponId};
use crate::weapon::{AmmoSlot, InventoryError};

/// Tags that refuse weapon pickups.
const PICKUP_RESTRICTED: [GameplayTag; 2] = [GameplayTag::Dead, GameplayTag::KnockedDown];

impl World {
    /// Server: adds `weapon` to the inventory of `id`.
    ///
    /// At most one weapon per kind is held. A duplicate is absorbed instead:
    /// its clip ammo is added to the matching reserve pools and the weapon
    /// is destroyed.
    ///
    /// # Errors
    ///
    /// - [`InventoryError::NotAuthority`] on a client; nothing changes.
    /// - [`InventoryError::DuplicateKind`] after the refund, listing what was
    ///   refunded.
    /// - [`InventoryError::AlreadyOwned`] or [`InventoryError::Full`].
    pub fn add_to_inventory(&mut self, id: EntityId, weapon: WeaponId, equip: bool) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        if !entity.has_authority() {
            return Err(InventoryError::NotAuthority.into());
        }
        let item = self
            .weapons
            .get(&weapon)
            .ok_or(InventoryError::UnknownWeapon(weapon))?;
        let kind = item.kind;
        if let Some(owner) = item.owner {
            return Err(InventoryError::AlreadyOwned { weapon, owner }.into());
        }
        let def = self
            .catalog
            .get(kind)
            .ok_or(InventoryError::UnknownKind(kind))?;

        let held_same_kind = entity
            .inventory
            .iter()
            .any(|held| self.weapons.get(&held).is_some_and(|w| w.kind == kind));
        if held_same_kind {
            let mut refunded = Vec::new();
            for slot in [AmmoSlot::Primary, AmmoSlot::Secondary] {
                if let Some(attribute) = def.reserve_attribute(slot) {
                    refunded.push((attribute, item.clip_ammo(slot) as f32));
                }
            }
            let entity = self.entity_mut(id)?;
            for (attribute, amount) in &refunded {
                entity.attributes.apply_mod(*attribute, ModOp::Additive, *amount);
            }
            self.process_events(id);
            self.destroy_weapon(weapon);
            info!(target: "arena::inventory", entity = %id, %weapon, ?refunded, "duplicate weapon absorbed as ammo");
            return Err(InventoryError::DuplicateKind {
                kind,
                weapon,
                refunded,
            }
            .into());
        }

        let abilities = def.abilities.clone();
        let entity = self.entity_mut(id)?;
        entity.inventory.push(weapon)?;
        for ability in abilities {
            entity.grant_ability(ability, AbilitySource::Weapon(weapon));
        }
        if let Some(item) = self.weapons.get_mut(&weapon) {
            item.set_owner(Some(id));
        }
        debug!(target: "arena::inventory", entity = %id, %weapon, "added to inventory");

        if equip {
            self.equip_weapon(id, Some(weapon))?;
            let current = self.entity_ref(id)?.current_weapon;
            self.send_to_owner(
                id,
                ClientRpc::SyncCurrentWeapon {
                    entity: id,
                    weapon: current,
                },
            );
        }
        self.process_events(id);
        Ok(())
    }

    /// Server: removes `weapon` from the inventory of `id`.
    ///
    /// The weapon is unequipped first if current, loses its granted
    /// abilities and owner, and is reset.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotInInventory`] if `id` does not hold `weapon`.
    pub fn remove_from_inventory(&mut self, id: EntityId, weapon: WeaponId) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        if !entity.has_authority() {
            return Err(InventoryError::NotAuthority.into());
        }
        if !entity.inventory.contains(weapon) {
            return Err(InventoryError::NotInInventory { entity: id, weapon }.into());
        }
        if entity.current_weapon == Some(weapon) {
            self.unequip_current_weapon(id);
        }
        let entity = self.entity_mut(id)?;
        entity.inventory.remove(weapon);
        entity.remove_abilities_from(AbilitySource::Weapon(weapon));
        if let Some(item) = self.weapons.get_mut(&weapon) {
            item.set_owner(None);
            item.reset();
        }
        self.process_events(id);
        debug!(target: "arena::inventory", entity = %id, %weapon, "removed from inventory");
        Ok(())
    }

    /// Server: unequips and drops every weapon around the entity.
    ///
    /// Weapons are removed last to first and scattered on a circle of
    /// `drop_radius` around the entity, weapon `i` of `n` at angle `2πi/n`.
    /// Returns the dropped weapons with their drop locations.
    pub fn remove_all_weapons(&mut self, id: EntityId) -> WorldResult<Vec<(WeaponId, Vec3)>> {
        self.require_authority(id, "remove_all_weapons")?;
        self.unequip_current_weapon(id);

        let entity = self.entity_ref(id)?;
        let origin = entity.location;
        let held: Vec<WeaponId> = entity.inventory.iter().collect();
        let count = held.len() as f32;
        let radius = self.config.drop_radius;

        let mut dropped = Vec::with_capacity(held.len());
        for (index, weapon) in held.iter().enumerate().rev() {
            self.remove_from_inventory(id, *weapon)?;
            let angle = (index as f32 / count) * TAU;
            let location = origin + Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
            if let Some(item) = self.weapons.get_mut(weapon) {
                item.drop_at(location);
            }
            dropped.push((*weapon, location));
        }
        if !dropped.is_empty() {
            info!(target: "arena::inventory", entity = %id, count = dropped.len(), "dropped all weapons");
        }
        Ok(dropped)
    }

    /// Server: entity touches a weapon pickup.
    ///
    /// Refused while dead or knocked down. The weapon is equipped if the
    /// entity holds nothing.
    pub fn pick_up(&mut self, id: EntityId, weapon: WeaponId) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        let blocking = entity.tags().matching_any(&PICKUP_RESTRICTED);
        if !blocking.is_empty() {
            return Err(InventoryError::PickupRestricted { tags: blocking }.into());
        }
        let equip = entity.current_weapon.is_none();
        let item = self
            .weapons
            .get(&weapon)
            .ok_or(WorldError::UnknownWeapon(weapon))?;
        if !item.pickup_enabled {
            if let Some(owner) = item.owner {
                return Err(InventoryError::AlreadyOwned { weapon, owner }.into());
            }
        }
        self.add_to_inventory(id, weapon, equip)
    }

    /// Server: spawns the template's default weapons and equips the first.
    pub(crate) fn spawn_default_inventory(&mut self, id: EntityId) -> WorldResult<()> {
        let entity = self.entity_ref(id)?;
        let kinds = entity.template.default_weapons.clone();
        let location = entity.location;
        for (index, kind) in kinds.into_iter().enumerate() {
            let weapon = self.spawn_weapon(kind, location)?;
            match self.add_to_inventory(id, weapon, index == 0) {
                Ok(()) | Err(WorldError::Inventory(InventoryError::DuplicateKind { .. })) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
