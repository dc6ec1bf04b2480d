//! Snapshot capture on the server and application on clients.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{World, WorldResult};
use crate::replication::{
    EntitySnapshot, ReplicatedField, Viewer, WeaponSnapshot, WorldSnapshot, attribute_field, is_visible,
};
use crate::tags::GameplayTag;
use crate::types::{ControllerId, EntityId, WeaponId};
use crate::weapon::AmmoSlot;

impl World {
    /// Server: the replicated state as seen by `viewer`'s connection.
    pub fn capture_snapshot(&self, viewer: ControllerId) -> WorldSnapshot {
        let relation = |controller: Option<ControllerId>| {
            if controller == Some(viewer) {
                Viewer::Owner
            } else {
                Viewer::NonOwner
            }
        };

        let entities = self
            .entities
            .values()
            .map(|entity| {
                let seen_as = relation(entity.controller_id());
                let attributes = entity
                    .attributes
                    .iter()
                    .filter(|(attribute, _)| is_visible(attribute_field(*attribute), seen_as))
                    .map(|(attribute, value)| (attribute, value.current))
                    .collect();
                let tags = if is_visible(ReplicatedField::Tags, seen_as) {
                    entity.granted_tag_counts().iter().collect()
                } else {
                    Vec::new()
                };
                let inventory = if is_visible(ReplicatedField::Inventory, seen_as) {
                    entity.inventory.as_slice().to_vec()
                } else {
                    Vec::new()
                };
                EntitySnapshot {
                    id: entity.id,
                    kind: entity.kind,
                    template: entity.template.name.clone(),
                    controller: entity.controller,
                    attributes,
                    tags,
                    inventory,
                    current_weapon: is_visible(ReplicatedField::CurrentWeapon, seen_as)
                        .then_some(entity.current_weapon),
                    location: is_visible(ReplicatedField::Location, seen_as).then_some(entity.location),
                }
            })
            .collect();

        let weapons = self
            .weapons
            .values()
            .map(|weapon| {
                let owner = weapon.owner.and_then(|id| self.entities.get(&id));
                let seen_as = relation(owner.and_then(|e| e.controller_id()));
                // The owner predicts its clip while firing.
                let firing = owner.is_some_and(|e| e.has_tag(GameplayTag::WeaponIsFiring));
                let clip_visible = is_visible(ReplicatedField::ClipAmmo, seen_as) && !firing;
                WeaponSnapshot {
                    id: weapon.id,
                    kind: weapon.kind,
                    owner: is_visible(ReplicatedField::WeaponOwner, seen_as).then_some(weapon.owner),
                    primary_clip_ammo: clip_visible.then_some(weapon.primary_clip_ammo),
                    secondary_clip_ammo: clip_visible.then_some(weapon.secondary_clip_ammo),
                    location: is_visible(ReplicatedField::WeaponLocation, seen_as).then_some(weapon.location),
                    pickup_enabled: weapon.pickup_enabled,
                }
            })
            .collect();

        WorldSnapshot {
            tick: self.tick,
            entities,
            weapons,
        }
    }

    /// Client: brings the local copy in line with a server snapshot.
    ///
    /// Weapons are applied before entities so inventories and current
    /// weapons always refer to known weapons. Objects missing from the
    /// snapshot are removed.
    ///
    /// # Errors
    ///
    /// [`super::WorldError::NotAuthority`] on the server, which never
    /// receives snapshots.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> WorldResult<()> {
        if self.is_server() {
            return Err(super::WorldError::NotAuthority {
                operation: "apply_snapshot",
            });
        }
        self.tick = snapshot.tick;

        let seen_weapons: BTreeSet<WeaponId> = snapshot.weapons.iter().map(|w| w.id).collect();
        for replicated in snapshot.weapons {
            self.apply_weapon_snapshot(replicated);
        }
        self.weapons.retain(|id, _| seen_weapons.contains(id));

        let seen_entities: BTreeSet<EntityId> = snapshot.entities.iter().map(|e| e.id).collect();
        for replicated in snapshot.entities {
            let id = replicated.id;
            if let Err(err) = self.apply_entity_snapshot(replicated) {
                warn!(target: "arena::replication", entity = %id, %err, "skipping replicated entity");
            }
        }
        let stale: Vec<EntityId> = self
            .entities
            .keys()
            .filter(|id| !seen_entities.contains(id))
            .copied()
            .collect();
        for id in stale {
            self.entities.remove(&id);
            debug!(target: "arena::replication", entity = %id, "entity left relevancy");
        }
        Ok(())
    }

    fn apply_weapon_snapshot(&mut self, replicated: WeaponSnapshot) {
        let id = replicated.id;
        if !self.weapons.contains_key(&id) {
            let location = replicated.location.unwrap_or_default();
            if let Err(err) = self.insert_weapon(id, replicated.kind, location) {
                warn!(target: "arena::replication", weapon = %id, %err, "skipping replicated weapon");
                return;
            }
        }
        if let Some(weapon) = self.weapons.get_mut(&id) {
            if let Some(owner) = replicated.owner {
                weapon.owner = owner;
            }
            if let Some(location) = replicated.location {
                weapon.location = location;
            }
            weapon.pickup_enabled = replicated.pickup_enabled;
        }
        let clips = [
            (AmmoSlot::Primary, replicated.primary_clip_ammo),
            (AmmoSlot::Secondary, replicated.secondary_clip_ammo),
        ];
        for (slot, value) in clips {
            if let Some(value) = value {
                if let Err(err) = self.set_clip_ammo(id, slot, value) {
                    warn!(target: "arena::replication", weapon = %id, %err, "clip ammo not applied");
                }
            }
        }
    }

    fn apply_entity_snapshot(&mut self, replicated: EntitySnapshot) -> WorldResult<()> {
        let id = replicated.id;
        if !self.entities.contains_key(&id) {
            let location = replicated.location.unwrap_or_default();
            self.insert_entity(id, &replicated.template, replicated.controller, location)?;
            debug!(target: "arena::replication", entity = %id, "entity became relevant");
        }

        let entity = self.entity_mut(id)?;
        entity.controller = replicated.controller;
        for (attribute, value) in replicated.attributes {
            entity.attributes.replicate(attribute, value);
        }
        entity.apply_replicated_tags(&replicated.tags);
        if let Some(location) = replicated.location {
            entity.location = location;
        }
        let inventory_changed = entity.inventory.as_slice() != replicated.inventory.as_slice();
        if inventory_changed {
            entity.inventory.replace_with(&replicated.inventory);
        }
        let last_weapon = entity.current_weapon;
        let weapon_changed = replicated
            .current_weapon
            .filter(|current| *current != last_weapon);
        if let Some(current) = weapon_changed {
            entity.current_weapon = current;
        }
        self.process_events(id);

        if inventory_changed {
            self.on_rep_inventory(id);
        }
        if weapon_changed.is_some() {
            self.on_rep_current_weapon(id, last_weapon);
        }
        Ok(())
    }
}
