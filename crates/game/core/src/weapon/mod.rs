//! Weapons, their static definitions, and the per-entity inventory.

mod inventory;

pub use inventory::{Inventory, InventoryError, next_index, previous_index};

use std::collections::BTreeMap;

use glam::Vec3;

use crate::abilities::AbilityDef;
use crate::attributes::Attribute;
use crate::observe::{Listener, SubscriptionId, Subscriptions};
use crate::tags::GameplayTag;
use crate::types::{EntityId, WeaponId};

/// Weapon type. Inventories hold at most one weapon per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponKind(pub u16);

/// Clip a quantity of ammo belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AmmoSlot {
    Primary,
    Secondary,
}

/// Static description of a weapon type, loaded from content.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponDef {
    pub kind: WeaponKind,
    pub name: String,
    /// Tag added to the owner while this weapon is equipped.
    pub weapon_tag: GameplayTag,
    #[cfg_attr(feature = "serde", serde(default = "no_ammo"))]
    pub primary_ammo_type: GameplayTag,
    #[cfg_attr(feature = "serde", serde(default = "no_ammo"))]
    pub secondary_ammo_type: GameplayTag,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_primary_clip_ammo: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_secondary_clip_ammo: u32,
    /// HUD icon identifier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub icon: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub equip_montage: Option<String>,
    /// Abilities granted to the owner while the weapon is in its inventory.
    #[cfg_attr(feature = "serde", serde(default))]
    pub abilities: Vec<AbilityDef>,
}

#[cfg(feature = "serde")]
fn no_ammo() -> GameplayTag {
    GameplayTag::AmmoNone
}

impl WeaponDef {
    pub fn ammo_type(&self, slot: AmmoSlot) -> GameplayTag {
        match slot {
            AmmoSlot::Primary => self.primary_ammo_type,
            AmmoSlot::Secondary => self.secondary_ammo_type,
        }
    }

    pub fn max_clip_ammo(&self, slot: AmmoSlot) -> u32 {
        match slot {
            AmmoSlot::Primary => self.max_primary_clip_ammo,
            AmmoSlot::Secondary => self.max_secondary_clip_ammo,
        }
    }

    /// Reserve attribute fed by `slot`, if its ammo type has one.
    pub fn reserve_attribute(&self, slot: AmmoSlot) -> Option<Attribute> {
        Attribute::reserve_ammo_for(self.ammo_type(slot))
    }
}

/// Every weapon definition known to a world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeaponCatalog {
    defs: BTreeMap<WeaponKind, WeaponDef>,
}

impl WeaponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: WeaponDef) {
        self.defs.insert(def.kind, def);
    }

    pub fn get(&self, kind: WeaponKind) -> Option<&WeaponDef> {
        self.defs.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl FromIterator<WeaponDef> for WeaponCatalog {
    fn from_iter<I: IntoIterator<Item = WeaponDef>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for def in iter {
            catalog.insert(def);
        }
        catalog
    }
}

/// A committed change to a weapon's clip ammo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipAmmoChange {
    pub weapon: WeaponId,
    pub slot: AmmoSlot,
    pub old_value: u32,
    pub new_value: u32,
}

/// A weapon instance, either lying in the world or held in an inventory.
#[derive(Clone, Debug)]
pub struct Weapon {
    pub id: WeaponId,
    pub kind: WeaponKind,
    pub primary_clip_ammo: u32,
    pub secondary_clip_ammo: u32,
    /// At most one owner at a time.
    pub owner: Option<EntityId>,
    pub location: Vec3,
    /// World pickups can be touched; owned weapons cannot.
    pub pickup_enabled: bool,
    pub equipped: bool,
    ammo_listeners: Subscriptions<AmmoSlot>,
}

impl Weapon {
    /// Spawns a weapon with full clips.
    pub fn new(id: WeaponId, def: &WeaponDef, location: Vec3) -> Self {
        Self {
            id,
            kind: def.kind,
            primary_clip_ammo: def.max_primary_clip_ammo,
            secondary_clip_ammo: def.max_secondary_clip_ammo,
            owner: None,
            location,
            pickup_enabled: true,
            equipped: false,
            ammo_listeners: Subscriptions::new(),
        }
    }

    pub fn clip_ammo(&self, slot: AmmoSlot) -> u32 {
        match slot {
            AmmoSlot::Primary => self.primary_clip_ammo,
            AmmoSlot::Secondary => self.secondary_clip_ammo,
        }
    }

    /// Sets clip ammo, bounded by the definition's clip size.
    pub fn set_clip_ammo(&mut self, def: &WeaponDef, slot: AmmoSlot, value: u32) -> Option<ClipAmmoChange> {
        let value = value.min(def.max_clip_ammo(slot));
        let clip = match slot {
            AmmoSlot::Primary => &mut self.primary_clip_ammo,
            AmmoSlot::Secondary => &mut self.secondary_clip_ammo,
        };
        let old_value = std::mem::replace(clip, value);
        (old_value != value).then_some(ClipAmmoChange {
            weapon: self.id,
            slot,
            old_value,
            new_value: value,
        })
    }

    /// Hands the weapon to `owner`, or releases it with `None`.
    pub fn set_owner(&mut self, owner: Option<EntityId>) {
        self.owner = owner;
        self.pickup_enabled = owner.is_none();
    }

    pub fn equip(&mut self) {
        self.equipped = true;
    }

    pub fn unequip(&mut self) {
        self.equipped = false;
    }

    /// Clears per-owner state after removal from an inventory.
    pub fn reset(&mut self) {
        self.equipped = false;
        self.ammo_listeners = Subscriptions::new();
    }

    /// Detaches the weapon and turns it back into a world pickup at `location`.
    pub fn drop_at(&mut self, location: Vec3) {
        self.set_owner(None);
        self.location = location;
    }

    pub fn subscribe_ammo(&mut self, slot: AmmoSlot, listener: Listener) -> SubscriptionId {
        self.ammo_listeners.subscribe(slot, listener)
    }

    pub fn unsubscribe_ammo(&mut self, id: SubscriptionId) -> bool {
        self.ammo_listeners.unsubscribe(id)
    }

    pub fn ammo_listeners(&self, slot: AmmoSlot) -> Vec<Listener> {
        self.ammo_listeners.listeners(slot)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn rifle() -> WeaponDef {
        WeaponDef {
            kind: WeaponKind(1),
            name: "Rifle".into(),
            weapon_tag: GameplayTag::WeaponEquippedRifle,
            primary_ammo_type: GameplayTag::AmmoRifle,
            secondary_ammo_type: GameplayTag::AmmoNone,
            max_primary_clip_ammo: 30,
            max_secondary_clip_ammo: 0,
            icon: "rifle".into(),
            equip_montage: Some("Rifle_Equip".into()),
            abilities: vec![
                AbilityDef::new("RifleFire", crate::abilities::AbilityKind::WeaponFire)
                    .tagged(GameplayTag::AbilityWeaponPrimaryInstant)
                    .owning(GameplayTag::WeaponIsFiring),
            ],
        }
    }

    pub fn shotgun() -> WeaponDef {
        WeaponDef {
            kind: WeaponKind(2),
            name: "Shotgun".into(),
            weapon_tag: GameplayTag::WeaponEquippedShotgun,
            primary_ammo_type: GameplayTag::AmmoShotgun,
            secondary_ammo_type: GameplayTag::AmmoNone,
            max_primary_clip_ammo: 8,
            max_secondary_clip_ammo: 0,
            icon: "shotgun".into(),
            equip_montage: None,
            abilities: Vec::new(),
        }
    }

    pub fn rocket_launcher() -> WeaponDef {
        WeaponDef {
            kind: WeaponKind(3),
            name: "RocketLauncher".into(),
            weapon_tag: GameplayTag::WeaponEquippedRocketLauncher,
            primary_ammo_type: GameplayTag::AmmoRocket,
            secondary_ammo_type: GameplayTag::AmmoRifle,
            max_primary_clip_ammo: 1,
            max_secondary_clip_ammo: 5,
            icon: "rocket".into(),
            equip_montage: None,
            abilities: Vec::new(),
        }
    }

    pub fn catalog() -> WeaponCatalog {
        [rifle(), shotgun(), rocket_launcher()].into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn clip_ammo_is_bounded_by_definition() {
        let def = rifle();
        let mut weapon = Weapon::new(WeaponId(1), &def, Vec3::ZERO);
        assert_eq!(weapon.primary_clip_ammo, 30);
        let change = weapon.set_clip_ammo(&def, AmmoSlot::Primary, 12).unwrap();
        assert_eq!((change.old_value, change.new_value), (30, 12));
        weapon.set_clip_ammo(&def, AmmoSlot::Primary, 99);
        assert_eq!(weapon.primary_clip_ammo, 30);
        assert!(weapon.set_clip_ammo(&def, AmmoSlot::Primary, 30).is_none());
    }

    #[test]
    fn ownership_toggles_pickup() {
        let def = shotgun();
        let mut weapon = Weapon::new(WeaponId(2), &def, Vec3::ZERO);
        weapon.set_owner(Some(EntityId(7)));
        assert!(!weapon.pickup_enabled);
        weapon.drop_at(Vec3::new(1.0, 2.0, 0.0));
        assert!(weapon.pickup_enabled);
        assert_eq!(weapon.owner, None);
        assert_eq!(weapon.location, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn reserve_attribute_follows_ammo_type() {
        let def = rocket_launcher();
        assert_eq!(
            def.reserve_attribute(AmmoSlot::Primary),
            Some(Attribute::RocketReserveAmmo)
        );
        assert_eq!(rifle().reserve_attribute(AmmoSlot::Secondary), None);
    }
}
