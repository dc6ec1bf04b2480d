//! Per-field replication policy and the snapshot types it shapes.
//!
//! The table below is the only place visibility is decided. Snapshot capture
//! asks [`policy`] for every field and leaves out what the viewer must not
//! see, so the owning client never receives its own current weapon.

use glam::Vec3;

use crate::attributes::Attribute;
use crate::entity::EntityKind;
use crate::tags::GameplayTag;
use crate::types::{Controller, EntityId, Tick, WeaponId};
use crate::weapon::WeaponKind;

/// Who receives a replicated field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplicationPolicy {
    Everyone,
    OwnerOnly,
    /// Everyone except the owning connection.
    SimulatedOnly,
    /// Never leaves the server.
    ServerOnly,
}

/// Relation of a receiving connection to the replicated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Viewer {
    Owner,
    NonOwner,
}

impl ReplicationPolicy {
    pub const fn visible_to(self, viewer: Viewer) -> bool {
        match self {
            Self::Everyone => true,
            Self::OwnerOnly => matches!(viewer, Viewer::Owner),
            Self::SimulatedOnly => matches!(viewer, Viewer::NonOwner),
            Self::ServerOnly => false,
        }
    }
}

/// Every replicated field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplicatedField {
    /// Health family and the rest of the character set.
    CharacterAttributes,
    /// Transient meta attributes such as `Damage`.
    MetaAttributes,
    ReserveAmmo,
    Tags,
    Inventory,
    CurrentWeapon,
    /// The owning client predicts its own movement.
    Location,
    WeaponOwner,
    ClipAmmo,
    WeaponLocation,
}

/// The replication policy table.
pub const fn policy(field: ReplicatedField) -> ReplicationPolicy {
    match field {
        ReplicatedField::CharacterAttributes => ReplicationPolicy::Everyone,
        ReplicatedField::MetaAttributes => ReplicationPolicy::ServerOnly,
        ReplicatedField::ReserveAmmo => ReplicationPolicy::OwnerOnly,
        ReplicatedField::Tags => ReplicationPolicy::Everyone,
        ReplicatedField::Inventory => ReplicationPolicy::Everyone,
        ReplicatedField::CurrentWeapon => ReplicationPolicy::SimulatedOnly,
        ReplicatedField::Location => ReplicationPolicy::SimulatedOnly,
        ReplicatedField::WeaponOwner => ReplicationPolicy::OwnerOnly,
        ReplicatedField::ClipAmmo => ReplicationPolicy::OwnerOnly,
        ReplicatedField::WeaponLocation => ReplicationPolicy::Everyone,
    }
}

/// Field an attribute replicates under.
pub const fn attribute_field(attribute: Attribute) -> ReplicatedField {
    if attribute.is_meta() {
        ReplicatedField::MetaAttributes
    } else if attribute.is_ammo() {
        ReplicatedField::ReserveAmmo
    } else {
        ReplicatedField::CharacterAttributes
    }
}

/// Shorthand for `policy(field).visible_to(viewer)`.
pub const fn is_visible(field: ReplicatedField, viewer: Viewer) -> bool {
    policy(field).visible_to(viewer)
}

/// Replicated view of one entity for one viewer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub template: String,
    pub controller: Option<Controller>,
    pub attributes: Vec<(Attribute, f32)>,
    /// Tags granted by active effects. Loose tags stay local.
    pub tags: Vec<(GameplayTag, u32)>,
    pub inventory: Vec<WeaponId>,
    /// Outer `None`: not visible to this viewer.
    pub current_weapon: Option<Option<WeaponId>>,
    pub location: Option<Vec3>,
}

/// Replicated view of one weapon for one viewer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponSnapshot {
    pub id: WeaponId,
    pub kind: WeaponKind,
    pub owner: Option<Option<EntityId>>,
    pub primary_clip_ammo: Option<u32>,
    pub secondary_clip_ammo: Option<u32>,
    pub location: Option<Vec3>,
    pub pickup_enabled: bool,
}

/// Everything one connection receives for one server tick.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub entities: Vec<EntitySnapshot>,
    pub weapons: Vec<WeaponSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_weapon_never_reaches_owner() {
        assert!(!is_visible(ReplicatedField::CurrentWeapon, Viewer::Owner));
        assert!(is_visible(ReplicatedField::CurrentWeapon, Viewer::NonOwner));
    }

    #[test]
    fn ammo_only_reaches_owner() {
        assert!(is_visible(ReplicatedField::ClipAmmo, Viewer::Owner));
        assert!(!is_visible(ReplicatedField::ClipAmmo, Viewer::NonOwner));
        assert_eq!(
            attribute_field(Attribute::RifleReserveAmmo),
            ReplicatedField::ReserveAmmo
        );
    }

    #[test]
    fn health_family_reaches_everyone() {
        for attribute in [Attribute::Health, Attribute::MaxShield, Attribute::Xp] {
            let field = attribute_field(attribute);
            assert!(is_visible(field, Viewer::Owner));
            assert!(is_visible(field, Viewer::NonOwner));
        }
        assert!(!is_visible(attribute_field(Attribute::Damage), Viewer::Owner));
    }
}
