use arrayvec::ArrayVec;

use super::WeaponKind;
use crate::attributes::Attribute;
use crate::config::GameConfig;
use crate::error::{ErrorSeverity, GameError};
use crate::tags::GameplayTag;
use crate::types::{EntityId, WeaponId};

/// Weapons owned by one entity, in pickup order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inventory {
    weapons: ArrayVec<WeaponId, { GameConfig::MAX_INVENTORY_WEAPONS }>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, weapon: WeaponId) -> bool {
        self.weapons.contains(&weapon)
    }

    pub fn position(&self, weapon: WeaponId) -> Option<usize> {
        self.weapons.iter().position(|w| *w == weapon)
    }

    pub fn get(&self, index: usize) -> Option<WeaponId> {
        self.weapons.get(index).copied()
    }

    /// Appends `weapon`, keeping pickup order.
    pub fn push(&mut self, weapon: WeaponId) -> Result<(), InventoryError> {
        self.weapons
            .try_push(weapon)
            .map_err(|_| InventoryError::Full { weapon })
    }

    /// Removes `weapon`. Returns false if it was not held.
    pub fn remove(&mut self, weapon: WeaponId) -> bool {
        match self.position(weapon) {
            Some(index) => {
                self.weapons.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = WeaponId> + '_ {
        self.weapons.iter().copied()
    }

    pub fn as_slice(&self) -> &[WeaponId] {
        &self.weapons
    }

    /// Replaces the list with replicated contents, truncating overflow.
    pub fn replace_with(&mut self, weapons: &[WeaponId]) {
        self.weapons.clear();
        for weapon in weapons.iter().take(GameConfig::MAX_INVENTORY_WEAPONS) {
            self.weapons.push(*weapon);
        }
    }
}

/// Index selected by "next weapon" from `current` over `len` weapons.
///
/// With nothing equipped the first weapon is selected.
pub fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(index) => (index + 1) % len,
        None => 0,
    })
}

/// Index selected by "previous weapon" from `current` over `len` weapons.
///
/// With nothing equipped the first weapon is selected.
pub fn previous_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(index) => (index + len - 1) % len,
        None => 0,
    })
}

/// Errors raised by inventory and weapon ownership operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory changes require authority")]
    NotAuthority,

    #[error("an instance of {kind:?} is already held; {weapon} was absorbed as ammo")]
    DuplicateKind {
        kind: WeaponKind,
        weapon: WeaponId,
        refunded: Vec<(Attribute, f32)>,
    },

    #[error("{weapon} is not in the inventory of {entity}")]
    NotInInventory { entity: EntityId, weapon: WeaponId },

    #[error("{weapon} is already owned by {owner}")]
    AlreadyOwned { weapon: WeaponId, owner: EntityId },

    #[error("inventory is full, cannot add {weapon}")]
    Full { weapon: WeaponId },

    #[error("pickup refused while {tags:?} present")]
    PickupRestricted { tags: Vec<GameplayTag> },

    #[error("unknown {0}")]
    UnknownWeapon(WeaponId),

    #[error("unknown {0}")]
    UnknownEntity(EntityId),

    #[error("no definition for {0:?}")]
    UnknownKind(WeaponKind),
}

impl GameError for InventoryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotAuthority
            | Self::DuplicateKind { .. }
            | Self::Full { .. }
            | Self::PickupRestricted { .. } => ErrorSeverity::Recoverable,
            Self::NotInInventory { .. }
            | Self::AlreadyOwned { .. }
            | Self::UnknownWeapon(_)
            | Self::UnknownEntity(_) => ErrorSeverity::Validation,
            Self::UnknownKind(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthority => "INVENTORY_NOT_AUTHORITY",
            Self::DuplicateKind { .. } => "INVENTORY_DUPLICATE_KIND",
            Self::NotInInventory { .. } => "INVENTORY_NOT_FOUND",
            Self::AlreadyOwned { .. } => "INVENTORY_ALREADY_OWNED",
            Self::Full { .. } => "INVENTORY_FULL",
            Self::PickupRestricted { .. } => "INVENTORY_PICKUP_RESTRICTED",
            Self::UnknownWeapon(_) => "INVENTORY_UNKNOWN_WEAPON",
            Self::UnknownEntity(_) => "INVENTORY_UNKNOWN_ENTITY",
            Self::UnknownKind(_) => "INVENTORY_UNKNOWN_KIND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycling_wraps_in_both_directions() {
        assert_eq!(next_index(Some(1), 3), Some(2));
        assert_eq!(next_index(Some(2), 3), Some(0));
        assert_eq!(previous_index(Some(0), 3), Some(2));
        assert_eq!(previous_index(Some(2), 3), Some(1));
    }

    #[test]
    fn cycling_without_current_selects_first() {
        assert_eq!(next_index(None, 3), Some(0));
        assert_eq!(previous_index(None, 3), Some(0));
        assert_eq!(next_index(None, 0), None);
    }

    #[test]
    fn inventory_keeps_pickup_order() {
        let mut inventory = Inventory::new();
        for id in [5, 2, 9] {
            inventory.push(WeaponId(id)).unwrap();
        }
        assert!(inventory.remove(WeaponId(2)));
        assert!(!inventory.remove(WeaponId(2)));
        assert_eq!(inventory.as_slice(), &[WeaponId(5), WeaponId(9)]);
    }

    #[test]
    fn inventory_rejects_overflow() {
        let mut inventory = Inventory::new();
        for id in 0..GameConfig::MAX_INVENTORY_WEAPONS as u32 {
            inventory.push(WeaponId(id)).unwrap();
        }
        assert_eq!(
            inventory.push(WeaponId(99)),
            Err(InventoryError::Full {
                weapon: WeaponId(99)
            })
        );
    }
}
