//! Numeric attributes and the clamping pipeline that guards them.
//!
//! Every entity carries one [`AttributeStore`]. Values are only ever written
//! through the store, which runs the pre-change rules (max rescale, move
//! speed bounds) before committing and the clamp safety net after.

mod store;

pub use store::{AttributeChange, AttributeDefaults, AttributeStore, AttributeValue};

use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::tags::GameplayTag;

/// Every attribute an entity carries.
///
/// The first block is the character set replicated to everyone, the second
/// is the character-owned reserve ammo pool keyed by ammo tag.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    Health,
    MaxHealth,
    HealthRegenRate,
    Mana,
    MaxMana,
    ManaRegenRate,
    Stamina,
    MaxStamina,
    StaminaRegenRate,
    Shield,
    MaxShield,
    ShieldRegenRate,
    Armor,
    MoveSpeed,
    CharacterLevel,
    Xp,
    XpBounty,
    Gold,
    GoldBounty,
    /// Transient meta attribute: accumulates incoming damage and is consumed
    /// by the damage resolution step.
    Damage,

    RifleReserveAmmo,
    MaxRifleReserveAmmo,
    RocketReserveAmmo,
    MaxRocketReserveAmmo,
    ShotgunReserveAmmo,
    MaxShotgunReserveAmmo,
}

impl Attribute {
    /// Dense index used by [`AttributeStore`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The max attribute bounding this one, for clamped pairs.
    pub const fn max_attribute(self) -> Option<Attribute> {
        match self {
            Self::Health => Some(Self::MaxHealth),
            Self::Mana => Some(Self::MaxMana),
            Self::Stamina => Some(Self::MaxStamina),
            Self::Shield => Some(Self::MaxShield),
            Self::RifleReserveAmmo => Some(Self::MaxRifleReserveAmmo),
            Self::RocketReserveAmmo => Some(Self::MaxRocketReserveAmmo),
            Self::ShotgunReserveAmmo => Some(Self::MaxShotgunReserveAmmo),
            _ => None,
        }
    }

    /// The current attribute rescaled when this max attribute changes.
    ///
    /// Only health, mana and stamina keep their ratio. Shield and reserve
    /// ammo are merely clamped into the new bound.
    pub const fn rescaled_current(self) -> Option<Attribute> {
        match self {
            Self::MaxHealth => Some(Self::Health),
            Self::MaxMana => Some(Self::Mana),
            Self::MaxStamina => Some(Self::Stamina),
            _ => None,
        }
    }

    /// The current attribute bounded by this max attribute.
    pub const fn bounded_current(self) -> Option<Attribute> {
        match self {
            Self::MaxHealth => Some(Self::Health),
            Self::MaxMana => Some(Self::Mana),
            Self::MaxStamina => Some(Self::Stamina),
            Self::MaxShield => Some(Self::Shield),
            Self::MaxRifleReserveAmmo => Some(Self::RifleReserveAmmo),
            Self::MaxRocketReserveAmmo => Some(Self::RocketReserveAmmo),
            Self::MaxShotgunReserveAmmo => Some(Self::ShotgunReserveAmmo),
            _ => None,
        }
    }

    /// Reserve-ammo attribute for an ammo-type tag.
    pub const fn reserve_ammo_for(ammo: GameplayTag) -> Option<Attribute> {
        match ammo {
            GameplayTag::AmmoRifle => Some(Self::RifleReserveAmmo),
            GameplayTag::AmmoRocket => Some(Self::RocketReserveAmmo),
            GameplayTag::AmmoShotgun => Some(Self::ShotgunReserveAmmo),
            _ => None,
        }
    }

    /// True for the reserve ammo pool and its bounds.
    pub const fn is_ammo(self) -> bool {
        matches!(
            self,
            Self::RifleReserveAmmo
                | Self::MaxRifleReserveAmmo
                | Self::RocketReserveAmmo
                | Self::MaxRocketReserveAmmo
                | Self::ShotgunReserveAmmo
                | Self::MaxShotgunReserveAmmo
        )
    }

    /// Meta attributes never leave the server.
    pub const fn is_meta(self) -> bool {
        matches!(self, Self::Damage)
    }
}

impl core::fmt::Display for Attribute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
