//! Gameplay tags: interned, hierarchical status markers.
//!
//! Tags are a closed enum so identity comparison is a discriminant compare.
//! The dotted name of every tag is fixed at compile time and forms a
//! hierarchy: `Ability.Weapon` is the parent of `Ability.Weapon.IsChanging`.

mod counts;

pub use counts::{TagCountChange, TagCounts};

use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ErrorSeverity, GameError};

/// Every tag known to the game.
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
pub enum GameplayTag {
    // ===== character state =====
    #[strum(serialize = "State.Dead")]
    Dead,
    #[strum(serialize = "State.KnockedDown")]
    KnockedDown,
    #[strum(serialize = "State.Interacting")]
    Interacting,
    #[strum(serialize = "State.InteractingRemoval")]
    InteractingRemoval,
    #[strum(serialize = "State.WeaponChanging")]
    WeaponChanging,

    // ===== abilities =====
    #[strum(serialize = "Ability.Weapon")]
    AbilityWeapon,
    #[strum(serialize = "Ability.Weapon.IsChanging")]
    AbilityWeaponIsChanging,
    #[strum(serialize = "Ability.Weapon.IsChangingDelayReplication")]
    AbilityWeaponIsChangingDelayReplication,
    #[strum(serialize = "Ability.Weapon.Primary.Instant")]
    AbilityWeaponPrimaryInstant,
    #[strum(serialize = "Ability.Revive")]
    AbilityRevive,

    // ===== effects =====
    #[strum(serialize = "Effect.RemoveOnDeath")]
    EffectRemoveOnDeath,
    #[strum(serialize = "Effect.Damage.HeadShot")]
    EffectDamageHeadShot,

    // ===== weapons =====
    #[strum(serialize = "Weapon.Equipped.None")]
    WeaponEquippedNone,
    #[strum(serialize = "Weapon.Equipped.Rifle")]
    WeaponEquippedRifle,
    #[strum(serialize = "Weapon.Equipped.RocketLauncher")]
    WeaponEquippedRocketLauncher,
    #[strum(serialize = "Weapon.Equipped.Shotgun")]
    WeaponEquippedShotgun,
    #[strum(serialize = "Weapon.Ammo.None")]
    AmmoNone,
    #[strum(serialize = "Weapon.Ammo.Rifle")]
    AmmoRifle,
    #[strum(serialize = "Weapon.Ammo.Rocket")]
    AmmoRocket,
    #[strum(serialize = "Weapon.Ammo.Shotgun")]
    AmmoShotgun,
    #[strum(serialize = "Weapon.IsFiring")]
    WeaponIsFiring,

    // ===== cosmetic cues =====
    #[strum(serialize = "GameplayCue.Hero.KnockedDown")]
    CueHeroKnockedDown,
    #[strum(serialize = "GameplayCue.Hero.Revived")]
    CueHeroRevived,
}

impl GameplayTag {
    /// Dotted tag name.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Looks a tag up by its dotted name.
    pub fn parse(name: &str) -> Result<Self, TagError> {
        name.parse()
            .map_err(|_| TagError::UnknownTag { name: name.into() })
    }

    /// Returns true if `self` equals `parent` or sits below it in the hierarchy.
    ///
    /// `Ability.Weapon.IsChanging` matches `Ability.Weapon`, but
    /// `Ability.WeaponX` would not.
    pub fn matches(self, parent: GameplayTag) -> bool {
        if self == parent {
            return true;
        }
        let name = self.name();
        let parent = parent.name();
        name.len() > parent.len()
            && name.starts_with(parent)
            && name.as_bytes()[parent.len()] == b'.'
    }

    /// Returns true if this tag matches any tag in `parents`.
    pub fn matches_any(self, parents: &[GameplayTag]) -> bool {
        parents.iter().any(|parent| self.matches(*parent))
    }

    /// Returns true for ammo-type tags other than `Weapon.Ammo.None`.
    pub const fn is_reserve_ammo_type(self) -> bool {
        matches!(self, Self::AmmoRifle | Self::AmmoRocket | Self::AmmoShotgun)
    }
}

impl core::fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by tag bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("cannot remove {requested} of {tag}: only {count} present")]
    Underflow {
        tag: GameplayTag,
        count: u32,
        requested: u32,
    },

    #[error("unknown gameplay tag `{name}`")]
    UnknownTag { name: String },
}

impl GameError for TagError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Underflow { .. } => ErrorSeverity::Validation,
            Self::UnknownTag { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Underflow { .. } => "TAG_UNDERFLOW",
            Self::UnknownTag { .. } => "TAG_UNKNOWN",
        }
    }
}
