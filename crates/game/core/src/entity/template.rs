use crate::abilities::AbilityDef;
use crate::attributes::{Attribute, AttributeDefaults};
use crate::effects::{EffectSpec, Modifier};
use crate::tags::GameplayTag;
use crate::weapon::WeaponKind;

use super::EntityKind;

/// Ticks between two bleed-out damage executions while knocked down.
const BLEED_OUT_PERIOD_TICKS: u64 = 30;
const BLEED_OUT_DAMAGE: f32 = 5.0;

/// Static description an entity is spawned from.
///
/// Loaded from content files; the server and every client must hold the same
/// templates so predicted ability grants line up.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityTemplate {
    pub name: String,
    pub kind: EntityKind,
    pub attributes: AttributeDefaults,
    /// Applied once, the first time the entity is possessed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub startup_effects: Vec<EffectSpec>,
    #[cfg_attr(feature = "serde", serde(default = "character_abilities"))]
    pub abilities: Vec<AbilityDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_weapons: Vec<WeaponKind>,
    #[cfg_attr(feature = "serde", serde(default = "knock_down_effect"))]
    pub knock_down_effect: EffectSpec,
    #[cfg_attr(feature = "serde", serde(default = "death_effect"))]
    pub death_effect: EffectSpec,
    #[cfg_attr(feature = "serde", serde(default = "revive_effect"))]
    pub revive_effect: EffectSpec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub death_montage: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_in_first_person: bool,
}

impl EntityTemplate {
    /// Hero with the standard life-cycle effects and no weapons.
    pub fn hero(name: impl Into<String>, attributes: AttributeDefaults) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Hero,
            attributes,
            startup_effects: Vec::new(),
            abilities: character_abilities(),
            default_weapons: Vec::new(),
            knock_down_effect: knock_down_effect(),
            death_effect: death_effect(),
            revive_effect: revive_effect(),
            death_montage: Some("Hero_Death".into()),
            start_in_first_person: true,
        }
    }

    /// Minion: dies outright, never knocked down, no abilities.
    pub fn minion(name: impl Into<String>, attributes: AttributeDefaults) -> Self {
        Self {
            kind: EntityKind::Minion,
            abilities: Vec::new(),
            death_montage: None,
            start_in_first_person: false,
            ..Self::hero(name, attributes)
        }
    }

    #[must_use]
    pub fn with_default_weapons(mut self, weapons: impl IntoIterator<Item = WeaponKind>) -> Self {
        self.default_weapons = weapons.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_startup_effect(mut self, effect: EffectSpec) -> Self {
        self.startup_effects.push(effect);
        self
    }
}

/// Baseline hero attributes.
pub fn default_hero_attributes() -> AttributeDefaults {
    AttributeDefaults::new()
        .with(Attribute::MaxHealth, 100.0)
        .with(Attribute::Health, 100.0)
        .with(Attribute::MaxMana, 100.0)
        .with(Attribute::Mana, 100.0)
        .with(Attribute::MaxStamina, 100.0)
        .with(Attribute::Stamina, 100.0)
        .with(Attribute::MaxShield, 50.0)
        .with(Attribute::Shield, 50.0)
        .with(Attribute::MoveSpeed, 600.0)
        .with(Attribute::CharacterLevel, 1.0)
        .with(Attribute::XpBounty, 100.0)
        .with(Attribute::GoldBounty, 50.0)
        .with(Attribute::MaxRifleReserveAmmo, 300.0)
        .with(Attribute::RifleReserveAmmo, 120.0)
        .with(Attribute::MaxRocketReserveAmmo, 10.0)
        .with(Attribute::RocketReserveAmmo, 4.0)
        .with(Attribute::MaxShotgunReserveAmmo, 64.0)
        .with(Attribute::ShotgunReserveAmmo, 24.0)
}

fn character_abilities() -> Vec<AbilityDef> {
    vec![
        AbilityDef::next_weapon(),
        AbilityDef::previous_weapon(),
        AbilityDef::revive(),
    ]
}

/// Grants `State.KnockedDown` and bleeds the hero out while it lasts.
pub fn knock_down_effect() -> EffectSpec {
    EffectSpec::infinite("KnockDown")
        .granting(GameplayTag::KnockedDown)
        .with_asset_tag(GameplayTag::EffectRemoveOnDeath)
        .periodic(BLEED_OUT_PERIOD_TICKS)
        .with_modifier(Modifier::add(Attribute::Damage, BLEED_OUT_DAMAGE))
}

pub fn death_effect() -> EffectSpec {
    EffectSpec::infinite("Death").granting(GameplayTag::Dead)
}

pub fn revive_effect() -> EffectSpec {
    EffectSpec::instant("Revive").removing_effects_granting(GameplayTag::KnockedDown)
}
