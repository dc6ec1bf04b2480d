//! Effects: bundles of attribute modifiers and granted tags.
//!
//! An [`EffectSpec`] is pure data. Applying it to an entity either executes
//! its modifiers once against base values (instant), or registers an
//! [`ActiveEffect`] that holds its modifiers and granted tags until it
//! expires or is removed.

mod active;
mod damage;

pub use active::{ActiveEffect, ActiveEffects};
pub use damage::{BountyGrant, DamageNumber, DamageNumberFlags, DamageOutcome, resolve_damage};

use crate::attributes::Attribute;
use crate::tags::GameplayTag;
use crate::types::{ControllerId, EntityId};

/// Handle to an active effect on one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectHandle(pub u64);

/// How a modifier combines with the value it modifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModOp {
    Additive,
    Multiplicative,
    Override,
}

impl ModOp {
    pub fn apply(self, value: f32, magnitude: f32) -> f32 {
        match self {
            Self::Additive => value + magnitude,
            Self::Multiplicative => value * magnitude,
            Self::Override => magnitude,
        }
    }
}

/// One attribute modification.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    pub attribute: Attribute,
    pub op: ModOp,
    pub magnitude: f32,
}

impl Modifier {
    pub const fn new(attribute: Attribute, op: ModOp, magnitude: f32) -> Self {
        Self {
            attribute,
            op,
            magnitude,
        }
    }

    pub const fn add(attribute: Attribute, magnitude: f32) -> Self {
        Self::new(attribute, ModOp::Additive, magnitude)
    }
}

/// Lifetime of an applied effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectDuration {
    /// Modifiers execute once against base values; nothing stays active.
    #[default]
    Instant,
    /// Active for the given number of ticks.
    Ticks(u64),
    /// Active until explicitly removed.
    Infinite,
}

/// Data description of an effect.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectSpec {
    pub name: String,
    pub duration: EffectDuration,
    /// Periodic effects execute their modifiers every `period` ticks instead
    /// of holding them as duration modifiers.
    pub period: Option<u64>,
    pub modifiers: Vec<Modifier>,
    /// Tags granted to the target while the effect is active.
    pub granted_tags: Vec<GameplayTag>,
    /// Tags describing the effect itself, e.g. `Effect.RemoveOnDeath`.
    pub asset_tags: Vec<GameplayTag>,
    /// On application, remove active effects granting any of these tags.
    pub remove_effects_granting: Vec<GameplayTag>,
}

impl EffectSpec {
    pub fn instant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn infinite(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: EffectDuration::Infinite,
            ..Self::default()
        }
    }

    pub fn for_ticks(name: impl Into<String>, ticks: u64) -> Self {
        Self {
            name: name.into(),
            duration: EffectDuration::Ticks(ticks),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    #[must_use]
    pub fn granting(mut self, tag: GameplayTag) -> Self {
        self.granted_tags.push(tag);
        self
    }

    #[must_use]
    pub fn with_asset_tag(mut self, tag: GameplayTag) -> Self {
        self.asset_tags.push(tag);
        self
    }

    #[must_use]
    pub fn periodic(mut self, period: u64) -> Self {
        self.period = Some(period.max(1));
        self
    }

    #[must_use]
    pub fn removing_effects_granting(mut self, tag: GameplayTag) -> Self {
        self.remove_effects_granting.push(tag);
        self
    }

    pub const fn is_instant(&self) -> bool {
        matches!(self.duration, EffectDuration::Instant)
    }

    /// True if executing this effect feeds the damage resolution step.
    pub fn deals_damage(&self) -> bool {
        self.modifiers
            .iter()
            .any(|modifier| modifier.attribute == Attribute::Damage)
    }

    pub fn has_asset_tag(&self, tag: GameplayTag) -> bool {
        self.asset_tags.iter().any(|t| t.matches(tag))
    }

    pub fn grants_matching(&self, tag: GameplayTag) -> bool {
        self.granted_tags.iter().any(|t| t.matches(tag))
    }
}

/// Who applied an effect, and how.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectContext {
    pub source: Option<EntityId>,
    pub instigator: Option<ControllerId>,
    /// Tags attached to this application only, e.g. `Effect.Damage.HeadShot`.
    pub dynamic_asset_tags: Vec<GameplayTag>,
}

impl EffectContext {
    pub fn from_source(source: EntityId, instigator: Option<ControllerId>) -> Self {
        Self {
            source: Some(source),
            instigator,
            dynamic_asset_tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dynamic_tag(mut self, tag: GameplayTag) -> Self {
        self.dynamic_asset_tags.push(tag);
        self
    }

    pub fn has_dynamic_tag(&self, tag: GameplayTag) -> bool {
        self.dynamic_asset_tags.iter().any(|t| t.matches(tag))
    }
}
