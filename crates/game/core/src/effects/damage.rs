//! Damage resolution: shield first, then health.

use bitflags::bitflags;

use crate::attributes::{Attribute, AttributeStore};
use crate::effects::ModOp;
use crate::types::EntityId;

/// What one resolved damage execution did to its target.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageOutcome {
    /// Raw accumulated damage, before absorption.
    pub amount: f32,
    pub shield_before: f32,
    pub shield_after: f32,
    pub health_before: f32,
    pub health_after: f32,
}

impl DamageOutcome {
    pub fn shield_absorbed(&self) -> f32 {
        self.shield_before - self.shield_after
    }

    pub fn health_lost(&self) -> f32 {
        self.health_before - self.health_after
    }
}

/// Consumes the transient `Damage` attribute and applies it.
///
/// The accumulated value is read and zeroed before anything else so it
/// cannot apply twice. Shield absorbs first; only damage in excess of the
/// shield held before this hit reaches health. Both results are clamped into
/// `[0, max]`.
///
/// Returns `None` when no positive damage had accumulated.
pub fn resolve_damage(store: &mut AttributeStore) -> Option<DamageOutcome> {
    let amount = store.take(Attribute::Damage);
    if amount <= 0.0 {
        return None;
    }

    let shield_before = store.get(Attribute::Shield);
    let health_before = store.get(Attribute::Health);
    let damage_after_shield = amount - shield_before;

    if shield_before > 0.0 {
        let shield = (shield_before - amount).clamp(0.0, store.get(Attribute::MaxShield));
        store.apply_mod(Attribute::Shield, ModOp::Override, shield);
    }
    if damage_after_shield > 0.0 {
        let health =
            (health_before - damage_after_shield).clamp(0.0, store.get(Attribute::MaxHealth));
        store.apply_mod(Attribute::Health, ModOp::Override, health);
    }

    Some(DamageOutcome {
        amount,
        shield_before,
        shield_after: store.get(Attribute::Shield),
        health_before,
        health_after: store.get(Attribute::Health),
    })
}

/// XP and gold credited to a killer.
///
/// A plain descriptor applied straight to the source's attributes as instant
/// additive modifications.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BountyGrant {
    pub xp: f32,
    pub gold: f32,
}

impl BountyGrant {
    /// Reads the bounty a target is worth.
    pub fn from_target(target: &AttributeStore) -> Self {
        Self {
            xp: target.get(Attribute::XpBounty),
            gold: target.get(Attribute::GoldBounty),
        }
    }

    pub fn apply(&self, source: &mut AttributeStore) {
        source.apply_mod(Attribute::Xp, ModOp::Additive, self.xp);
        source.apply_mod(Attribute::Gold, ModOp::Additive, self.gold);
    }
}

bitflags! {
    /// Presentation flags for a floating damage number.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DamageNumberFlags: u8 {
        const HEADSHOT = 1 << 0;
    }
}

/// Damage number shown on the attacker's HUD.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageNumber {
    pub target: EntityId,
    pub amount: f32,
    pub flags: DamageNumberFlags,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeDefaults;
    use crate::config::GameConfig;

    fn store_with(shield: f32, health: f32) -> AttributeStore {
        let mut store = AttributeStore::new(&GameConfig::default());
        store.initialize(
            &AttributeDefaults::new()
                .with(Attribute::Health, health)
                .with(Attribute::MaxHealth, 100.0)
                .with(Attribute::Shield, shield)
                .with(Attribute::MaxShield, 50.0),
        );
        store
    }

    fn hit(store: &mut AttributeStore, damage: f32) -> Option<DamageOutcome> {
        store.apply_mod(Attribute::Damage, ModOp::Additive, damage);
        resolve_damage(store)
    }

    #[test]
    fn shield_absorbs_before_health() {
        let mut store = store_with(30.0, 50.0);
        let outcome = hit(&mut store, 50.0).unwrap();
        assert_eq!(store.get(Attribute::Shield), 0.0);
        assert_eq!(store.get(Attribute::Health), 30.0);
        assert_eq!(outcome.shield_absorbed(), 30.0);
        assert_eq!(outcome.health_lost(), 20.0);
    }

    #[test]
    fn damage_below_shield_leaves_health_alone() {
        let mut store = store_with(30.0, 50.0);
        hit(&mut store, 10.0);
        assert_eq!(store.get(Attribute::Shield), 20.0);
        assert_eq!(store.get(Attribute::Health), 50.0);
    }

    #[test]
    fn health_floors_at_zero() {
        let mut store = store_with(0.0, 10.0);
        let outcome = hit(&mut store, 25.0).unwrap();
        assert_eq!(store.get(Attribute::Health), 0.0);
        assert_eq!(outcome.amount, 25.0);
    }

    #[test]
    fn non_positive_damage_is_ignored_and_consumed() {
        let mut store = store_with(10.0, 50.0);
        assert!(hit(&mut store, -5.0).is_none());
        assert_eq!(store.get(Attribute::Damage), 0.0);
        assert_eq!(store.get(Attribute::Health), 50.0);
        assert_eq!(store.get(Attribute::Shield), 10.0);
    }

    #[test]
    fn bounty_is_additive() {
        let mut target = AttributeStore::new(&GameConfig::default());
        target.initialize(
            &AttributeDefaults::new()
                .with(Attribute::XpBounty, 80.0)
                .with(Attribute::GoldBounty, 25.0),
        );
        let mut source = AttributeStore::new(&GameConfig::default());
        source.initialize(&AttributeDefaults::new().with(Attribute::Xp, 10.0));

        BountyGrant::from_target(&target).apply(&mut source);
        assert_eq!(source.get(Attribute::Xp), 90.0);
        assert_eq!(source.get(Attribute::Gold), 25.0);
    }
}
