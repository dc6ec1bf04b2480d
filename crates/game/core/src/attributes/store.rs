use std::collections::BTreeMap;

use strum::{EnumCount, IntoEnumIterator};
use tracing::trace;

use super::Attribute;
use crate::config::GameConfig;
use crate::effects::{EffectHandle, ModOp, Modifier};
use crate::types::nearly_equal;

/// Base and current value of one attribute.
///
/// Instant modifications write the base value; the current value is the base
/// aggregated with every active duration modifier.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeValue {
    pub base: f32,
    pub current: f32,
}

/// A committed change to an attribute's current value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub old_value: f32,
    pub new_value: f32,
}

/// Initial attribute values for a freshly spawned entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AttributeDefaults(pub BTreeMap<Attribute, f32>);

impl AttributeDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, attribute: Attribute, value: f32) -> Self {
        self.0.insert(attribute, value);
        self
    }

    pub fn get(&self, attribute: Attribute) -> Option<f32> {
        self.0.get(&attribute).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct ActiveModifier {
    handle: EffectHandle,
    modifier: Modifier,
}

/// Owns every attribute of one entity and enforces the clamping pipeline.
///
/// # Pipeline
///
/// 1. A write proposes a new current value (instant modifier on the base,
///    duration modifier change, or replicated value).
/// 2. Pre-change rules run: `MoveSpeed` is bounded, clamped pairs are held
///    in `[0, max]`.
/// 3. The value commits and an [`AttributeChange`] is recorded.
/// 4. If a max attribute moved, its current attribute is rescaled through
///    [`AttributeStore::apply_mod`], so the rescale stacks like any other
///    modifier.
#[derive(Clone, Debug)]
pub struct AttributeStore {
    values: [AttributeValue; Attribute::COUNT],
    modifiers: Vec<ActiveModifier>,
    changes: Vec<AttributeChange>,
    move_speed_min: f32,
    move_speed_max: f32,
}

impl AttributeStore {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            values: [AttributeValue::default(); Attribute::COUNT],
            modifiers: Vec::new(),
            changes: Vec::new(),
            move_speed_min: config.move_speed_min,
            move_speed_max: config.move_speed_max,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current value of `attribute`.
    pub fn get(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()].current
    }

    /// Base value of `attribute`.
    pub fn base(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()].base
    }

    pub fn value(&self, attribute: Attribute) -> AttributeValue {
        self.values[attribute.index()]
    }

    /// Current value as a fraction of its max, 0 if the max is unset.
    pub fn percentage(&self, attribute: Attribute) -> f32 {
        match attribute.max_attribute() {
            Some(max) if self.get(max) > 0.0 => self.get(attribute) / self.get(max),
            _ => 0.0,
        }
    }

    /// Iterates every attribute with its value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, AttributeValue)> + '_ {
        Attribute::iter().map(|attribute| (attribute, self.value(attribute)))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Writes starting values directly, then runs the clamp safety net.
    ///
    /// Max attributes may appear after their current attribute in `defaults`;
    /// nothing is clamped until every value is in place.
    pub fn initialize(&mut self, defaults: &AttributeDefaults) {
        for (attribute, value) in &defaults.0 {
            let slot = &mut self.values[attribute.index()];
            let old_value = slot.current;
            slot.base = *value;
            slot.current = *value;
            self.record(*attribute, old_value, *value);
        }
        for attribute in Attribute::iter() {
            if attribute.max_attribute().is_some() || attribute == Attribute::MoveSpeed {
                self.refresh(attribute);
            }
        }
    }

    /// Authoritative modification path: applies `op` to the base value and
    /// re-evaluates the current value through the pipeline.
    pub fn apply_mod(&mut self, attribute: Attribute, op: ModOp, magnitude: f32) {
        let slot = &mut self.values[attribute.index()];
        slot.base = op.apply(slot.base, magnitude);
        self.refresh(attribute);
    }

    /// Registers a duration modifier owned by an active effect.
    pub fn add_modifier(&mut self, handle: EffectHandle, modifier: Modifier) {
        let attribute = modifier.attribute;
        self.modifiers.push(ActiveModifier { handle, modifier });
        self.refresh(attribute);
    }

    /// Drops every duration modifier owned by `handle`.
    pub fn remove_modifiers(&mut self, handle: EffectHandle) {
        let mut touched = Vec::new();
        self.modifiers.retain(|active| {
            if active.handle == handle {
                touched.push(active.modifier.attribute);
                false
            } else {
                true
            }
        });
        touched.sort();
        touched.dedup();
        for attribute in touched {
            self.refresh(attribute);
        }
    }

    /// Overwrites base and current, bypassing the pipeline.
    ///
    /// Reserved for the respawn reset.
    pub fn reset_to(&mut self, attribute: Attribute, value: f32) {
        let slot = &mut self.values[attribute.index()];
        let old_value = slot.current;
        slot.base = value;
        slot.current = value;
        self.record(attribute, old_value, value);
    }

    /// Applies a value received from the authoritative server.
    pub fn replicate(&mut self, attribute: Attribute, value: f32) {
        self.reset_to(attribute, value);
    }

    /// Reads the accumulated value of a meta attribute and zeroes it.
    ///
    /// Meta attributes never produce change records.
    pub fn take(&mut self, attribute: Attribute) -> f32 {
        let slot = &mut self.values[attribute.index()];
        let value = slot.current;
        *slot = AttributeValue::default();
        value
    }

    /// Drains the change records committed since the last call.
    pub fn drain_changes(&mut self) -> Vec<AttributeChange> {
        std::mem::take(&mut self.changes)
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn aggregate(&self, attribute: Attribute) -> f32 {
        let mut additive = 0.0;
        let mut multiplier = 1.0;
        let mut overridden = None;
        for active in self.modifiers.iter().filter(|a| a.modifier.attribute == attribute) {
            match active.modifier.op {
                ModOp::Additive => additive += active.modifier.magnitude,
                ModOp::Multiplicative => multiplier *= active.modifier.magnitude,
                ModOp::Override => overridden = Some(active.modifier.magnitude),
            }
        }
        overridden.unwrap_or((self.base(attribute) + additive) * multiplier)
    }

    fn refresh(&mut self, attribute: Attribute) {
        let proposed = self.aggregate(attribute);
        self.commit(attribute, proposed);
    }

    /// Pre-change clamp for `attribute`.
    fn pre_change(&self, attribute: Attribute, proposed: f32) -> f32 {
        if attribute == Attribute::MoveSpeed {
            return proposed.clamp(self.move_speed_min, self.move_speed_max);
        }
        match attribute.max_attribute() {
            Some(max) => proposed.clamp(0.0, self.get(max).max(0.0)),
            None => proposed,
        }
    }

    fn commit(&mut self, attribute: Attribute, proposed: f32) {
        let value = self.pre_change(attribute, proposed);
        let slot = &mut self.values[attribute.index()];
        let old_value = slot.current;
        slot.current = value;
        if let Some(max) = attribute.max_attribute() {
            let bound = self.values[max.index()].current.max(0.0);
            let slot = &mut self.values[attribute.index()];
            slot.base = slot.base.clamp(0.0, bound);
        }
        self.record(attribute, old_value, value);

        if nearly_equal(old_value, value) {
            return;
        }
        if let Some(current) = attribute.rescaled_current() {
            let current_value = self.get(current);
            let delta = if old_value > 0.0 {
                current_value * value / old_value - current_value
            } else {
                value
            };
            trace!(
                target: "arena::attributes",
                max = %attribute,
                old_max = old_value,
                new_max = value,
                delta,
                "rescaling current attribute"
            );
            self.apply_mod(current, ModOp::Additive, delta);
        } else if let Some(current) = attribute.bounded_current() {
            self.refresh(current);
        }
    }

    fn record(&mut self, attribute: Attribute, old_value: f32, new_value: f32) {
        if attribute.is_meta() || old_value == new_value {
            return;
        }
        self.changes.push(AttributeChange {
            attribute,
            old_value,
            new_value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero_store() -> AttributeStore {
        let mut store = AttributeStore::new(&GameConfig::default());
        store.initialize(
            &AttributeDefaults::new()
                .with(Attribute::Health, 100.0)
                .with(Attribute::MaxHealth, 100.0)
                .with(Attribute::Mana, 50.0)
                .with(Attribute::MaxMana, 100.0)
                .with(Attribute::Shield, 30.0)
                .with(Attribute::MaxShield, 50.0)
                .with(Attribute::MoveSpeed, 600.0),
        );
        store.drain_changes();
        store
    }

    fn assert_clamped(store: &AttributeStore) {
        for attribute in [
            Attribute::Health,
            Attribute::Mana,
            Attribute::Stamina,
            Attribute::Shield,
        ] {
            let value = store.get(attribute);
            let max = store.get(attribute.max_attribute().unwrap());
            assert!(
                (0.0..=max).contains(&value),
                "{attribute} = {value} outside [0, {max}]"
            );
        }
    }

    #[test]
    fn initialize_order_does_not_clamp_early() {
        let mut store = AttributeStore::new(&GameConfig::default());
        store.initialize(
            &AttributeDefaults::new()
                .with(Attribute::Health, 80.0)
                .with(Attribute::MaxHealth, 100.0),
        );
        assert_eq!(store.get(Attribute::Health), 80.0);
    }

    #[test]
    fn max_rescale_preserves_ratio() {
        let mut store = hero_store();
        store.apply_mod(Attribute::Health, ModOp::Additive, -40.0);
        store.apply_mod(Attribute::MaxHealth, ModOp::Override, 200.0);
        assert!((store.get(Attribute::Health) - 120.0).abs() < 1e-3);

        store.apply_mod(Attribute::MaxHealth, ModOp::Override, 50.0);
        assert!((store.get(Attribute::Health) - 30.0).abs() < 1e-3);
        assert_clamped(&store);
    }

    #[test]
    fn max_rescale_from_zero_fills_current() {
        let mut store = AttributeStore::new(&GameConfig::default());
        store.apply_mod(Attribute::MaxStamina, ModOp::Override, 75.0);
        assert_eq!(store.get(Attribute::Stamina), 75.0);
    }

    #[test]
    fn move_speed_is_clamped_regardless_of_source() {
        let mut store = hero_store();
        store.apply_mod(Attribute::MoveSpeed, ModOp::Multiplicative, 10.0);
        assert_eq!(store.get(Attribute::MoveSpeed), 1000.0);
        store.apply_mod(Attribute::MoveSpeed, ModOp::Override, 10.0);
        assert_eq!(store.get(Attribute::MoveSpeed), 150.0);

        store.add_modifier(
            EffectHandle(1),
            Modifier::new(Attribute::MoveSpeed, ModOp::Multiplicative, 0.1),
        );
        assert_eq!(store.get(Attribute::MoveSpeed), 150.0);
    }

    #[test]
    fn clamp_holds_after_every_write() {
        let mut store = hero_store();
        let writes = [
            (Attribute::Health, ModOp::Additive, 500.0),
            (Attribute::Shield, ModOp::Additive, -90.0),
            (Attribute::MaxShield, ModOp::Override, 10.0),
            (Attribute::Mana, ModOp::Multiplicative, 3.0),
            (Attribute::MaxHealth, ModOp::Additive, -60.0),
            (Attribute::Health, ModOp::Override, -5.0),
            (Attribute::MaxMana, ModOp::Override, 0.0),
        ];
        for (attribute, op, magnitude) in writes {
            store.apply_mod(attribute, op, magnitude);
            assert_clamped(&store);
        }
    }

    #[test]
    fn lowering_max_shield_clamps_shield() {
        let mut store = hero_store();
        store.apply_mod(Attribute::MaxShield, ModOp::Override, 10.0);
        assert_eq!(store.get(Attribute::Shield), 10.0);
    }

    #[test]
    fn duration_modifiers_aggregate_and_revert() {
        let mut store = hero_store();
        store.add_modifier(
            EffectHandle(7),
            Modifier::new(Attribute::Armor, ModOp::Additive, 5.0),
        );
        store.add_modifier(
            EffectHandle(7),
            Modifier::new(Attribute::Armor, ModOp::Multiplicative, 2.0),
        );
        assert_eq!(store.get(Attribute::Armor), 10.0);
        assert_eq!(store.base(Attribute::Armor), 0.0);

        store.remove_modifiers(EffectHandle(7));
        assert_eq!(store.get(Attribute::Armor), 0.0);
    }

    #[test]
    fn take_consumes_meta_attribute_silently() {
        let mut store = hero_store();
        store.apply_mod(Attribute::Damage, ModOp::Additive, 12.0);
        assert_eq!(store.take(Attribute::Damage), 12.0);
        assert_eq!(store.get(Attribute::Damage), 0.0);
        assert!(store.drain_changes().is_empty());
    }

    #[test]
    fn changes_are_recorded_in_commit_order() {
        let mut store = hero_store();
        store.apply_mod(Attribute::MaxHealth, ModOp::Override, 200.0);
        let changes = store.drain_changes();
        let order: Vec<_> = changes.iter().map(|c| c.attribute).collect();
        assert_eq!(order, vec![Attribute::MaxHealth, Attribute::Health]);
    }
}
