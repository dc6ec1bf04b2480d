//! Effect application on the server, damage follow-ups and the effect clock.

use tracing::{debug, info};

use super::{World, WorldResult};
use crate::attributes::Attribute;
use crate::effects::{BountyGrant, DamageNumber, DamageNumberFlags, DamageOutcome, EffectContext, EffectSpec, Modifier};
use crate::entity::{AppliedEffect, Damageable, ResolvedDamage};
use crate::net::ClientRpc;
use crate::tags::GameplayTag;
use crate::types::EntityId;

impl World {
    /// Server: applies `spec` to `target` and settles its consequences.
    ///
    /// Damage is resolved into shield and health, the life cycle reacts to the
    /// new health, and only then are the damage number and bounty decided.
    ///
    /// # Errors
    ///
    /// [`super::WorldError::NotAuthority`] on a client copy.
    pub fn apply_effect(
        &mut self,
        target: EntityId,
        spec: &EffectSpec,
        context: EffectContext,
    ) -> WorldResult<AppliedEffect> {
        self.require_authority(target, "apply_effect")?;
        let now = self.tick;
        let applied = self
            .entity_mut(target)?
            .apply_effect(spec, context.clone(), now);
        self.settle(target, &context, applied.damage);
        Ok(applied)
    }

    /// Server: convenience for an instant damage effect.
    ///
    /// `source` is the attacking entity, if any. A headshot marks the
    /// application with `Effect.Damage.HeadShot`.
    pub fn apply_damage(
        &mut self,
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
        headshot: bool,
    ) -> WorldResult<Option<DamageOutcome>> {
        let mut context = EffectContext {
            source,
            instigator: source
                .and_then(|s| self.entities.get(&s))
                .and_then(|e| e.controller_id()),
            dynamic_asset_tags: Vec::new(),
        };
        if headshot {
            context = context.with_dynamic_tag(GameplayTag::EffectDamageHeadShot);
        }
        let spec = EffectSpec::instant("Damage").with_modifier(Modifier::add(Attribute::Damage, amount));
        let applied = self.apply_effect(target, &spec, context)?;
        Ok(applied.damage.map(|d| d.outcome))
    }

    /// Advances the clock by one tick: runs due periodic effects and removes
    /// expired ones, entity by entity.
    pub fn advance(&mut self) {
        self.tick = self.tick.next();
        let now = self.tick;
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            for handle in entity.due_periodic_effects(now) {
                let Some(entity) = self.entities.get_mut(&id) else {
                    break;
                };
                if let Some((context, damage)) = entity.execute_periodic(handle) {
                    self.settle(id, &context, damage);
                }
            }
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            for handle in entity.expired_effects(now) {
                if entity.remove_effect(handle) {
                    debug!(target: "arena::effects", entity = %id, ?handle, "effect expired");
                }
            }
            self.process_events(id);
        }
    }

    fn settle(&mut self, target: EntityId, context: &EffectContext, damage: Option<ResolvedDamage>) {
        self.process_events(target);
        if let Some(damage) = damage {
            self.after_damage(target, context, damage);
        }
    }

    /// Damage number and bounty, decided after the life cycle has reacted.
    fn after_damage(&mut self, target: EntityId, context: &EffectContext, damage: ResolvedDamage) {
        if !damage.was_alive {
            return;
        }
        let Some(target_entity) = self.entities.get(&target) else {
            return;
        };
        let target_alive = target_entity.is_alive();
        let target_controller = target_entity.controller_id();
        let bounty = BountyGrant::from_target(&target_entity.attributes);

        let source = context.source.and_then(|s| self.entities.get(&s));
        let source_controller = source
            .and_then(|e| e.controller_id())
            .or(context.instigator);
        let source_is_player = source
            .and_then(|e| e.controller)
            .is_some_and(|c| c.is_player());

        if let Some(source_id) = context.source {
            if source_id != target && source_is_player {
                let mut flags = DamageNumberFlags::empty();
                flags.set(
                    DamageNumberFlags::HEADSHOT,
                    context.has_dynamic_tag(GameplayTag::EffectDamageHeadShot),
                );
                let number = DamageNumber {
                    target,
                    amount: damage.outcome.amount,
                    flags,
                };
                self.send_to_owner(source_id, ClientRpc::ShowDamageNumber(number));
            }

            if !target_alive && source_controller != target_controller {
                if let Some(source_entity) = self.entities.get_mut(&source_id) {
                    bounty.apply(&mut source_entity.attributes);
                    info!(
                        target: "arena::damage",
                        killer = %source_id,
                        victim = %target,
                        xp = bounty.xp,
                        gold = bounty.gold,
                        "bounty granted"
                    );
                    self.process_events(source_id);
                }
            }
        }
    }
}
