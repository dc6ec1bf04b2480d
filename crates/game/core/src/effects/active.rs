use super::{EffectContext, EffectDuration, EffectHandle, EffectSpec};
use crate::tags::GameplayTag;
use crate::types::Tick;

/// An effect currently held by an entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveEffect {
    pub handle: EffectHandle,
    pub spec: EffectSpec,
    pub context: EffectContext,
    pub applied_at: Tick,
    /// `None` for infinite effects.
    pub expires_at: Option<Tick>,
    /// Next tick a periodic effect executes.
    pub next_period_at: Option<Tick>,
}

impl ActiveEffect {
    pub fn is_expired(&self, now: Tick) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// True if the periodic execution should run at `now`.
    pub fn period_due(&self, now: Tick) -> bool {
        self.next_period_at.is_some_and(|at| now >= at)
    }
}

/// Active effects of one entity, in application order.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffects {
    effects: Vec<ActiveEffect>,
    next_handle: u64,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a non-instant effect and returns its handle.
    pub fn insert(&mut self, spec: EffectSpec, context: EffectContext, now: Tick) -> EffectHandle {
        self.next_handle += 1;
        let handle = EffectHandle(self.next_handle);
        let expires_at = match spec.duration {
            EffectDuration::Ticks(ticks) => Some(now.saturating_add(ticks)),
            EffectDuration::Instant | EffectDuration::Infinite => None,
        };
        let next_period_at = spec.period.map(|period| now.saturating_add(period));
        self.effects.push(ActiveEffect {
            handle,
            spec,
            context,
            applied_at: now,
            expires_at,
            next_period_at,
        });
        handle
    }

    pub fn remove(&mut self, handle: EffectHandle) -> Option<ActiveEffect> {
        let index = self.effects.iter().position(|e| e.handle == handle)?;
        Some(self.effects.remove(index))
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&ActiveEffect> {
        self.effects.iter().find(|e| e.handle == handle)
    }

    /// Handles of effects carrying an asset tag matching `tag`.
    pub fn with_asset_tag(&self, tag: GameplayTag) -> Vec<EffectHandle> {
        self.effects
            .iter()
            .filter(|e| e.spec.has_asset_tag(tag))
            .map(|e| e.handle)
            .collect()
    }

    /// Handles of effects granting a tag matching `tag`.
    pub fn granting(&self, tag: GameplayTag) -> Vec<EffectHandle> {
        self.effects
            .iter()
            .filter(|e| e.spec.grants_matching(tag))
            .map(|e| e.handle)
            .collect()
    }

    /// Handles of effects whose duration has run out at `now`.
    pub fn expired(&self, now: Tick) -> Vec<EffectHandle> {
        self.effects
            .iter()
            .filter(|e| e.is_expired(now))
            .map(|e| e.handle)
            .collect()
    }

    /// Collects periodic effects due at `now` and schedules their next run.
    pub fn take_due_periods(&mut self, now: Tick) -> Vec<EffectHandle> {
        let mut due = Vec::new();
        for effect in &mut self.effects {
            if effect.period_due(now) && !effect.is_expired(now) {
                due.push(effect.handle);
                effect.next_period_at = effect
                    .spec
                    .period
                    .map(|period| now.saturating_add(period));
            }
        }
        due
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
