//! Hold-to-interact timing on the server.
//!
//! The core answers whether a target can be interacted with and how long it
//! takes; this driver owns the clock. An interaction completes once it has
//! been held for its duration and is cancelled when the interactor lets go
//! or either side leaves the state that allowed it.

use tracing::{debug, warn};

use arena_core::{EntityId, LifeState, Tick, World, WorldResult};

/// How an interaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Completed { interactor: EntityId, target: EntityId },
    Cancelled { interactor: EntityId, target: EntityId },
}

#[derive(Debug, Clone, Copy)]
struct ActiveInteraction {
    interactor: EntityId,
    target: EntityId,
    complete_at: Tick,
}

#[derive(Debug)]
pub struct InteractionDriver {
    tick_rate: u32,
    active: Vec<ActiveInteraction>,
}

impl InteractionDriver {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            active: Vec::new(),
        }
    }

    pub fn is_interacting(&self, interactor: EntityId) -> bool {
        self.active.iter().any(|a| a.interactor == interactor)
    }

    /// Starts holding the interaction on `target`.
    ///
    /// Returns `false` without touching the world if the interactor is
    /// already busy, is not alive, or the target is unavailable.
    pub fn begin(&mut self, world: &mut World, interactor: EntityId, target: EntityId) -> WorldResult<bool> {
        let interactor_alive = world
            .entity(interactor)
            .is_some_and(|e| e.life_state() == LifeState::Alive);
        if interactor == target
            || !interactor_alive
            || self.is_interacting(interactor)
            || !world.is_available_for_interaction(target)
        {
            return Ok(false);
        }
        let duration = world.interaction_duration(target);
        world.pre_interact(target, interactor)?;
        world.show_interaction_prompt(interactor, duration)?;

        let hold_ticks = (duration * self.tick_rate as f32).ceil() as u64;
        let complete_at = world.tick().saturating_add(hold_ticks);
        self.active.push(ActiveInteraction {
            interactor,
            target,
            complete_at,
        });
        debug!(target: "runtime::interaction", %interactor, %target, %complete_at, "interaction held");
        Ok(true)
    }

    /// The interactor let go. Returns the target of the cancelled interaction.
    pub fn release(&mut self, world: &mut World, interactor: EntityId) -> WorldResult<Option<EntityId>> {
        let Some(index) = self.active.iter().position(|a| a.interactor == interactor) else {
            return Ok(None);
        };
        let interaction = self.active.swap_remove(index);
        cancel(world, interaction)?;
        Ok(Some(interaction.target))
    }

    /// Completes interactions held long enough and cancels those whose
    /// participants changed state.
    ///
    /// A world error ends only the interaction that raised it.
    pub fn update(&mut self, world: &mut World) -> Vec<InteractionOutcome> {
        let now = world.tick();
        let mut outcomes = Vec::new();
        let mut still_active = Vec::with_capacity(self.active.len());

        for interaction in std::mem::take(&mut self.active) {
            match settle(world, interaction, now) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => still_active.push(interaction),
                Err(err) => {
                    warn!(
                        target: "runtime::interaction",
                        interactor = %interaction.interactor,
                        target = %interaction.target,
                        %err,
                        "interaction aborted"
                    );
                    outcomes.push(InteractionOutcome::Cancelled {
                        interactor: interaction.interactor,
                        target: interaction.target,
                    });
                }
            }
        }

        self.active = still_active;
        outcomes
    }
}

fn settle(world: &mut World, interaction: ActiveInteraction, now: Tick) -> WorldResult<Option<InteractionOutcome>> {
    let ActiveInteraction {
        interactor, target, ..
    } = interaction;
    let target_down = world
        .entity(target)
        .is_some_and(|e| e.life_state() == LifeState::KnockedDown);
    let interactor_alive = world
        .entity(interactor)
        .is_some_and(|e| e.life_state() == LifeState::Alive);

    if !target_down || !interactor_alive {
        cancel(world, interaction)?;
        Ok(Some(InteractionOutcome::Cancelled { interactor, target }))
    } else if now >= interaction.complete_at {
        world.post_interact(target, interactor)?;
        world.hide_interaction_prompt(interactor)?;
        Ok(Some(InteractionOutcome::Completed { interactor, target }))
    } else {
        Ok(None)
    }
}

fn cancel(world: &mut World, interaction: ActiveInteraction) -> WorldResult<()> {
    world.cancel_interaction(interaction.target, interaction.interactor)?;
    if world.entity(interaction.interactor).is_some() {
        world.hide_interaction_prompt(interaction.interactor)?;
    }
    debug!(
        target: "runtime::interaction",
        interactor = %interaction.interactor,
        target = %interaction.target,
        "interaction cancelled"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use arena_content::ContentFactory;
    use arena_core::{Controller, ControllerId, GameplayTag};
    use glam::Vec3;

    use super::*;

    fn hero(world: &mut World, controller: u32) -> EntityId {
        world
            .spawn_entity(
                "Hero",
                Some(Controller::player(ControllerId(controller))),
                Vec3::X * controller as f32 * 100.0,
            )
            .unwrap()
    }

    #[test]
    fn interactions_settle_independently() {
        let content = ContentFactory::bundled().load_all().unwrap();
        let mut world = content.server_world();
        let (first_reviver, first_downed) = (hero(&mut world, 1), hero(&mut world, 2));
        let (second_reviver, second_downed) = (hero(&mut world, 3), hero(&mut world, 4));
        world.apply_damage(None, first_downed, 1000.0, false).unwrap();
        world.apply_damage(None, second_downed, 1000.0, false).unwrap();

        let mut driver = InteractionDriver::new(30);
        assert!(driver.begin(&mut world, first_reviver, first_downed).unwrap());
        assert!(driver.begin(&mut world, second_reviver, second_downed).unwrap());
        assert!(!driver.begin(&mut world, second_reviver, first_downed).unwrap());

        world.apply_damage(None, first_downed, 1000.0, false).unwrap();
        assert_eq!(driver.update(&mut world), vec![InteractionOutcome::Cancelled {
            interactor: first_reviver,
            target: first_downed,
        }]);
        assert!(!driver.is_interacting(first_reviver));
        assert!(!world.entity(first_reviver).unwrap().has_tag(GameplayTag::Interacting));
        assert!(driver.is_interacting(second_reviver));

        for _ in 0..120 {
            world.advance();
        }
        assert_eq!(driver.update(&mut world), vec![InteractionOutcome::Completed {
            interactor: second_reviver,
            target: second_downed,
        }]);
        assert_eq!(world.entity(second_downed).unwrap().life_state(), LifeState::Alive);
        assert_eq!(world.max_speed(second_reviver).unwrap(), 600.0);
    }
}
