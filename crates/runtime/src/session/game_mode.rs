//! Match rules: respawn scheduling after a death.

use tracing::{debug, info};

use arena_core::{ControllerId, EntityId, GameMode, Tick};

use crate::events::{Event, EventBus, MatchEvent};

/// A death waiting for its respawn tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRespawn {
    pub entity: EntityId,
    pub controller: ControllerId,
    pub due: Tick,
}

/// Game mode of an arena match.
///
/// Controlled entities come back `respawn_delay_ticks` after dying.
/// Uncontrolled ones stay dead.
#[derive(Debug)]
pub struct ArenaGameMode {
    respawn_delay_ticks: u64,
    now: Tick,
    pending: Vec<PendingRespawn>,
    event_bus: EventBus,
}

impl ArenaGameMode {
    pub fn new(respawn_delay_ticks: u64, event_bus: EventBus) -> Self {
        Self {
            respawn_delay_ticks,
            now: Tick::ZERO,
            pending: Vec::new(),
            event_bus,
        }
    }

    /// Server tick the next deaths are reported at.
    pub(crate) fn set_clock(&mut self, now: Tick) {
        self.now = now;
    }

    pub fn pending(&self) -> &[PendingRespawn] {
        &self.pending
    }

    /// Removes and returns every respawn due by `now`.
    pub fn take_due(&mut self, now: Tick) -> Vec<PendingRespawn> {
        let (due, waiting) = self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = waiting;
        due
    }
}

impl GameMode for ArenaGameMode {
    fn on_entity_died(&mut self, entity: EntityId, controller: Option<ControllerId>) {
        let respawn_at = controller.map(|controller| {
            let due = self.now.saturating_add(self.respawn_delay_ticks);
            self.pending.retain(|p| p.entity != entity);
            self.pending.push(PendingRespawn {
                entity,
                controller,
                due,
            });
            debug!(target: "runtime::game_mode", %entity, %controller, %due, "respawn scheduled");
            due
        });
        info!(target: "runtime::game_mode", %entity, ?controller, "entity died");
        self.event_bus.publish(Event::Match(MatchEvent::EntityDied {
            entity,
            controller,
            respawn_at,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respawn_is_due_after_the_delay() {
        let mut mode = ArenaGameMode::new(150, EventBus::new());
        mode.set_clock(Tick(10));
        mode.on_entity_died(EntityId(1), Some(ControllerId(1)));

        assert!(mode.take_due(Tick(159)).is_empty());
        let due = mode.take_due(Tick(160));
        assert_eq!(due, vec![PendingRespawn {
            entity: EntityId(1),
            controller: ControllerId(1),
            due: Tick(160),
        }]);
        assert!(mode.pending().is_empty());
    }

    #[test]
    fn uncontrolled_deaths_are_final() {
        let bus = EventBus::new();
        let mut events = bus.subscribe(crate::events::Topic::Match);
        let mut mode = ArenaGameMode::new(150, bus);
        mode.on_entity_died(EntityId(4), None);

        assert!(mode.pending().is_empty());
        assert_eq!(
            events.try_recv().unwrap(),
            Event::Match(MatchEvent::EntityDied {
                entity: EntityId(4),
                controller: None,
                respawn_at: None,
            })
        );
    }
}
