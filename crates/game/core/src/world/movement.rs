//! Predicted movement: client steps, server validation, client correction.

use glam::Vec3;
use tracing::{debug, trace, warn};

use super::{World, WorldError, WorldResult};
use crate::entity::Movable;
use crate::movement::{self, SavedMove, ServerMove};
use crate::net::{ClientRpc, ServerRpc};
use crate::types::EntityId;

impl World {
    pub fn set_sprinting(&mut self, id: EntityId, sprinting: bool) -> WorldResult<()> {
        let movement = &mut self.entity_mut(id)?.movement;
        if sprinting {
            movement.start_sprinting();
        } else {
            movement.stop_sprinting();
        }
        Ok(())
    }

    pub fn set_aiming(&mut self, id: EntityId, aiming: bool) -> WorldResult<()> {
        let movement = &mut self.entity_mut(id)?.movement;
        if aiming {
            movement.start_aiming();
        } else {
            movement.stop_aiming();
        }
        Ok(())
    }

    /// Maximum speed of `id` under its current intents and tags.
    pub fn max_speed(&self, id: EntityId) -> WorldResult<f32> {
        Ok(self.entity_ref(id)?.max_speed())
    }

    /// Client: simulates one local step and records it for the server.
    ///
    /// `timestamp` is the client time at the end of the step.
    pub fn move_locally(
        &mut self,
        id: EntityId,
        acceleration: Vec3,
        timestamp: f32,
        delta_time: f32,
    ) -> WorldResult<Vec3> {
        let max_delta_time = self.config.max_move_delta_time;
        let entity = self.entity_mut(id)?;
        let speed = entity.max_speed();
        let start_location = entity.location;
        let end_location = movement::simulate_step(start_location, acceleration, speed, delta_time);
        entity.location = end_location;

        let saved = SavedMove {
            timestamp,
            delta_time,
            acceleration,
            flags: entity.movement.intent.to_flags(),
            start_location,
            end_location,
        };
        if let Some(mv) = entity.predictor.record(saved, max_delta_time) {
            self.send_to_server(ServerRpc::Move { entity: id, mv });
        }
        Ok(end_location)
    }

    /// Client: sends any move held back for combining.
    pub fn flush_moves(&mut self, id: EntityId) -> WorldResult<()> {
        if let Some(mv) = self.entity_mut(id)?.predictor.flush() {
            self.send_to_server(ServerRpc::Move { entity: id, mv });
        }
        Ok(())
    }

    /// Server: replays a client move with the intents it carries and either
    /// acknowledges it or corrects the client.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidMove`] if any field is NaN or infinite; the
    /// entity is left where it was.
    pub(crate) fn server_move(&mut self, id: EntityId, mv: ServerMove) -> WorldResult<()> {
        if let Some(field) = mv.non_finite_field() {
            warn!(target: "arena::movement", entity = %id, field, "rejecting non-finite move");
            return Err(WorldError::InvalidMove { entity: id, field });
        }
        let tolerance = self.config.max_position_error_squared;
        let delta_time = mv.delta_time.clamp(0.0, self.config.max_move_delta_time);
        let entity = self.entity_mut(id)?;
        entity.movement.update_from_compressed_flags(mv.flags);
        let speed = entity.max_speed();
        let location = movement::simulate_step(entity.location, mv.acceleration, speed, delta_time);
        entity.location = location;

        let error = location.distance_squared(mv.client_location);
        let reply = if error > tolerance {
            debug!(
                target: "arena::movement",
                entity = %id,
                timestamp = mv.timestamp,
                error,
                "correcting client position"
            );
            ClientRpc::AdjustPosition {
                entity: id,
                timestamp: mv.timestamp,
                location,
            }
        } else {
            ClientRpc::AckMove {
                entity: id,
                timestamp: mv.timestamp,
            }
        };
        self.send_to_owner(id, reply);
        Ok(())
    }

    /// Client: the server accepted every move up to `timestamp`.
    pub(crate) fn client_ack_move(&mut self, id: EntityId, timestamp: f32) -> WorldResult<()> {
        self.entity_mut(id)?.predictor.acknowledge(timestamp);
        Ok(())
    }

    /// Client: snaps to the server's position for `timestamp` and replays
    /// the moves the server has not seen yet.
    pub(crate) fn client_adjust_position(&mut self, id: EntityId, timestamp: f32, location: Vec3) -> WorldResult<()> {
        let config = self.config.clone();
        let entity = self.entity_mut(id)?;
        entity.predictor.acknowledge(timestamp);

        let ctx = entity.speed_context();
        let replay: Vec<SavedMove> = entity
            .predictor
            .unacknowledged()
            .iter()
            .chain(entity.predictor.pending())
            .copied()
            .collect();
        let mut corrected = location;
        for mv in &replay {
            let speed = movement::max_speed(&config, mv.intent(), ctx);
            corrected = movement::simulate_step(corrected, mv.acceleration, speed, mv.delta_time);
        }
        trace!(
            target: "arena::movement",
            entity = %id,
            replayed = replay.len(),
            ?corrected,
            "replayed unacknowledged moves"
        );
        entity.location = corrected;
        Ok(())
    }
}
