use arrayvec::ArrayVec;
use bitflags::bitflags;
use glam::Vec3;
use tracing::warn;

use super::MovementIntent;
use crate::config::GameConfig;

bitflags! {
    /// Move flags as sent over the wire.
    ///
    /// The low nibble carries built-in movement bits, the high nibble is
    /// free for game intents.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CompressedFlags: u8 {
        const JUMP = 1 << 0;
        const CROUCH = 1 << 1;
        const RESERVED_1 = 1 << 2;
        const RESERVED_2 = 1 << 3;
        const SPRINT = 1 << 4;
        const AIM_DOWN_SIGHTS = 1 << 5;
        const CUSTOM_2 = 1 << 6;
        const CUSTOM_3 = 1 << 7;
    }
}

/// Minimum cosine between two accelerations for their moves to combine.
const ACCEL_DOT_THRESHOLD_COMBINE: f32 = 0.996;

/// One predicted simulation step kept until the server acknowledges it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavedMove {
    /// Client time at the end of the move, in seconds.
    pub timestamp: f32,
    pub delta_time: f32,
    pub acceleration: Vec3,
    pub flags: CompressedFlags,
    pub start_location: Vec3,
    pub end_location: Vec3,
}

impl SavedMove {
    pub fn intent(&self) -> MovementIntent {
        MovementIntent::from_flags(self.flags)
    }

    /// True if `next` may be folded into this move.
    ///
    /// Intent bits must match exactly, otherwise an input transition would
    /// be lost. Acceleration must point the same way and the combined step
    /// must stay within `max_delta_time`.
    pub fn can_combine_with(&self, next: &SavedMove, max_delta_time: f32) -> bool {
        if self.flags != next.flags {
            return false;
        }
        if self.acceleration == Vec3::ZERO {
            if next.acceleration != Vec3::ZERO {
                return false;
            }
        } else {
            if next.acceleration == Vec3::ZERO {
                return false;
            }
            let dot = self
                .acceleration
                .normalize_or_zero()
                .dot(next.acceleration.normalize_or_zero());
            if dot < ACCEL_DOT_THRESHOLD_COMBINE {
                return false;
            }
        }
        self.delta_time + next.delta_time <= max_delta_time
    }

    /// Folds `next` into this move.
    pub fn combine_with(&mut self, next: &SavedMove) {
        self.delta_time += next.delta_time;
        self.timestamp = next.timestamp;
        self.acceleration = next.acceleration;
        self.end_location = next.end_location;
    }

    pub fn to_server_move(&self) -> ServerMove {
        ServerMove {
            timestamp: self.timestamp,
            delta_time: self.delta_time,
            acceleration: self.acceleration,
            flags: self.flags,
            client_location: self.end_location,
        }
    }
}

/// Compressed move sent from the owning client to the server.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerMove {
    pub timestamp: f32,
    pub delta_time: f32,
    pub acceleration: Vec3,
    pub flags: CompressedFlags,
    /// Where the client ended up, checked against the server's result.
    pub client_location: Vec3,
}

impl ServerMove {
    /// First field that is not a finite number, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        if !self.timestamp.is_finite() {
            Some("timestamp")
        } else if !self.delta_time.is_finite() {
            Some("delta_time")
        } else if !self.acceleration.is_finite() {
            Some("acceleration")
        } else if !self.client_location.is_finite() {
            Some("client_location")
        } else {
            None
        }
    }
}

/// Client-side saved-move buffer.
///
/// Each recorded step is held back one step so it can absorb the next one.
/// Sent moves stay buffered until the server acknowledges or corrects them.
#[derive(Clone, Debug, Default)]
pub struct MovePredictor {
    pending: Option<SavedMove>,
    saved: ArrayVec<SavedMove, { GameConfig::MAX_SAVED_MOVES }>,
}

impl MovePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly simulated move.
    ///
    /// Returns the move that should be sent now, if the previous pending move
    /// could not absorb this one.
    pub fn record(&mut self, mv: SavedMove, max_delta_time: f32) -> Option<ServerMove> {
        if let Some(pending) = self.pending.as_mut() {
            if pending.can_combine_with(&mv, max_delta_time) {
                pending.combine_with(&mv);
                return None;
            }
        }
        let ready = self.pending.replace(mv)?;
        Some(self.send(ready))
    }

    /// Sends whatever is pending.
    pub fn flush(&mut self) -> Option<ServerMove> {
        let ready = self.pending.take()?;
        Some(self.send(ready))
    }

    /// Drops every sent move up to and including `timestamp`.
    pub fn acknowledge(&mut self, timestamp: f32) {
        self.saved.retain(|mv| mv.timestamp > timestamp);
    }

    /// Sent moves the server has not acknowledged, oldest first.
    pub fn unacknowledged(&self) -> &[SavedMove] {
        &self.saved
    }

    pub fn pending(&self) -> Option<&SavedMove> {
        self.pending.as_ref()
    }

    /// Forgets every move, e.g. after the entity respawns.
    pub fn clear(&mut self) {
        self.pending = None;
        self.saved.clear();
    }

    fn send(&mut self, mv: SavedMove) -> ServerMove {
        if self.saved.is_full() {
            warn!(target: "arena::movement", "saved move buffer full, dropping oldest");
            self.saved.remove(0);
        }
        self.saved.push(mv);
        mv.to_server_move()
    }
}
