//! Movement intents, the max-speed rule, and saved-move prediction.

mod saved_move;

pub use saved_move::{CompressedFlags, MovePredictor, SavedMove, ServerMove};

use glam::Vec3;

use crate::config::GameConfig;

/// Predicted boolean movement intents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementIntent {
    pub sprint: bool,
    pub aim_down_sights: bool,
}

impl MovementIntent {
    pub fn to_flags(self) -> CompressedFlags {
        let mut flags = CompressedFlags::empty();
        flags.set(CompressedFlags::SPRINT, self.sprint);
        flags.set(CompressedFlags::AIM_DOWN_SIGHTS, self.aim_down_sights);
        flags
    }

    pub fn from_flags(flags: CompressedFlags) -> Self {
        Self {
            sprint: flags.contains(CompressedFlags::SPRINT),
            aim_down_sights: flags.contains(CompressedFlags::AIM_DOWN_SIGHTS),
        }
    }
}

/// Life-cycle facts the speed rule depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeedContext {
    pub alive: bool,
    pub knocked_down: bool,
    pub interacting: u32,
    pub interacting_removal: u32,
    /// Current `MoveSpeed` attribute.
    pub move_speed: f32,
}

/// Maximum speed for one simulation step.
///
/// Zero while dead or while interacting outnumbers interacting-removal.
/// Knockdown overrides both intents. Sprint wins over aim-down-sights.
pub fn max_speed(config: &GameConfig, intent: MovementIntent, ctx: SpeedContext) -> f32 {
    if !ctx.alive {
        return 0.0;
    }
    if ctx.interacting > ctx.interacting_removal {
        return 0.0;
    }
    if ctx.knocked_down {
        return ctx.move_speed * config.knocked_down_speed_multiplier;
    }
    if intent.sprint {
        return ctx.move_speed * config.sprint_speed_multiplier;
    }
    if intent.aim_down_sights {
        return ctx.move_speed * config.ads_speed_multiplier;
    }
    ctx.move_speed
}

/// Advances `location` by one step of `delta_time` seconds.
///
/// Acceleration only supplies direction; speed is always `max_speed`.
pub fn simulate_step(location: Vec3, acceleration: Vec3, max_speed: f32, delta_time: f32) -> Vec3 {
    location + acceleration.normalize_or_zero() * max_speed * delta_time
}

/// Per-entity movement state.
#[derive(Clone, Debug, Default)]
pub struct MovementComponent {
    pub intent: MovementIntent,
}

impl MovementComponent {
    pub fn start_sprinting(&mut self) {
        self.intent.sprint = true;
    }

    pub fn stop_sprinting(&mut self) {
        self.intent.sprint = false;
    }

    pub fn start_aiming(&mut self) {
        self.intent.aim_down_sights = true;
    }

    pub fn stop_aiming(&mut self) {
        self.intent.aim_down_sights = false;
    }

    /// Server side: adopts the intents carried by a client move.
    pub fn update_from_compressed_flags(&mut self, flags: CompressedFlags) {
        self.intent = MovementIntent::from_flags(flags);
    }
}
