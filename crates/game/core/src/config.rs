/// Gameplay tunables shared by the server and every predicting client.
///
/// Both sides must run with the same values, otherwise predicted movement and
/// weapon changes will be corrected on every tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    /// Lower bound applied to every proposed `MoveSpeed` value.
    pub move_speed_min: f32,
    /// Upper bound applied to every proposed `MoveSpeed` value.
    pub move_speed_max: f32,
    pub sprint_speed_multiplier: f32,
    pub ads_speed_multiplier: f32,
    pub knocked_down_speed_multiplier: f32,
    /// Seconds a revive interaction takes to complete.
    pub revive_duration: f32,
    /// Radius of the circle weapons are scattered on when their owner dies.
    pub drop_radius: f32,
    /// Fraction of `MaxHealth` restored when an entity is knocked down.
    pub knock_down_health_fraction: f32,
    /// Ticks during which another weapon change is blocked after one succeeds.
    pub weapon_change_delay_ticks: u64,
    /// Ticks the server waits before pushing the authoritative current weapon
    /// back to the owner after a change.
    pub weapon_change_replication_delay_ticks: u64,
    /// Longest simulated time two saved moves may cover once combined.
    pub max_move_delta_time: f32,
    /// Squared distance beyond which the server corrects a client move.
    pub max_position_error_squared: f32,
}

impl GameConfig {
    // ===== compile-time constants used as type parameters =====
    /// Unacknowledged saved moves a client keeps before dropping the oldest.
    pub const MAX_SAVED_MOVES: usize = 96;
    /// Weapons an inventory may hold.
    pub const MAX_INVENTORY_WEAPONS: usize = 8;
    /// State events processed for one entity before the queue is abandoned.
    pub const MAX_EVENTS_PER_FLUSH: usize = 256;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MOVE_SPEED_MIN: f32 = 150.0;
    pub const DEFAULT_MOVE_SPEED_MAX: f32 = 1000.0;
    pub const DEFAULT_SPRINT_SPEED_MULTIPLIER: f32 = 1.4;
    pub const DEFAULT_ADS_SPEED_MULTIPLIER: f32 = 0.8;
    pub const DEFAULT_KNOCKED_DOWN_SPEED_MULTIPLIER: f32 = 0.4;
    pub const DEFAULT_REVIVE_DURATION: f32 = 4.0;
    pub const DEFAULT_DROP_RADIUS: f32 = 50.0;
    pub const DEFAULT_KNOCK_DOWN_HEALTH_FRACTION: f32 = 1.0;
    pub const DEFAULT_WEAPON_CHANGE_DELAY_TICKS: u64 = 8;
    pub const DEFAULT_WEAPON_CHANGE_REPLICATION_DELAY_TICKS: u64 = 30;
    pub const DEFAULT_MAX_MOVE_DELTA_TIME: f32 = 0.125;
    pub const DEFAULT_MAX_POSITION_ERROR_SQUARED: f32 = 3.0;

    pub fn new() -> Self {
        Self {
            move_speed_min: Self::DEFAULT_MOVE_SPEED_MIN,
            move_speed_max: Self::DEFAULT_MOVE_SPEED_MAX,
            sprint_speed_multiplier: Self::DEFAULT_SPRINT_SPEED_MULTIPLIER,
            ads_speed_multiplier: Self::DEFAULT_ADS_SPEED_MULTIPLIER,
            knocked_down_speed_multiplier: Self::DEFAULT_KNOCKED_DOWN_SPEED_MULTIPLIER,
            revive_duration: Self::DEFAULT_REVIVE_DURATION,
            drop_radius: Self::DEFAULT_DROP_RADIUS,
            knock_down_health_fraction: Self::DEFAULT_KNOCK_DOWN_HEALTH_FRACTION,
            weapon_change_delay_ticks: Self::DEFAULT_WEAPON_CHANGE_DELAY_TICKS,
            weapon_change_replication_delay_ticks:
                Self::DEFAULT_WEAPON_CHANGE_REPLICATION_DELAY_TICKS,
            max_move_delta_time: Self::DEFAULT_MAX_MOVE_DELTA_TIME,
            max_position_error_squared: Self::DEFAULT_MAX_POSITION_ERROR_SQUARED,
        }
    }

    /// Builder-style override for the knockdown health pool.
    #[must_use]
    pub fn with_knock_down_health_fraction(mut self, fraction: f32) -> Self {
        self.knock_down_health_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Clamps a proposed move speed into the configured bounds.
    pub fn clamp_move_speed(&self, proposed: f32) -> f32 {
        proposed.clamp(self.move_speed_min, self.move_speed_max)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
