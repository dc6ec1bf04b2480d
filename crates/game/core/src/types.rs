//! Identifiers and small value types shared by every module.

use core::fmt;

/// Unique identifier for any entity (hero or minion) in a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Unique identifier for a weapon instance (world pickup or inventory item).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponId(pub u32);

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weapon#{}", self.0)
    }
}

/// Identifies a network participant (player connection or AI brain).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerId(pub u32);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

/// Whether a controller is a human connection with a HUD, or an AI brain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerKind {
    Player,
    Ai,
}

/// Controller attached to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Controller {
    pub id: ControllerId,
    pub kind: ControllerKind,
}

impl Controller {
    pub const fn player(id: ControllerId) -> Self {
        Self {
            id,
            kind: ControllerKind::Player,
        }
    }

    pub const fn ai(id: ControllerId) -> Self {
        Self {
            id,
            kind: ControllerKind::Ai,
        }
    }

    /// Returns true if this controller has a HUD to notify.
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, ControllerKind::Player)
    }
}

/// Simulation tick counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn saturating_add(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    #[must_use]
    pub const fn next(self) -> Self {
        self.saturating_add(1)
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` is in the future.
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Network role of the local copy of an entity.
///
/// The same entity exists once on the server (`Authority`) and once per
/// client: as an `AutonomousProxy` on the owning client, and as a
/// `SimulatedProxy` everywhere else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetRole {
    Authority,
    AutonomousProxy,
    SimulatedProxy,
}

impl NetRole {
    pub const fn has_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}

/// Returns true when two floats are within a small tolerance.
pub fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1.0e-4
}
