//! Player input accepted by a session.

use glam::Vec3;

use arena_core::{EntityId, WeaponId};

/// One input from a connected player.
///
/// Movement and weapon inputs run on the player's predicted world and
/// reach the server as RPCs. Interactions are resolved on the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerInput {
    /// Acceleration held until the next `Move`; `Vec3::ZERO` stops.
    Move { acceleration: Vec3 },
    Sprint(bool),
    Aim(bool),
    NextWeapon,
    PreviousWeapon,
    /// `None` holsters the current weapon.
    Equip(Option<WeaponId>),
    TogglePerspective,
    /// Starts holding the interaction on `target`.
    Interact { target: EntityId },
    ReleaseInteract,
}
