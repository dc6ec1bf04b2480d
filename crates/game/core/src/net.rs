//! Remote procedure calls exchanged between server and clients.

use glam::Vec3;

use crate::abilities::AbilityKind;
use crate::effects::DamageNumber;
use crate::movement::ServerMove;
use crate::replication::WorldSnapshot;
use crate::tags::GameplayTag;
use crate::types::{ControllerId, EntityId, WeaponId};

/// Owning client to server.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServerRpc {
    EquipWeapon {
        entity: EntityId,
        weapon: Option<WeaponId>,
    },
    /// Asks for the authoritative current weapon.
    SyncCurrentWeapon { entity: EntityId },
    /// Predicted ability activation. `target_weapon` is the weapon the client
    /// switched to locally for weapon-change abilities.
    ActivateAbility {
        entity: EntityId,
        kind: AbilityKind,
        target_weapon: Option<WeaponId>,
    },
    Move { entity: EntityId, mv: ServerMove },
}

impl ServerRpc {
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::EquipWeapon { entity, .. }
            | Self::SyncCurrentWeapon { entity }
            | Self::ActivateAbility { entity, .. }
            | Self::Move { entity, .. } => *entity,
        }
    }
}

/// Server to one client.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClientRpc {
    SyncCurrentWeapon {
        entity: EntityId,
        weapon: Option<WeaponId>,
    },
    AbilityActivationFailed {
        entity: EntityId,
        kind: AbilityKind,
        fail_tags: Vec<GameplayTag>,
    },
    ShowDamageNumber(DamageNumber),
    /// `Some(duration)` shows the prompt, `None` hides it.
    InteractionPrompt {
        entity: EntityId,
        duration: Option<f32>,
    },
    AckMove {
        entity: EntityId,
        timestamp: f32,
    },
    AdjustPosition {
        entity: EntityId,
        timestamp: f32,
        location: Vec3,
    },
    Snapshot(WorldSnapshot),
}

/// RPCs queued by a world during a step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outbox {
    pub to_server: Vec<ServerRpc>,
    pub to_clients: Vec<(ControllerId, ClientRpc)>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.to_server.is_empty() && self.to_clients.is_empty()
    }
}
