//! Event types for different topics.

use glam::Vec3;

use arena_core::{ControllerId, DamageOutcome, EntityId, GameplayTag, HudUpdate, Tick, WeaponId};

/// Which world produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    Server,
    Client(ControllerId),
}

/// Match flow as seen by the authoritative server.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    PlayerJoined {
        controller: ControllerId,
        entity: EntityId,
    },
    PlayerLeft {
        controller: ControllerId,
    },
    EntitySpawned {
        entity: EntityId,
        template: String,
    },
    WeaponSpawned {
        weapon: WeaponId,
    },
    DamageApplied {
        target: EntityId,
        source: Option<EntityId>,
        outcome: DamageOutcome,
    },
    EntityDied {
        entity: EntityId,
        controller: Option<ControllerId>,
        /// Tick the respawn is scheduled for; `None` for entities that stay dead.
        respawn_at: Option<Tick>,
    },
    Respawned {
        entity: EntityId,
    },
    InteractionStarted {
        interactor: EntityId,
        target: EntityId,
    },
    InteractionCompleted {
        interactor: EntityId,
        target: EntityId,
    },
    InteractionCancelled {
        interactor: EntityId,
        target: EntityId,
    },
}

/// Presentation and HUD requests drained from a world.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    Montage {
        peer: Peer,
        entity: EntityId,
        montage: String,
    },
    VisualCue {
        peer: Peer,
        entity: EntityId,
        cue: GameplayTag,
        location: Vec3,
    },
    Perspective {
        peer: Peer,
        entity: EntityId,
        first_person: bool,
    },
    Hud {
        controller: ControllerId,
        update: HudUpdate,
    },
}

/// Transport-level outcomes worth surfacing.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// The server refused an RPC.
    RpcRejected {
        from: ControllerId,
        code: &'static str,
        message: String,
    },
    /// A client failed to apply an RPC from the server.
    ClientRpcFailed {
        controller: ControllerId,
        code: &'static str,
        message: String,
    },
    Connected {
        controller: ControllerId,
    },
    Disconnected {
        controller: ControllerId,
    },
}

/// Emitted once per completed session step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub tick: Tick,
    pub packets_in_flight: usize,
}
