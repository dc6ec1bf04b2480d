//! Session worker that owns the authoritative [`Session`].
//!
//! Receives commands from [`crate::api::SessionHandle`] and replies over
//! oneshot channels. Events are published by the session itself.

use glam::Vec3;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use arena_core::{ControllerId, DamageOutcome, EntityId, Tick, WeaponId, WeaponKind, WorldSnapshot};

use crate::api::{PlayerInput, Result};
use crate::session::{EntityView, Session};

/// Commands that can be sent to the session worker
pub enum Command {
    /// Advance the match by `ticks` steps.
    Step {
        ticks: u64,
        reply: oneshot::Sender<Result<Tick>>,
    },
    Join {
        controller: ControllerId,
        location: Vec3,
        reply: oneshot::Sender<Result<EntityId>>,
    },
    Input {
        controller: ControllerId,
        input: PlayerInput,
        reply: oneshot::Sender<Result<()>>,
    },
    SpawnMinion {
        location: Vec3,
        reply: oneshot::Sender<Result<EntityId>>,
    },
    SpawnWeapon {
        kind: WeaponKind,
        location: Vec3,
        reply: oneshot::Sender<Result<WeaponId>>,
    },
    PickUp {
        entity: EntityId,
        weapon: WeaponId,
        reply: oneshot::Sender<Result<()>>,
    },
    Damage {
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
        headshot: bool,
        reply: oneshot::Sender<Result<Option<DamageOutcome>>>,
    },
    /// Replicated state as seen by `viewer`.
    Snapshot {
        viewer: ControllerId,
        reply: oneshot::Sender<WorldSnapshot>,
    },
    Inspect {
        entity: EntityId,
        reply: oneshot::Sender<Option<EntityView>>,
    },
    Shutdown { reply: oneshot::Sender<Tick> },
}

/// Background task that processes session commands.
pub struct SessionWorker {
    session: Session,
    command_rx: mpsc::Receiver<Command>,
}

impl SessionWorker {
    pub fn new(session: Session, command_rx: mpsc::Receiver<Command>) -> Self {
        info!(
            target: "runtime::worker",
            tick = %session.tick(),
            players = session.players().count(),
            "SessionWorker initialized"
        );
        Self {
            session,
            command_rx,
        }
    }

    /// Main worker loop. Ends on [`Command::Shutdown`] or once every handle
    /// is dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            if !self.handle_command(cmd) {
                break;
            }
        }
        info!(target: "runtime::worker", tick = %self.session.tick(), "SessionWorker stopped");
    }

    /// Returns `false` once the worker should stop.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Step { ticks, reply } => {
                let result = self.session.run_ticks(ticks);
                respond(reply, result, "Step");
            }
            Command::Join {
                controller,
                location,
                reply,
            } => {
                let result = self.session.join(controller, location);
                respond(reply, result, "Join");
            }
            Command::Input {
                controller,
                input,
                reply,
            } => {
                let result = self.session.input(controller, input);
                respond(reply, result, "Input");
            }
            Command::SpawnMinion { location, reply } => {
                let result = self.session.spawn_minion(location);
                respond(reply, result, "SpawnMinion");
            }
            Command::SpawnWeapon {
                kind,
                location,
                reply,
            } => {
                let result = self.session.spawn_weapon(kind, location);
                respond(reply, result, "SpawnWeapon");
            }
            Command::PickUp {
                entity,
                weapon,
                reply,
            } => {
                let result = self.session.pick_up(entity, weapon);
                respond(reply, result, "PickUp");
            }
            Command::Damage {
                source,
                target,
                amount,
                headshot,
                reply,
            } => {
                let result = self.session.damage(source, target, amount, headshot);
                respond(reply, result, "Damage");
            }
            Command::Snapshot { viewer, reply } => {
                respond(reply, self.session.snapshot(viewer), "Snapshot");
            }
            Command::Inspect { entity, reply } => {
                respond(reply, self.session.inspect(entity), "Inspect");
            }
            Command::Shutdown { reply } => {
                respond(reply, self.session.tick(), "Shutdown");
                return false;
            }
        }
        true
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T, command: &'static str) {
    if reply.send(value).is_err() {
        debug!(target: "runtime::worker", command, "reply channel closed (caller dropped)");
    }
}
