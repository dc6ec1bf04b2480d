//! Cloneable façade for issuing commands to the session worker.
//!
//! [`SessionHandle`] hides channel plumbing and offers async helpers for
//! stepping the match, feeding player input or streaming events from
//! specific topics.
use glam::Vec3;
use tokio::sync::{broadcast, mpsc, oneshot};

use arena_core::{ControllerId, DamageOutcome, EntityId, Tick, WeaponId, WeaponKind, WorldSnapshot};

use super::errors::{Result, RuntimeError};
use super::input::PlayerInput;
use crate::events::{Event, EventBus, Topic};
use crate::session::EntityView;
use crate::workers::Command;

/// Client-facing handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl SessionHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Advance the match by `ticks` steps and return the resulting tick
    pub async fn step(&self, ticks: u64) -> Result<Tick> {
        self.request(|reply| Command::Step { ticks, reply }).await?
    }

    /// Connect a player and spawn its hero
    pub async fn join(&self, controller: ControllerId, location: Vec3) -> Result<EntityId> {
        self.request(|reply| Command::Join {
            controller,
            location,
            reply,
        })
        .await?
    }

    /// Feed one input from a connected player
    pub async fn input(&self, controller: ControllerId, input: PlayerInput) -> Result<()> {
        self.request(|reply| Command::Input {
            controller,
            input,
            reply,
        })
        .await?
    }

    pub async fn spawn_minion(&self, location: Vec3) -> Result<EntityId> {
        self.request(|reply| Command::SpawnMinion { location, reply })
            .await?
    }

    pub async fn spawn_weapon(&self, kind: WeaponKind, location: Vec3) -> Result<WeaponId> {
        self.request(|reply| Command::SpawnWeapon {
            kind,
            location,
            reply,
        })
        .await?
    }

    pub async fn pick_up(&self, entity: EntityId, weapon: WeaponId) -> Result<()> {
        self.request(|reply| Command::PickUp {
            entity,
            weapon,
            reply,
        })
        .await?
    }

    /// Resolve a hit on the server
    pub async fn damage(
        &self,
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
        headshot: bool,
    ) -> Result<Option<DamageOutcome>> {
        self.request(|reply| Command::Damage {
            source,
            target,
            amount,
            headshot,
            reply,
        })
        .await?
    }

    /// Replicated state as `viewer`'s connection would receive it
    pub async fn snapshot(&self, viewer: ControllerId) -> Result<WorldSnapshot> {
        self.request(|reply| Command::Snapshot { viewer, reply })
            .await
    }

    /// Server-side summary of one entity
    pub async fn inspect(&self, entity: EntityId) -> Result<Option<EntityView>> {
        self.request(|reply| Command::Inspect { entity, reply })
            .await
    }

    /// Stop the worker; returns the last tick it simulated
    pub async fn shutdown(&self) -> Result<Tick> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Match` - Joins, deaths, respawns, interactions
    /// - `Topic::Presentation` - Cosmetics and HUD updates
    /// - `Topic::Network` - Rejected RPCs and connections
    /// - `Topic::Tick` - Step completion
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> std::collections::HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
