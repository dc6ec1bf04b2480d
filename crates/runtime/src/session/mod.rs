//! One match: an authoritative server world and a predicted world per player.
//!
//! [`Session::step`] advances everything by one tick in a fixed order:
//!
//! 1. the server clock advances and due client RPCs are handled,
//! 2. interactions and respawns are resolved,
//! 3. server notifications are dispatched and its RPCs and snapshots sent,
//! 4. each client applies what reached it, predicts its own movement and
//!    sends its RPCs back.
//!
//! All traffic crosses a [`LoopbackTransport`], so packets take at least
//! `latency_ticks` to arrive.

mod game_mode;
mod interaction;
mod sinks;

pub use game_mode::{ArenaGameMode, PendingRespawn};
pub use interaction::{InteractionDriver, InteractionOutcome};
pub use sinks::{HudRelay, PresentationRelay, RemoteGameMode};

use std::collections::BTreeMap;

use glam::Vec3;
use tracing::{debug, info, trace, warn};

use arena_content::Content;
use arena_core::notify::dispatch;
use arena_core::{
    AbilityKind, Attribute, ClientRpc, Controller, ControllerId, DamageOutcome, EntityId, GameError, LifeState, Tick,
    WeaponId, WeaponKind, World, WorldSnapshot,
};

use crate::api::{PlayerInput, Result, RuntimeError};
use crate::events::{Event, EventBus, MatchEvent, NetworkEvent, Peer, TickEvent};
use crate::runtime::RuntimeConfig;
use crate::transport::{LoopbackTransport, TransportError};

/// Template spawned for every joining player.
pub const HERO_TEMPLATE: &str = "Hero";
/// Template used by [`Session::spawn_minion`].
pub const MINION_TEMPLATE: &str = "Minion";

/// Summary of one entity on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub life_state: LifeState,
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub current_weapon: Option<WeaponId>,
    pub inventory: Vec<WeaponId>,
    pub location: Vec3,
}

struct ClientSlot {
    world: World,
    hero: EntityId,
    acceleration: Vec3,
    /// Client time stamped on saved moves.
    clock: f32,
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    content: Content,
    config: RuntimeConfig,
    event_bus: Option<EventBus>,
}

impl SessionBuilder {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            config: RuntimeConfig::default(),
            event_bus: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish onto an existing bus instead of a fresh one.
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// # Errors
    ///
    /// [`RuntimeError::InvalidConfig`] if the runtime configuration is unusable.
    pub fn build(self) -> Result<Session> {
        self.config.validate()?;
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(self.config.event_buffer_size));
        let game_mode = ArenaGameMode::new(self.config.respawn_delay_ticks(), event_bus.clone());
        let interactions = InteractionDriver::new(self.config.tick_rate);
        let transport = LoopbackTransport::new(self.config.latency_ticks);

        info!(
            target: "runtime::session",
            tick_rate = self.config.tick_rate,
            latency_ticks = self.config.latency_ticks,
            templates = self.content.templates.len(),
            "session created"
        );

        Ok(Session {
            server: self.content.server_world(),
            content: self.content,
            config: self.config,
            clients: BTreeMap::new(),
            spawn_points: BTreeMap::new(),
            transport,
            game_mode,
            interactions,
            event_bus,
        })
    }
}

pub struct Session {
    content: Content,
    config: RuntimeConfig,
    server: World,
    clients: BTreeMap<ControllerId, ClientSlot>,
    spawn_points: BTreeMap<EntityId, Vec3>,
    transport: LoopbackTransport,
    game_mode: ArenaGameMode,
    interactions: InteractionDriver,
    event_bus: EventBus,
}

impl Session {
    pub fn builder(content: Content) -> SessionBuilder {
        SessionBuilder::new(content)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn tick(&self) -> Tick {
        self.server.tick()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn server(&self) -> &World {
        &self.server
    }

    /// Predicted world of a connected player.
    pub fn client(&self, controller: ControllerId) -> Option<&World> {
        self.clients.get(&controller).map(|slot| &slot.world)
    }

    /// Hero controlled by a connected player.
    pub fn hero(&self, controller: ControllerId) -> Option<EntityId> {
        self.clients.get(&controller).map(|slot| slot.hero)
    }

    pub fn players(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.clients.keys().copied()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn transport(&self) -> &LoopbackTransport {
        &self.transport
    }

    pub fn game_mode(&self) -> &ArenaGameMode {
        &self.game_mode
    }

    /// Replicated state as `viewer`'s connection would receive it.
    pub fn snapshot(&self, viewer: ControllerId) -> WorldSnapshot {
        self.server.capture_snapshot(viewer)
    }

    pub fn inspect(&self, entity: EntityId) -> Option<EntityView> {
        let e = self.server.entity(entity)?;
        Some(EntityView {
            id: e.id,
            life_state: e.life_state(),
            health: e.attributes.get(Attribute::Health),
            max_health: e.attributes.get(Attribute::MaxHealth),
            shield: e.attributes.get(Attribute::Shield),
            current_weapon: e.current_weapon,
            inventory: e.inventory.as_slice().to_vec(),
            location: e.location,
        })
    }

    // ========================================================================
    // Match setup
    // ========================================================================

    /// Connects a player and spawns its hero at `location`.
    ///
    /// The player's world learns about the hero from the first snapshot.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AlreadyConnected`] for a second join, or the world
    /// error if the hero template is missing.
    pub fn join(&mut self, controller: ControllerId, location: Vec3) -> Result<EntityId> {
        if self.clients.contains_key(&controller) {
            return Err(RuntimeError::AlreadyConnected(controller));
        }
        let hero = self
            .server
            .spawn_entity(HERO_TEMPLATE, Some(Controller::player(controller)), location)?;
        self.transport.connect(controller);
        self.spawn_points.insert(hero, location);
        self.clients.insert(controller, ClientSlot {
            world: self.content.client_world(controller),
            hero,
            acceleration: Vec3::ZERO,
            clock: 0.0,
        });

        info!(target: "runtime::session", %controller, %hero, "player joined");
        self.event_bus
            .publish(Event::Network(NetworkEvent::Connected { controller }));
        self.event_bus
            .publish(Event::Match(MatchEvent::PlayerJoined { controller, entity: hero }));
        Ok(hero)
    }

    /// Spawns an uncontrolled minion on the server.
    pub fn spawn_minion(&mut self, location: Vec3) -> Result<EntityId> {
        let entity = self.server.spawn_entity(MINION_TEMPLATE, None, location)?;
        self.event_bus.publish(Event::Match(MatchEvent::EntitySpawned {
            entity,
            template: MINION_TEMPLATE.to_owned(),
        }));
        Ok(entity)
    }

    /// Drops a weapon pickup into the world.
    pub fn spawn_weapon(&mut self, kind: WeaponKind, location: Vec3) -> Result<WeaponId> {
        let weapon = self.server.spawn_weapon(kind, location)?;
        self.event_bus
            .publish(Event::Match(MatchEvent::WeaponSpawned { weapon }));
        Ok(weapon)
    }

    /// Server: `entity` touches a weapon pickup.
    pub fn pick_up(&mut self, entity: EntityId, weapon: WeaponId) -> Result<()> {
        self.server.pick_up(entity, weapon)?;
        Ok(())
    }

    /// Server: resolves a hit. Returns `None` if no damage was dealt.
    pub fn damage(
        &mut self,
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
        headshot: bool,
    ) -> Result<Option<DamageOutcome>> {
        let outcome = self.server.apply_damage(source, target, amount, headshot)?;
        if let Some(outcome) = outcome {
            debug!(target: "runtime::session", %target, ?source, amount, "damage applied");
            self.event_bus.publish(Event::Match(MatchEvent::DamageApplied {
                target,
                source,
                outcome,
            }));
        }
        Ok(outcome)
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Applies one input from `controller`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownController`] if the player never joined, or the
    /// world error if its hero has not replicated yet.
    pub fn input(&mut self, controller: ControllerId, input: PlayerInput) -> Result<()> {
        let slot = self
            .clients
            .get_mut(&controller)
            .ok_or(RuntimeError::UnknownController(controller))?;
        let hero = slot.hero;
        trace!(target: "runtime::session", %controller, ?input, "player input");

        match input {
            PlayerInput::Move { acceleration } => slot.acceleration = acceleration,
            PlayerInput::Sprint(on) => slot.world.set_sprinting(hero, on)?,
            PlayerInput::Aim(on) => slot.world.set_aiming(hero, on)?,
            PlayerInput::NextWeapon => slot.world.activate_ability(hero, AbilityKind::NextWeapon)?,
            PlayerInput::PreviousWeapon => slot
                .world
                .activate_ability(hero, AbilityKind::PreviousWeapon)?,
            PlayerInput::Equip(weapon) => slot.world.equip_weapon(hero, weapon)?,
            PlayerInput::TogglePerspective => {
                slot.world.toggle_perspective(hero)?;
            }
            PlayerInput::Interact { target } => {
                if self.interactions.begin(&mut self.server, hero, target)? {
                    self.event_bus.publish(Event::Match(MatchEvent::InteractionStarted {
                        interactor: hero,
                        target,
                    }));
                }
            }
            PlayerInput::ReleaseInteract => {
                if let Some(target) = self.interactions.release(&mut self.server, hero)? {
                    self.event_bus
                        .publish(Event::Match(MatchEvent::InteractionCancelled {
                            interactor: hero,
                            target,
                        }));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Advances the match by one tick.
    ///
    /// # Errors
    ///
    /// Transport encoding failures and world errors raised by the server's
    /// own bookkeeping. Rejected client RPCs are published on
    /// [`crate::events::Topic::Network`] instead.
    pub fn step(&mut self) -> Result<Tick> {
        self.server.advance();
        let now = self.server.tick();

        self.receive_on_server(now)?;
        self.resolve_interactions();
        self.resolve_respawns(now);
        self.flush_server(now)?;

        let controllers: Vec<ControllerId> = self.clients.keys().copied().collect();
        for controller in controllers {
            self.step_client(controller, now)?;
        }

        self.event_bus.publish(Event::Tick(TickEvent {
            tick: now,
            packets_in_flight: self.transport.in_flight(),
        }));
        Ok(now)
    }

    /// Runs `ticks` steps and returns the final tick.
    pub fn run_ticks(&mut self, ticks: u64) -> Result<Tick> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(self.tick())
    }

    fn receive_on_server(&mut self, now: Tick) -> Result<()> {
        for (from, rpc) in self.transport.receive_on_server(now)? {
            if let Err(err) = self.server.handle_server_rpc(from, rpc) {
                warn!(
                    target: "runtime::session",
                    %from,
                    severity = err.severity().as_str(),
                    code = err.error_code(),
                    %err,
                    "server rpc rejected"
                );
                self.event_bus.publish(Event::Network(NetworkEvent::RpcRejected {
                    from,
                    code: err.error_code(),
                    message: err.to_string(),
                }));
            }
        }
        Ok(())
    }

    fn resolve_interactions(&mut self) {
        for outcome in self.interactions.update(&mut self.server) {
            let event = match outcome {
                InteractionOutcome::Completed { interactor, target } => {
                    MatchEvent::InteractionCompleted { interactor, target }
                }
                InteractionOutcome::Cancelled { interactor, target } => {
                    MatchEvent::InteractionCancelled { interactor, target }
                }
            };
            self.event_bus.publish(Event::Match(event));
        }
    }

    fn resolve_respawns(&mut self, now: Tick) {
        for due in self.game_mode.take_due(now) {
            let location = self
                .spawn_points
                .get(&due.entity)
                .copied()
                .unwrap_or(Vec3::ZERO);
            match self.server.respawn(due.entity, location) {
                Ok(()) => self.event_bus.publish(Event::Match(MatchEvent::Respawned {
                    entity: due.entity,
                })),
                Err(err) => {
                    warn!(target: "runtime::session", entity = %due.entity, %err, "respawn failed");
                }
            }
        }
    }

    /// Dispatches server notifications and sends its RPCs and snapshots.
    fn flush_server(&mut self, now: Tick) -> Result<()> {
        self.game_mode.set_clock(now);
        let mut presentation = PresentationRelay::new(self.event_bus.clone(), Peer::Server);
        let mut hud = HudRelay::new(self.event_bus.clone(), None);
        for notification in self.server.drain_notifications() {
            dispatch(&notification, &mut presentation, &mut hud, &mut self.game_mode);
        }

        for (to, rpc) in self.server.drain_outbox().to_clients {
            send_downstream(&mut self.transport, now, to, &rpc)?;
        }

        if now.0 % self.config.snapshot_interval_ticks == 0 {
            for &controller in self.clients.keys() {
                let snapshot = ClientRpc::Snapshot(self.server.capture_snapshot(controller));
                send_downstream(&mut self.transport, now, controller, &snapshot)?;
            }
        }
        Ok(())
    }

    fn step_client(&mut self, controller: ControllerId, now: Tick) -> Result<()> {
        let dt = self.config.tick_seconds();
        let Some(slot) = self.clients.get_mut(&controller) else {
            return Ok(());
        };

        slot.world.advance();
        for rpc in self.transport.receive_on_client(now, controller)? {
            if let Err(err) = slot.world.handle_client_rpc(rpc) {
                warn!(
                    target: "runtime::session",
                    %controller,
                    severity = err.severity().as_str(),
                    code = err.error_code(),
                    %err,
                    "client rpc failed"
                );
                self.event_bus
                    .publish(Event::Network(NetworkEvent::ClientRpcFailed {
                        controller,
                        code: err.error_code(),
                        message: err.to_string(),
                    }));
            }
        }

        if slot.world.entity(slot.hero).is_some() {
            if slot.acceleration != Vec3::ZERO {
                slot.clock += dt;
                slot.world
                    .move_locally(slot.hero, slot.acceleration, slot.clock, dt)?;
            } else {
                slot.world.flush_moves(slot.hero)?;
            }
        }

        let mut presentation = PresentationRelay::new(self.event_bus.clone(), Peer::Client(controller));
        let mut hud = HudRelay::new(self.event_bus.clone(), Some(controller));
        for notification in slot.world.drain_notifications() {
            dispatch(&notification, &mut presentation, &mut hud, &mut RemoteGameMode);
        }
        for rpc in slot.world.drain_outbox().to_server {
            self.transport.send_to_server(now, controller, &rpc)?;
        }
        Ok(())
    }
}

fn send_downstream(
    transport: &mut LoopbackTransport,
    now: Tick,
    to: ControllerId,
    rpc: &ClientRpc,
) -> Result<()> {
    match transport.send_to_client(now, to, rpc) {
        Ok(()) => Ok(()),
        Err(TransportError::NotConnected(to)) => {
            debug!(target: "runtime::transport", %to, "dropping packet for closed connection");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
