//! The simulation root: every entity and weapon known to one machine.
//!
//! A [`World`] runs either as the authoritative server or as one client's
//! predicted copy. All gameplay operations enter through `World` methods;
//! each one settles the state events it caused before returning, so
//! life-cycle transitions and HUD relays observe commit order.
//!
//! Side effects leave the world through two queues the host drains after
//! every step: [`Notification`]s for local collaborators and an [`Outbox`]
//! of RPCs for the transport.

mod abilities;
mod effects;
mod equip;
mod events;
mod interaction;
mod inventory;
mod lifecycle;
mod movement;
mod replication;
mod rpc;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use crate::abilities::{AbilityError, AbilityKind};
use crate::attributes::Attribute;
use crate::config::GameConfig;
use crate::entity::{Entity, EntityTemplate};
use crate::error::{ErrorSeverity, GameError};
use crate::net::{ClientRpc, Outbox, ServerRpc};
use crate::notify::{HudUpdate, Notification};
use crate::observe::Listener;
use crate::tags::{GameplayTag, TagError};
use crate::types::{Controller, ControllerId, EntityId, NetRole, Tick, WeaponId};
use crate::weapon::{InventoryError, Weapon, WeaponCatalog, WeaponDef, WeaponKind};

/// Which side of the connection this world simulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetMode {
    /// Dedicated authoritative server.
    Server,
    /// Client predicting for the given local controller.
    Client { local: ControllerId },
}

/// Errors raised by world operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown {0}")]
    UnknownEntity(EntityId),

    #[error("unknown {0}")]
    UnknownWeapon(WeaponId),

    #[error("unknown entity template `{0}`")]
    UnknownTemplate(String),

    #[error("no definition for weapon kind {0:?}")]
    UnknownWeaponKind(WeaponKind),

    #[error("{operation} requires authority")]
    NotAuthority { operation: &'static str },

    #[error("move for {entity} has a non-finite {field}")]
    InvalidMove { entity: EntityId, field: &'static str },

    #[error("{entity} has no {kind:?} ability")]
    AbilityNotGranted { entity: EntityId, kind: AbilityKind },

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Ability(#[from] AbilityError),

    #[error(transparent)]
    Tag(#[from] TagError),
}

impl GameError for WorldError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotAuthority { .. } => ErrorSeverity::Recoverable,
            Self::UnknownEntity(_)
            | Self::UnknownWeapon(_)
            | Self::UnknownTemplate(_)
            | Self::UnknownWeaponKind(_)
            | Self::InvalidMove { .. }
            | Self::AbilityNotGranted { .. } => ErrorSeverity::Validation,
            Self::Inventory(err) => err.severity(),
            Self::Ability(err) => err.severity(),
            Self::Tag(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownEntity(_) => "WORLD_UNKNOWN_ENTITY",
            Self::UnknownWeapon(_) => "WORLD_UNKNOWN_WEAPON",
            Self::UnknownTemplate(_) => "WORLD_UNKNOWN_TEMPLATE",
            Self::UnknownWeaponKind(_) => "WORLD_UNKNOWN_WEAPON_KIND",
            Self::NotAuthority { .. } => "WORLD_NOT_AUTHORITY",
            Self::InvalidMove { .. } => "WORLD_INVALID_MOVE",
            Self::AbilityNotGranted { .. } => "WORLD_ABILITY_NOT_GRANTED",
            Self::Inventory(err) => err.error_code(),
            Self::Ability(err) => err.error_code(),
            Self::Tag(err) => err.error_code(),
        }
    }
}

pub type WorldResult<T> = Result<T, WorldError>;

/// Attributes relayed to the local HUD as percentages.
const HUD_ATTRIBUTES: [Attribute; 6] = [
    Attribute::Health,
    Attribute::MaxHealth,
    Attribute::Mana,
    Attribute::MaxMana,
    Attribute::Shield,
    Attribute::MaxShield,
];

pub struct World {
    mode: NetMode,
    config: Arc<GameConfig>,
    catalog: Arc<WeaponCatalog>,
    templates: BTreeMap<String, Arc<EntityTemplate>>,
    tick: Tick,
    entities: BTreeMap<EntityId, Entity>,
    weapons: BTreeMap<WeaponId, Weapon>,
    next_entity: u32,
    next_weapon: u32,
    notifications: Vec<Notification>,
    outbox: Outbox,
}

impl World {
    pub fn new(mode: NetMode, config: GameConfig, catalog: WeaponCatalog) -> Self {
        Self {
            mode,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            templates: BTreeMap::new(),
            tick: Tick::ZERO,
            entities: BTreeMap::new(),
            weapons: BTreeMap::new(),
            next_entity: 0,
            next_weapon: 0,
            notifications: Vec::new(),
            outbox: Outbox::default(),
        }
    }

    pub fn server(config: GameConfig, catalog: WeaponCatalog) -> Self {
        Self::new(NetMode::Server, config, catalog)
    }

    pub fn client(local: ControllerId, config: GameConfig, catalog: WeaponCatalog) -> Self {
        Self::new(NetMode::Client { local }, config, catalog)
    }

    pub fn register_template(&mut self, template: EntityTemplate) {
        self.templates
            .insert(template.name.clone(), Arc::new(template));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn mode(&self) -> NetMode {
        self.mode
    }

    pub fn is_server(&self) -> bool {
        matches!(self.mode, NetMode::Server)
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    pub fn template(&self, name: &str) -> Option<&EntityTemplate> {
        self.templates.get(name).map(Arc::as_ref)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&Weapon> {
        self.weapons.get(&id)
    }

    pub fn weapons(&self) -> impl Iterator<Item = &Weapon> {
        self.weapons.values()
    }

    /// Entity currently controlled by `controller`.
    pub fn entity_for_controller(&self, controller: ControllerId) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| e.controller_id() == Some(controller))
            .map(|e| e.id)
    }

    pub fn weapon_def(&self, weapon: WeaponId) -> Option<&WeaponDef> {
        self.weapons
            .get(&weapon)
            .and_then(|w| self.catalog.get(w.kind))
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Server: spawns an entity from a registered template.
    ///
    /// A controlled entity is possessed immediately, which grants its
    /// abilities and default inventory.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotAuthority`] on a client, [`WorldError::UnknownTemplate`]
    /// if `template` was never registered.
    pub fn spawn_entity(
        &mut self,
        template: &str,
        controller: Option<Controller>,
        location: Vec3,
    ) -> WorldResult<EntityId> {
        if !self.is_server() {
            return Err(WorldError::NotAuthority {
                operation: "spawn_entity",
            });
        }
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.insert_entity(id, template, controller, location)?;
        debug!(target: "arena::lifecycle", entity = %id, template, "spawned entity");
        if let Some(controller) = controller {
            self.possess(id, controller)?;
        }
        Ok(id)
    }

    /// Creates the local copy of an entity and wires its standing listeners.
    pub(crate) fn insert_entity(
        &mut self,
        id: EntityId,
        template: &str,
        controller: Option<Controller>,
        location: Vec3,
    ) -> WorldResult<()> {
        let template = self
            .templates
            .get(template)
            .cloned()
            .ok_or_else(|| WorldError::UnknownTemplate(template.to_owned()))?;
        let role = self.role_for(controller);
        let mut entity = Entity::new(id, template, role, controller, location, self.config.clone());

        entity
            .attribute_listeners
            .subscribe(Attribute::Health, Listener::LifeCycle);
        entity
            .tag_listeners
            .subscribe(GameplayTag::KnockedDown, Listener::LifeCycle);
        if entity.is_locally_controlled() {
            for attribute in HUD_ATTRIBUTES {
                entity.attribute_listeners.subscribe(attribute, Listener::Hud);
            }
        }
        if !entity.has_authority() {
            // Replicated copies start with the same character abilities so
            // predicted activations can run locally.
            let abilities = entity.template.abilities.clone();
            for def in abilities {
                entity.grant_ability(def, crate::abilities::AbilitySource::Character);
            }
            entity.character_abilities_given = true;
        }
        let weapon_tag = entity.current_weapon_tag;
        entity.add_loose_tag(weapon_tag);
        self.entities.insert(id, entity);
        self.process_events(id);
        Ok(())
    }

    fn role_for(&self, controller: Option<Controller>) -> NetRole {
        match self.mode {
            NetMode::Server => NetRole::Authority,
            NetMode::Client { local } if controller.is_some_and(|c| c.id == local) => {
                NetRole::AutonomousProxy
            }
            NetMode::Client { .. } => NetRole::SimulatedProxy,
        }
    }

    /// Server: spawns a weapon pickup in the world.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownWeaponKind`] if the catalog has no definition.
    pub fn spawn_weapon(&mut self, kind: WeaponKind, location: Vec3) -> WorldResult<WeaponId> {
        if !self.is_server() {
            return Err(WorldError::NotAuthority {
                operation: "spawn_weapon",
            });
        }
        self.next_weapon += 1;
        let id = WeaponId(self.next_weapon);
        self.insert_weapon(id, kind, location)?;
        Ok(id)
    }

    pub(crate) fn insert_weapon(&mut self, id: WeaponId, kind: WeaponKind, location: Vec3) -> WorldResult<()> {
        let def = self
            .catalog
            .get(kind)
            .ok_or(WorldError::UnknownWeaponKind(kind))?;
        self.weapons.insert(id, Weapon::new(id, def, location));
        Ok(())
    }

    pub(crate) fn destroy_weapon(&mut self, weapon: WeaponId) {
        if self.weapons.remove(&weapon).is_some() {
            debug!(target: "arena::inventory", %weapon, "destroyed weapon");
        }
    }

    // ========================================================================
    // Output queues
    // ========================================================================

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn drain_outbox(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Queues a HUD update if `entity` is the local player's.
    pub(crate) fn hud(&mut self, entity: EntityId, update: HudUpdate) {
        if self
            .entities
            .get(&entity)
            .is_some_and(Entity::is_locally_controlled)
        {
            self.notify(Notification::Hud { entity, update });
        }
    }

    /// Server: queues `rpc` for the player controlling `entity`.
    pub(crate) fn send_to_owner(&mut self, entity: EntityId, rpc: ClientRpc) {
        let Some(controller) = self.entities.get(&entity).and_then(|e| e.controller) else {
            return;
        };
        if self.is_server() && controller.is_player() {
            self.outbox.to_clients.push((controller.id, rpc));
        }
    }

    pub(crate) fn send_to_server(&mut self, rpc: ServerRpc) {
        if !self.is_server() {
            self.outbox.to_server.push(rpc);
        }
    }

    // ========================================================================
    // Access helpers
    // ========================================================================

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> WorldResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))
    }

    pub(crate) fn entity_ref(&self, id: EntityId) -> WorldResult<&Entity> {
        self.entities.get(&id).ok_or(WorldError::UnknownEntity(id))
    }

    pub(crate) fn require_authority(&self, id: EntityId, operation: &'static str) -> WorldResult<()> {
        if self.entity_ref(id)?.has_authority() {
            Ok(())
        } else {
            Err(WorldError::NotAuthority { operation })
        }
    }

    /// Adds a local tag and settles its listeners.
    pub fn add_loose_tag(&mut self, id: EntityId, tag: GameplayTag) -> WorldResult<()> {
        self.entity_mut(id)?.add_loose_tag(tag);
        self.process_events(id);
        Ok(())
    }

    /// # Errors
    ///
    /// [`WorldError::Tag`] with an underflow if the tag is not present.
    pub fn remove_loose_tag(&mut self, id: EntityId, tag: GameplayTag) -> WorldResult<()> {
        self.entity_mut(id)?.remove_loose_tag(tag)?;
        self.process_events(id);
        Ok(())
    }
}
