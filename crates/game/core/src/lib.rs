//! Gameplay core shared by the authoritative server and predicting clients.
//!
//! `arena-core` defines the rules of the arena: clamped attributes, effects
//! and damage resolution, the tag-driven life cycle, weapon ownership and the
//! reconciliation of predicted weapon changes and movement. Every mutation
//! flows through [`world::World`], which reports side effects as
//! [`notify::Notification`]s and RPCs instead of calling collaborators
//! directly, so the crate performs no I/O.
pub mod abilities;
pub mod attributes;
pub mod config;
pub mod effects;
pub mod entity;
pub mod error;
pub mod movement;
pub mod net;
pub mod notify;
pub mod observe;
pub mod replication;
pub mod tags;
pub mod types;
pub mod weapon;
pub mod world;

pub use abilities::{AbilityDef, AbilityError, AbilityHandle, AbilityKind, AbilitySource};
pub use attributes::{Attribute, AttributeChange, AttributeDefaults, AttributeStore};
pub use config::GameConfig;
pub use effects::{
    BountyGrant, DamageNumber, DamageNumberFlags, DamageOutcome, EffectContext, EffectDuration,
    EffectHandle, EffectSpec, ModOp, Modifier,
};
pub use entity::{
    Damageable, Entity, EntityKind, EntityTemplate, Interactable, LifeState, Movable,
};
pub use error::{ErrorSeverity, GameError};
pub use movement::{MovementIntent, SavedMove, ServerMove};
pub use net::{ClientRpc, Outbox, ServerRpc};
pub use notify::{GameMode, Hud, HudUpdate, Notification, Presentation};
pub use replication::{ReplicatedField, ReplicationPolicy, Viewer, WorldSnapshot};
pub use tags::{GameplayTag, TagCountChange, TagCounts, TagError};
pub use types::{Controller, ControllerId, ControllerKind, EntityId, NetRole, Tick, WeaponId};
pub use weapon::{AmmoSlot, Inventory, InventoryError, Weapon, WeaponCatalog, WeaponDef, WeaponKind};
pub use world::{NetMode, World, WorldError, WorldResult};
