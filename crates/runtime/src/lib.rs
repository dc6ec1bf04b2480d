//! Runtime orchestration for arena matches.
//!
//! This crate wires the gameplay core into a running match: one
//! authoritative server world, one predicted world per player, a loopback
//! transport between them and the collaborators the core reports to.
//! Consumers embed [`Runtime`] to drive the match from async code through
//! [`SessionHandle`], or use [`Session`] directly for synchronous stepping.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`session`] owns the worlds, game mode and interaction timing
//! - [`transport`] simulates the network with bincode-encoded packets
//! - [`events`] provides topic-based event bus for flexible event routing
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod runtime;
pub mod session;
pub mod transport;

mod workers;

pub use api::{PlayerInput, Result, RuntimeError, SessionHandle};
pub use events::{Event, EventBus, MatchEvent, NetworkEvent, Peer, PresentationEvent, TickEvent, Topic};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use session::{
    ArenaGameMode, EntityView, InteractionDriver, InteractionOutcome, PendingRespawn, Session,
    SessionBuilder, HERO_TEMPLATE, MINION_TEMPLATE,
};
pub use transport::{LoopbackTransport, TransportError};
