//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration and workers.

pub mod errors;
pub mod handle;
pub mod input;

pub use errors::{Result, RuntimeError};
pub use handle::SessionHandle;
pub use input::PlayerInput;
