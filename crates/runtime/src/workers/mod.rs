//! Worker tasks that back the runtime orchestration.
//!
//! The session worker owns the match and executes commands sent through
//! [`crate::api::SessionHandle`].

mod session;

pub use session::{Command, SessionWorker};
