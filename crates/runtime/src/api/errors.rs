//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the transport and the gameplay
//! core so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use arena_core::{ControllerId, ErrorSeverity, GameError, WorldError};

pub use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires content to be configured before building")]
    MissingContent,

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),

    #[error("environment variable {var} has invalid value `{value}`")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{0} is already connected")]
    AlreadyConnected(ControllerId),

    #[error("{0} is not connected")]
    UnknownController(ControllerId),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    World(#[from] WorldError),
}

impl GameError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
            Self::MissingContent | Self::InvalidConfig(_) | Self::InvalidEnv { .. } => {
                ErrorSeverity::Validation
            }
            Self::AlreadyConnected(_) | Self::UnknownController(_) => ErrorSeverity::Recoverable,
            Self::Transport(err) => err.severity(),
            Self::World(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::MissingContent => "RUNTIME_MISSING_CONTENT",
            Self::InvalidConfig(_) => "RUNTIME_INVALID_CONFIG",
            Self::InvalidEnv { .. } => "RUNTIME_INVALID_ENV",
            Self::AlreadyConnected(_) => "RUNTIME_ALREADY_CONNECTED",
            Self::UnknownController(_) => "RUNTIME_UNKNOWN_CONTROLLER",
            Self::Transport(err) => err.error_code(),
            Self::World(err) => err.error_code(),
        }
    }
}
