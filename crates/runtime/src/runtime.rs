//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up command/event channels, and
//! exposes a builder-based API for clients to drive a match.

use std::env;
use std::str::FromStr;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use arena_content::Content;
use arena_core::Tick;

use crate::api::{Result, RuntimeError, SessionHandle};
use crate::events::{Event, EventBus, Topic};
use crate::session::Session;
use crate::workers::{Command, SessionWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Simulation steps per second.
    pub tick_rate: u32,
    /// One-way delay of every packet.
    pub latency_ticks: u64,
    /// Seconds between a death and the respawn.
    pub respawn_delay: f32,
    /// Ticks between snapshots sent to each client.
    pub snapshot_interval_ticks: u64,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_TICK_RATE: u32 = 30;
    pub const DEFAULT_LATENCY_TICKS: u64 = 2;
    pub const DEFAULT_RESPAWN_DELAY: f32 = 5.0;
    pub const DEFAULT_SNAPSHOT_INTERVAL_TICKS: u64 = 1;
    pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;
    pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 32;

    /// Defaults overridden by `ARENA_TICK_RATE`, `ARENA_LATENCY_TICKS`,
    /// `ARENA_RESPAWN_DELAY`, `ARENA_SNAPSHOT_INTERVAL`,
    /// `ARENA_EVENT_BUFFER` and `ARENA_COMMAND_BUFFER`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidEnv`] if a variable is set but does not parse,
    /// [`RuntimeError::InvalidConfig`] if the result fails validation.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            tick_rate: env_or("ARENA_TICK_RATE", Self::DEFAULT_TICK_RATE)?,
            latency_ticks: env_or("ARENA_LATENCY_TICKS", Self::DEFAULT_LATENCY_TICKS)?,
            respawn_delay: env_or("ARENA_RESPAWN_DELAY", Self::DEFAULT_RESPAWN_DELAY)?,
            snapshot_interval_ticks: env_or(
                "ARENA_SNAPSHOT_INTERVAL",
                Self::DEFAULT_SNAPSHOT_INTERVAL_TICKS,
            )?,
            event_buffer_size: env_or("ARENA_EVENT_BUFFER", Self::DEFAULT_EVENT_BUFFER_SIZE)?,
            command_buffer_size: env_or("ARENA_COMMAND_BUFFER", Self::DEFAULT_COMMAND_BUFFER_SIZE)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`RuntimeError::InvalidConfig`] naming the first unusable field.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(RuntimeError::InvalidConfig("tick_rate must be positive".into()));
        }
        if self.snapshot_interval_ticks == 0 {
            return Err(RuntimeError::InvalidConfig(
                "snapshot_interval_ticks must be positive".into(),
            ));
        }
        if !self.respawn_delay.is_finite() || self.respawn_delay < 0.0 {
            return Err(RuntimeError::InvalidConfig(format!(
                "respawn_delay must be a non-negative number of seconds, got {}",
                self.respawn_delay
            )));
        }
        if self.command_buffer_size == 0 {
            return Err(RuntimeError::InvalidConfig("command_buffer_size must be positive".into()));
        }
        Ok(())
    }

    /// Seconds simulated by one step.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    pub fn respawn_delay_ticks(&self) -> u64 {
        (self.respawn_delay * self.tick_rate as f32).ceil() as u64
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: Self::DEFAULT_TICK_RATE,
            latency_ticks: Self::DEFAULT_LATENCY_TICKS,
            respawn_delay: Self::DEFAULT_RESPAWN_DELAY,
            snapshot_interval_ticks: Self::DEFAULT_SNAPSHOT_INTERVAL_TICKS,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER_SIZE,
            command_buffer_size: Self::DEFAULT_COMMAND_BUFFER_SIZE,
        }
    }
}

fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| RuntimeError::InvalidEnv { var, value }),
        Err(_) => Ok(default),
    }
}

/// Main runtime that runs a match on a background worker
///
/// Design: Runtime owns the worker task.
/// [`SessionHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: SessionHandle,
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Subscribe to one topic of runtime events
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Stop the worker and wait for it to finish
    pub async fn shutdown(self) -> Result<Tick> {
        let tick = self.handle.shutdown().await?;
        drop(self.handle);

        self.worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(tick)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    content: Option<Content>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            content: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set required content shared by the server and every client
    pub fn content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    /// Build the runtime and spawn its worker
    pub async fn build(self) -> Result<Runtime> {
        let content = self.content.ok_or(RuntimeError::MissingContent)?;

        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);

        let session = Session::builder(content)
            .config(self.config)
            .event_bus(event_bus.clone())
            .build()?;

        let handle = SessionHandle::new(command_tx, event_bus);
        let worker = SessionWorker::new(session, command_rx);
        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Runtime {
            handle,
            worker_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respawn_delay_rounds_up_to_whole_ticks() {
        let config = RuntimeConfig {
            tick_rate: 30,
            respawn_delay: 5.0,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.respawn_delay_ticks(), 150);

        let config = RuntimeConfig {
            tick_rate: 20,
            respawn_delay: 0.01,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.respawn_delay_ticks(), 1);
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let config = RuntimeConfig {
            tick_rate: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RuntimeError::InvalidConfig(_))));
    }

    #[test]
    fn default_config_is_valid() {
        RuntimeConfig::default().validate().unwrap();
        assert_eq!(RuntimeConfig::default().respawn_delay, 5.0);
    }
}
