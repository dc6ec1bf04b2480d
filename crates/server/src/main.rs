//! Headless arena server.
//!
//! Loads content, starts a runtime and plays a scripted two-player match in
//! real time while logging the event stream.
//!
//! # Environment
//!
//! - `ARENA_DATA_DIR`: content directory (defaults to the bundled data)
//! - `ARENA_*`: runtime settings, see `RuntimeConfig::from_env`
//! - `RUST_LOG`: log filter (defaults to `info`)
//!
//! ```bash
//! RUST_LOG=arena=debug,runtime=debug cargo run -p arena-server
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec3;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;

use arena_content::ContentFactory;
use arena_core::{ControllerId, WeaponKind};
use arena_runtime::{Event, PlayerInput, Runtime, RuntimeConfig, SessionHandle, Topic};

const ALICE: ControllerId = ControllerId(1);
const BOB: ControllerId = ControllerId(2);
const ROCKET_LAUNCHER: WeaponKind = WeaponKind(3);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let factory = match env::var("ARENA_DATA_DIR") {
        Ok(dir) => ContentFactory::new(dir),
        Err(_) => ContentFactory::bundled(),
    };
    let content = factory
        .load_all()
        .with_context(|| format!("loading content from {}", factory.data_dir().display()))?;
    let config = RuntimeConfig::from_env().context("reading runtime configuration")?;
    tracing::info!(
        tick_rate = config.tick_rate,
        latency_ticks = config.latency_ticks,
        respawn_delay = config.respawn_delay,
        "Starting arena server"
    );

    let runtime = Runtime::builder()
        .config(config.clone())
        .content(content)
        .build()
        .await
        .context("starting runtime")?;
    let handle = runtime.handle();
    let logger = tokio::spawn(log_events(handle.clone()));

    let mut clock = MatchClock::new(&config);
    play_match(&handle, &mut clock).await?;

    let last_tick = runtime.shutdown().await.context("stopping runtime")?;
    logger.abort();
    tracing::info!(%last_tick, "Match finished");
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Steps the session at the configured tick rate.
struct MatchClock {
    tick_rate: u32,
    respawn_delay: f32,
    interval: tokio::time::Interval,
}

impl MatchClock {
    fn new(config: &RuntimeConfig) -> Self {
        let mut interval = interval(Duration::from_secs_f32(config.tick_seconds()));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            tick_rate: config.tick_rate,
            respawn_delay: config.respawn_delay,
            interval,
        }
    }

    async fn run_for(&mut self, handle: &SessionHandle, seconds: f32) -> Result<()> {
        let ticks = (seconds * self.tick_rate as f32).ceil() as u64;
        for _ in 0..ticks {
            self.interval.tick().await;
            handle.step(1).await?;
        }
        Ok(())
    }
}

async fn play_match(handle: &SessionHandle, clock: &mut MatchClock) -> Result<()> {
    let alice = handle.join(ALICE, Vec3::ZERO).await?;
    let bob = handle.join(BOB, Vec3::new(800.0, 0.0, 0.0)).await?;
    handle.spawn_minion(Vec3::new(400.0, 400.0, 0.0)).await?;
    let launcher = handle
        .spawn_weapon(ROCKET_LAUNCHER, Vec3::new(800.0, 100.0, 0.0))
        .await?;
    clock.run_for(handle, 0.5).await?;

    tracing::info!("Alice sprints toward the minion");
    handle.input(ALICE, PlayerInput::Sprint(true)).await?;
    handle
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::new(1.0, 1.0, 0.0),
        })
        .await?;
    clock.run_for(handle, 1.0).await?;
    handle
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::ZERO,
        })
        .await?;
    handle.input(ALICE, PlayerInput::Sprint(false)).await?;

    tracing::info!("Bob picks up the rocket launcher and cycles weapons");
    handle.pick_up(bob, launcher).await?;
    handle.input(BOB, PlayerInput::NextWeapon).await?;
    clock.run_for(handle, 1.5).await?;

    tracing::info!("Bob knocks Alice down");
    handle.damage(Some(bob), alice, 90.0, true).await?;
    handle.damage(Some(bob), alice, 90.0, false).await?;
    clock.run_for(handle, 1.0).await?;

    tracing::info!("Bob revives Alice");
    handle
        .input(BOB, PlayerInput::Interact { target: alice })
        .await?;
    clock.run_for(handle, 4.5).await?;

    tracing::info!("Alice hunts the minion");
    if let Some(minion) = handle
        .snapshot(ALICE)
        .await?
        .entities
        .iter()
        .find(|e| e.template == arena_runtime::MINION_TEMPLATE)
        .map(|e| e.id)
    {
        handle.damage(Some(alice), minion, 100.0, false).await?;
    }
    clock.run_for(handle, 0.5).await?;

    tracing::info!("Alice finishes Bob off");
    handle.damage(Some(alice), bob, 150.0, false).await?;
    handle.damage(Some(alice), bob, 150.0, false).await?;
    let wait = clock.respawn_delay + 1.0;
    clock.run_for(handle, wait).await?;

    if let Some(view) = handle.inspect(bob).await? {
        tracing::info!(
            life_state = ?view.life_state,
            health = view.health,
            weapons = view.inventory.len(),
            "Bob after respawn"
        );
    }
    Ok(())
}

async fn log_events(handle: SessionHandle) {
    let mut matches = handle.subscribe(Topic::Match);
    let mut network = handle.subscribe(Topic::Network);
    loop {
        let received = tokio::select! {
            event = matches.recv() => event,
            event = network.recv() => event,
        };
        match received {
            Ok(Event::Match(event)) => tracing::info!(target: "arena_server::events", ?event, "match"),
            Ok(Event::Network(event)) => tracing::warn!(target: "arena_server::events", ?event, "network"),
            Ok(other) => tracing::debug!(target: "arena_server::events", ?other, "event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "arena_server::events", skipped, "event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
