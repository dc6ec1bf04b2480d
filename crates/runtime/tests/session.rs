use arena_content::ContentFactory;
use arena_core::{Attribute, ControllerId, EntityId, LifeState, Tick};
use arena_runtime::{
    Event, MatchEvent, NetworkEvent, PlayerInput, RuntimeConfig, RuntimeError, Session, Topic,
};
use glam::Vec3;
use tokio::sync::broadcast;

const ALICE: ControllerId = ControllerId(1);
const BOB: ControllerId = ControllerId(2);

fn session() -> Session {
    let content = ContentFactory::bundled()
        .load_all()
        .expect("bundled content should load");
    Session::builder(content)
        .config(RuntimeConfig::default())
        .build()
        .expect("default config is valid")
}

/// Session with both players joined and their heroes replicated.
fn duel() -> (Session, EntityId, EntityId) {
    let mut session = session();
    let alice = session.join(ALICE, Vec3::ZERO).unwrap();
    let bob = session.join(BOB, Vec3::new(500.0, 0.0, 0.0)).unwrap();
    session.run_ticks(10).unwrap();
    (session, alice, bob)
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn life_state(session: &Session, entity: EntityId) -> LifeState {
    session.inspect(entity).unwrap().life_state
}

// ============================================================================
// Connection
// ============================================================================

#[test]
fn joined_player_receives_its_hero_and_weapon() {
    let mut session = session();
    let alice = session.join(ALICE, Vec3::ZERO).unwrap();
    assert!(session.client(ALICE).unwrap().entity(alice).is_none());

    session.run_ticks(10).unwrap();

    let server_view = session.inspect(alice).unwrap();
    assert_eq!(server_view.inventory.len(), 2);
    assert!(server_view.current_weapon.is_some());

    let client_hero = session.client(ALICE).unwrap().entity(alice).unwrap();
    assert_eq!(client_hero.inventory.as_slice(), server_view.inventory.as_slice());
    // The owner learns its current weapon through the explicit resync.
    assert_eq!(client_hero.current_weapon, server_view.current_weapon);
}

#[test]
fn joining_twice_is_rejected() {
    let mut session = session();
    session.join(ALICE, Vec3::ZERO).unwrap();
    let err = session.join(ALICE, Vec3::ZERO).unwrap_err();
    assert!(matches!(err, RuntimeError::AlreadyConnected(ALICE)));
}

#[test]
fn input_from_unknown_players_is_rejected() {
    let mut session = session();
    let err = session.input(BOB, PlayerInput::NextWeapon).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownController(BOB)));
}

#[test]
fn packets_respect_the_configured_latency() {
    let content = ContentFactory::bundled().load_all().unwrap();
    let config = RuntimeConfig {
        latency_ticks: 5,
        ..RuntimeConfig::default()
    };
    let mut session = Session::builder(content).config(config).build().unwrap();
    let alice = session.join(ALICE, Vec3::ZERO).unwrap();

    session.run_ticks(5).unwrap();
    assert!(session.client(ALICE).unwrap().entity(alice).is_none());
    session.step().unwrap();
    assert!(session.client(ALICE).unwrap().entity(alice).is_some());
}

// ============================================================================
// Combat and life cycle
// ============================================================================

#[test]
fn knocked_down_hero_is_revived_by_a_teammate() {
    let (mut session, alice, bob) = duel();
    let mut events = session.event_bus().subscribe(Topic::Match);

    session.damage(Some(bob), alice, 150.0, false).unwrap();
    assert_eq!(life_state(&session, alice), LifeState::KnockedDown);

    session
        .input(BOB, PlayerInput::Interact { target: alice })
        .unwrap();
    assert!(!session.server().is_available_for_interaction(alice));

    // Revive takes 4 s at 30 Hz.
    session.run_ticks(119).unwrap();
    assert_eq!(life_state(&session, alice), LifeState::KnockedDown);
    session.run_ticks(2).unwrap();
    assert_eq!(life_state(&session, alice), LifeState::Alive);

    let events = drain(&mut events);
    assert!(events.contains(&Event::Match(MatchEvent::InteractionStarted {
        interactor: bob,
        target: alice,
    })));
    assert!(events.contains(&Event::Match(MatchEvent::InteractionCompleted {
        interactor: bob,
        target: alice,
    })));

    session.run_ticks(5).unwrap();
    let replicated = session.client(BOB).unwrap().entity(alice).unwrap();
    assert_eq!(replicated.life_state(), LifeState::Alive);
}

#[test]
fn released_interaction_leaves_the_hero_down() {
    let (mut session, alice, bob) = duel();
    let mut events = session.event_bus().subscribe(Topic::Match);
    session.damage(Some(bob), alice, 150.0, false).unwrap();

    session
        .input(BOB, PlayerInput::Interact { target: alice })
        .unwrap();
    session.run_ticks(30).unwrap();
    session.input(BOB, PlayerInput::ReleaseInteract).unwrap();
    session.run_ticks(120).unwrap();

    assert_eq!(life_state(&session, alice), LifeState::KnockedDown);
    assert!(session.server().is_available_for_interaction(alice));
    assert!(drain(&mut events).contains(&Event::Match(MatchEvent::InteractionCancelled {
        interactor: bob,
        target: alice,
    })));
}

#[test]
fn dead_hero_respawns_after_the_delay() {
    let (mut session, alice, bob) = duel();
    let mut events = session.event_bus().subscribe(Topic::Match);

    session.damage(Some(bob), alice, 150.0, false).unwrap();
    session.damage(Some(bob), alice, 100.0, false).unwrap();
    assert_eq!(life_state(&session, alice), LifeState::Dead);
    assert!(session.inspect(alice).unwrap().inventory.is_empty());

    let died_at = session.step().unwrap();
    let respawn_at = drain(&mut events)
        .into_iter()
        .find_map(|event| match event {
            Event::Match(MatchEvent::EntityDied {
                entity, respawn_at, ..
            }) if entity == alice => respawn_at,
            _ => None,
        })
        .expect("death is reported with a respawn tick");
    assert_eq!(respawn_at, Tick(died_at.0 + 150));

    session.run_ticks(149).unwrap();
    assert_eq!(life_state(&session, alice), LifeState::Dead);
    session.step().unwrap();

    let view = session.inspect(alice).unwrap();
    assert_eq!(view.life_state, LifeState::Alive);
    assert_eq!(view.health, view.max_health);
    assert_eq!(view.inventory.len(), 2);
    assert_eq!(view.location, Vec3::ZERO);
    assert!(drain(&mut events).contains(&Event::Match(MatchEvent::Respawned { entity: alice })));

    let bounty = session.server().entity(bob).unwrap().attributes.get(Attribute::Xp);
    assert_eq!(bounty, 100.0);
}

#[test]
fn killed_minions_stay_dead() {
    let (mut session, alice, _) = duel();
    let mut events = session.event_bus().subscribe(Topic::Match);
    let minion = session.spawn_minion(Vec3::new(0.0, 300.0, 0.0)).unwrap();

    let outcome = session.damage(Some(alice), minion, 60.0, true).unwrap().unwrap();
    assert_eq!(outcome.health_after, 0.0);
    session.run_ticks(200).unwrap();

    assert_eq!(life_state(&session, minion), LifeState::Dead);
    assert!(session.game_mode().pending().is_empty());
    assert!(drain(&mut events).contains(&Event::Match(MatchEvent::EntityDied {
        entity: minion,
        controller: None,
        respawn_at: None,
    })));
    let gold = session.server().entity(alice).unwrap().attributes.get(Attribute::Gold);
    assert_eq!(gold, 10.0);
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn weapon_cycling_is_confirmed_by_the_server() {
    let (mut session, alice, _) = duel();
    let before = session.inspect(alice).unwrap().current_weapon;

    session.input(ALICE, PlayerInput::NextWeapon).unwrap();
    let predicted = session.client(ALICE).unwrap().entity(alice).unwrap().current_weapon;
    assert_ne!(predicted, before);

    session.run_ticks(45).unwrap();
    assert_eq!(session.inspect(alice).unwrap().current_weapon, predicted);
    assert_eq!(
        session.client(ALICE).unwrap().entity(alice).unwrap().current_weapon,
        predicted
    );
}

#[test]
fn predicted_movement_agrees_with_the_server() {
    let (mut session, alice, _) = duel();
    let mut network = session.event_bus().subscribe(Topic::Network);

    session
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::X,
        })
        .unwrap();
    session.run_ticks(30).unwrap();
    session
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::ZERO,
        })
        .unwrap();
    session.run_ticks(10).unwrap();

    let server_location = session.inspect(alice).unwrap().location;
    let client_location = session.client(ALICE).unwrap().entity(alice).unwrap().location;
    assert!(server_location.x > 500.0, "hero should have moved, got {server_location}");
    assert!(server_location.distance(client_location) < 1.0);
    assert!(
        !drain(&mut network)
            .iter()
            .any(|e| matches!(e, Event::Network(NetworkEvent::RpcRejected { .. })))
    );
}

#[test]
fn observers_see_movement_through_snapshots() {
    let (mut session, alice, _) = duel();
    session
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::Y,
        })
        .unwrap();
    session.run_ticks(20).unwrap();
    session
        .input(ALICE, PlayerInput::Move {
            acceleration: Vec3::ZERO,
        })
        .unwrap();
    session.run_ticks(10).unwrap();

    let server_location = session.inspect(alice).unwrap().location;
    let observed = session.client(BOB).unwrap().entity(alice).unwrap().location;
    assert_eq!(observed, server_location);
}
