use glam::Vec3;

use super::*;
use crate::attributes::AttributeDefaults;
use crate::effects::{DamageNumberFlags, EffectContext, EffectSpec, Modifier};
use crate::entity::{LifeState, default_hero_attributes};
use crate::weapon::test_support::{catalog, rifle, shotgun};
use crate::weapon::AmmoSlot;

const ALICE: ControllerId = ControllerId(1);
const BOB: ControllerId = ControllerId(2);

fn hero_template() -> EntityTemplate {
    EntityTemplate::hero("Hero", default_hero_attributes()).with_default_weapons([rifle().kind, shotgun().kind])
}

fn minion_template() -> EntityTemplate {
    let attributes = AttributeDefaults::new()
        .with(Attribute::MaxHealth, 20.0)
        .with(Attribute::Health, 20.0)
        .with(Attribute::MoveSpeed, 300.0)
        .with(Attribute::XpBounty, 10.0)
        .with(Attribute::GoldBounty, 5.0);
    EntityTemplate::minion("Minion", attributes)
}

fn register(world: &mut World) {
    world.register_template(hero_template());
    world.register_template(minion_template());
}

fn server_with(config: GameConfig) -> World {
    let mut world = World::server(config, catalog());
    register(&mut world);
    world
}

fn server() -> World {
    server_with(GameConfig::default())
}

fn spawn_hero(world: &mut World, controller: ControllerId, location: Vec3) -> EntityId {
    world
        .spawn_entity("Hero", Some(Controller::player(controller)), location)
        .unwrap()
}

fn set_attribute(world: &mut World, id: EntityId, attribute: Attribute, value: f32) {
    world
        .entities
        .get_mut(&id)
        .unwrap()
        .attributes
        .reset_to(attribute, value);
    world.process_events(id);
}

fn attribute(world: &World, id: EntityId, attribute: Attribute) -> f32 {
    world.entity(id).unwrap().attributes.get(attribute)
}

fn life_state(world: &World, id: EntityId) -> LifeState {
    world.entity(id).unwrap().life_state()
}

fn died_count(notifications: &[Notification]) -> usize {
    notifications
        .iter()
        .filter(|n| matches!(n, Notification::EntityDied { .. }))
        .count()
}

fn has_cue(notifications: &[Notification], tag: GameplayTag) -> bool {
    notifications
        .iter()
        .any(|n| matches!(n, Notification::PlayVisualCue { cue, .. } if *cue == tag))
}

/// Client world holding `controller`'s view of `server`.
fn connect(server: &World, controller: ControllerId) -> World {
    let mut client = World::client(controller, GameConfig::default(), catalog());
    register(&mut client);
    client
        .apply_snapshot(server.capture_snapshot(controller))
        .unwrap();
    client
}

/// Exchanges RPCs until both sides are quiet.
fn pump(server: &mut World, client: &mut World, controller: ControllerId) {
    for _ in 0..16 {
        let to_server = client.drain_outbox().to_server;
        let idle_client = to_server.is_empty();
        for rpc in to_server {
            server.handle_server_rpc(controller, rpc).ok();
        }
        let to_client: Vec<ClientRpc> = server
            .drain_outbox()
            .to_clients
            .into_iter()
            .filter(|(to, _)| *to == controller)
            .map(|(_, rpc)| rpc)
            .collect();
        if idle_client && to_client.is_empty() {
            return;
        }
        for rpc in to_client {
            client.handle_client_rpc(rpc).unwrap();
        }
    }
    panic!("rpc exchange did not settle");
}

// ============================================================================
// Attributes and damage
// ============================================================================

#[test]
fn attribute_writes_stay_within_bounds() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);

    let boost = EffectSpec::instant("Boost")
        .with_modifier(Modifier::add(Attribute::Mana, 500.0))
        .with_modifier(Modifier::add(Attribute::MoveSpeed, 5000.0));
    world.apply_effect(id, &boost, EffectContext::default()).unwrap();
    assert_eq!(attribute(&world, id, Attribute::Mana), 100.0);
    assert_eq!(attribute(&world, id, Attribute::MoveSpeed), 1000.0);

    let drain = EffectSpec::instant("Drain").with_modifier(Modifier::add(Attribute::Mana, -500.0));
    world.apply_effect(id, &drain, EffectContext::default()).unwrap();
    assert_eq!(attribute(&world, id, Attribute::Mana), 0.0);
}

#[test]
fn shield_absorbs_before_health() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    set_attribute(&mut world, id, Attribute::Shield, 30.0);
    set_attribute(&mut world, id, Attribute::Health, 50.0);

    let outcome = world.apply_damage(None, id, 50.0, false).unwrap().unwrap();
    assert_eq!(outcome.shield_after, 0.0);
    assert_eq!(outcome.health_after, 30.0);
    assert_eq!(attribute(&world, id, Attribute::Shield), 0.0);
    assert_eq!(attribute(&world, id, Attribute::Health), 30.0);
}

#[test]
fn zero_damage_is_ignored() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    assert_eq!(world.apply_damage(None, id, 0.0, false).unwrap(), None);
    assert_eq!(attribute(&world, id, Attribute::Shield), 50.0);
}

#[test]
fn bounty_is_granted_only_on_kill() {
    let mut world = server();
    let attacker = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let minion = world
        .spawn_entity("Minion", Some(Controller::ai(ControllerId(100))), Vec3::X * 300.0)
        .unwrap();

    world.apply_damage(Some(attacker), minion, 5.0, false).unwrap();
    assert_eq!(attribute(&world, attacker, Attribute::Xp), 0.0);
    assert_eq!(life_state(&world, minion), LifeState::Alive);

    world.drain_notifications();
    world.apply_damage(Some(attacker), minion, 50.0, false).unwrap();
    assert_eq!(life_state(&world, minion), LifeState::Dead);
    assert_eq!(attribute(&world, attacker, Attribute::Xp), 10.0);
    assert_eq!(attribute(&world, attacker, Attribute::Gold), 5.0);
    assert_eq!(died_count(&world.drain_notifications()), 1);
}

#[test]
fn self_kill_grants_no_bounty() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);

    world.apply_damage(Some(id), id, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, id), LifeState::KnockedDown);
    world.apply_damage(Some(id), id, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, id), LifeState::Dead);
    assert_eq!(attribute(&world, id, Attribute::Xp), 0.0);
    assert_eq!(attribute(&world, id, Attribute::Gold), 0.0);

    let damage_numbers = world
        .drain_outbox()
        .to_clients
        .into_iter()
        .filter(|(_, rpc)| matches!(rpc, ClientRpc::ShowDamageNumber(_)))
        .count();
    assert_eq!(damage_numbers, 0);
}

#[test]
fn damage_numbers_reach_the_attacker() {
    let mut world = server();
    let attacker = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let victim = spawn_hero(&mut world, BOB, Vec3::X * 500.0);
    world.drain_outbox();

    world.apply_damage(Some(attacker), victim, 12.0, true).unwrap();
    let outbox = world.drain_outbox();
    let (to, rpc) = &outbox.to_clients[0];
    assert_eq!(*to, ALICE);
    let ClientRpc::ShowDamageNumber(number) = rpc else {
        panic!("expected a damage number, got {rpc:?}");
    };
    assert_eq!(number.target, victim);
    assert_eq!(number.amount, 12.0);
    assert!(number.flags.contains(DamageNumberFlags::HEADSHOT));
}

// ============================================================================
// Life cycle
// ============================================================================

#[test]
fn knock_down_then_death_drops_weapons_and_pays_bounty() {
    let mut world = server();
    let attacker = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let origin = Vec3::new(100.0, 0.0, 0.0);
    let victim = spawn_hero(&mut world, BOB, origin);
    let held: Vec<WeaponId> = world.entity(victim).unwrap().inventory.iter().collect();
    set_attribute(&mut world, victim, Attribute::Shield, 0.0);
    set_attribute(&mut world, victim, Attribute::Health, 10.0);
    world.drain_notifications();

    world.apply_damage(Some(attacker), victim, 10.0, false).unwrap();
    assert_eq!(life_state(&world, victim), LifeState::KnockedDown);
    assert_eq!(attribute(&world, victim, Attribute::Health), 100.0);
    assert_eq!(attribute(&world, victim, Attribute::Shield), 0.0);
    assert_eq!(attribute(&world, attacker, Attribute::Xp), 0.0);
    let notifications = world.drain_notifications();
    assert!(has_cue(&notifications, GameplayTag::CueHeroKnockedDown));
    assert_eq!(died_count(&notifications), 0);

    world.apply_damage(Some(attacker), victim, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, victim), LifeState::Dead);
    assert!(world.entity(victim).unwrap().inventory.is_empty());
    assert_eq!(attribute(&world, attacker, Attribute::Xp), 100.0);
    assert_eq!(attribute(&world, attacker, Attribute::Gold), 50.0);

    let notifications = world.drain_notifications();
    assert_eq!(died_count(&notifications), 1);
    assert!(!has_cue(&notifications, GameplayTag::CueHeroRevived));

    let radius = world.config().drop_radius;
    let expected = [origin + Vec3::X * radius, origin - Vec3::X * radius];
    for (weapon, expected) in held.iter().zip(expected) {
        let weapon = world.weapon(*weapon).unwrap();
        assert_eq!(weapon.owner, None);
        assert!(weapon.pickup_enabled);
        assert!(weapon.location.distance(expected) < 1e-3, "{:?}", weapon.location);
    }
}

#[test]
fn partial_knock_down_pool_dies_to_the_next_hit() {
    let mut world = server_with(GameConfig::default().with_knock_down_health_fraction(0.1));
    let attacker = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let victim = spawn_hero(&mut world, BOB, Vec3::X * 100.0);
    set_attribute(&mut world, victim, Attribute::Shield, 0.0);
    set_attribute(&mut world, victim, Attribute::Health, 10.0);

    world.apply_damage(Some(attacker), victim, 10.0, false).unwrap();
    assert_eq!(life_state(&world, victim), LifeState::KnockedDown);
    assert_eq!(attribute(&world, victim, Attribute::Health), 10.0);

    world.apply_damage(Some(attacker), victim, 10.0, false).unwrap();
    assert_eq!(life_state(&world, victim), LifeState::Dead);
    assert_eq!(attribute(&world, attacker, Attribute::Xp), 100.0);
    assert_eq!(died_count(&world.drain_notifications()), 1);
}

#[test]
fn knocked_down_heroes_bleed_out() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    world.apply_damage(None, id, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, id), LifeState::KnockedDown);

    for _ in 0..30 {
        world.advance();
    }
    assert_eq!(attribute(&world, id, Attribute::Health), 95.0);
}

#[test]
fn revive_restores_the_hero() {
    let mut world = server();
    let reviver = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let downed = spawn_hero(&mut world, BOB, Vec3::X * 100.0);
    assert!(!world.is_available_for_interaction(downed));
    assert_eq!(world.interaction_duration(downed), 0.0);

    world.apply_damage(Some(reviver), downed, 1000.0, false).unwrap();
    assert!(world.is_available_for_interaction(downed));
    assert_eq!(world.interaction_duration(downed), 4.0);

    world.pre_interact(downed, reviver).unwrap();
    assert!(world.entity(downed).unwrap().has_tag(GameplayTag::Interacting));
    assert!(!world.is_available_for_interaction(downed));
    assert_eq!(world.max_speed(downed).unwrap(), 0.0);

    world.drain_notifications();
    world.post_interact(downed, reviver).unwrap();
    assert_eq!(life_state(&world, downed), LifeState::Alive);
    assert!(!world.entity(downed).unwrap().has_tag(GameplayTag::Interacting));
    assert!(has_cue(&world.drain_notifications(), GameplayTag::CueHeroRevived));
}

#[test]
fn cancelled_revive_frees_the_target() {
    let mut world = server();
    let reviver = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let downed = spawn_hero(&mut world, BOB, Vec3::X * 100.0);
    world.apply_damage(Some(reviver), downed, 1000.0, false).unwrap();

    world.pre_interact(downed, reviver).unwrap();
    world.cancel_interaction(downed, reviver).unwrap();
    assert_eq!(life_state(&world, downed), LifeState::KnockedDown);
    assert!(world.is_available_for_interaction(downed));
    assert_eq!(world.max_speed(reviver).unwrap(), 600.0);
    assert_eq!(world.max_speed(downed).unwrap(), 240.0);
}

#[test]
fn reviver_is_rooted_while_reviving() {
    let mut world = server();
    let reviver = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let downed = spawn_hero(&mut world, BOB, Vec3::X * 100.0);
    world.apply_damage(Some(reviver), downed, 1000.0, false).unwrap();
    assert_eq!(world.max_speed(reviver).unwrap(), 600.0);

    world.pre_interact(downed, reviver).unwrap();
    assert!(world.entity(reviver).unwrap().has_tag(GameplayTag::Interacting));
    assert_eq!(world.max_speed(reviver).unwrap(), 0.0);

    world.post_interact(downed, reviver).unwrap();
    for id in [reviver, downed] {
        let entity = world.entity(id).unwrap();
        assert!(!entity.has_tag(GameplayTag::Interacting));
        assert!(!entity.has_tag(GameplayTag::InteractingRemoval));
        assert_eq!(world.max_speed(id).unwrap(), 600.0);
    }
}

#[test]
fn knocked_down_reviver_loses_its_lock() {
    let mut world = server();
    let reviver = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let downed = spawn_hero(&mut world, BOB, Vec3::X * 100.0);
    world.apply_damage(None, downed, 1000.0, false).unwrap();
    world.pre_interact(downed, reviver).unwrap();

    world.apply_damage(None, reviver, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, reviver), LifeState::KnockedDown);
    assert!(!world.entity(reviver).unwrap().has_tag(GameplayTag::Interacting));
    world.cancel_interaction(downed, reviver).unwrap();
    assert!(world.is_available_for_interaction(downed));
}

#[test]
fn interaction_lock_replicates_to_clients() {
    let mut server = server();
    let reviver = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let downed = spawn_hero(&mut server, BOB, Vec3::X * 100.0);
    server.apply_damage(Some(reviver), downed, 1000.0, false).unwrap();
    server.pre_interact(downed, reviver).unwrap();

    let downed_client = connect(&server, BOB);
    assert!(downed_client.entity(downed).unwrap().has_tag(GameplayTag::Interacting));
    assert_eq!(downed_client.max_speed(downed).unwrap(), server.max_speed(downed).unwrap());
    assert!(!downed_client.is_available_for_interaction(downed));

    let reviver_client = connect(&server, ALICE);
    assert_eq!(reviver_client.max_speed(reviver).unwrap(), 0.0);
    assert!(!reviver_client.is_available_for_interaction(downed));
}

#[test]
fn perspective_is_locked_while_knocked_down() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    assert!(world.entity(id).unwrap().perspective.first_person);
    assert!(!world.toggle_perspective(id).unwrap());

    world.apply_damage(None, id, 1000.0, false).unwrap();
    assert!(!world.toggle_perspective(id).unwrap());
    assert!(!world.entity(id).unwrap().perspective.first_person);
}

#[test]
fn respawn_refills_and_rearms() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    set_attribute(&mut world, id, Attribute::Xp, 7.0);
    world.apply_damage(None, id, 1000.0, false).unwrap();
    world.apply_damage(None, id, 1000.0, false).unwrap();
    assert_eq!(life_state(&world, id), LifeState::Dead);
    assert!(world.entity(id).unwrap().find_ability(AbilityKind::NextWeapon).is_none());

    let spawn_point = Vec3::new(0.0, 400.0, 0.0);
    world.respawn(id, spawn_point).unwrap();
    let entity = world.entity(id).unwrap();
    assert_eq!(entity.life_state(), LifeState::Alive);
    assert_eq!(entity.location, spawn_point);
    assert_eq!(entity.attributes.get(Attribute::Health), 100.0);
    assert_eq!(entity.attributes.get(Attribute::Shield), 50.0);
    assert_eq!(entity.attributes.get(Attribute::Xp), 7.0);
    assert_eq!(entity.inventory.len(), 2);
    assert!(entity.current_weapon.is_some());
    assert!(entity.find_ability(AbilityKind::NextWeapon).is_some());
}

// ============================================================================
// Inventory
// ============================================================================

#[test]
fn duplicate_weapon_is_refunded_as_reserve_ammo() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let duplicate = world.spawn_weapon(rifle().kind, Vec3::ZERO).unwrap();
    world.set_clip_ammo(duplicate, AmmoSlot::Primary, 10).unwrap();
    let reserve = attribute(&world, id, Attribute::RifleReserveAmmo);

    let err = world.add_to_inventory(id, duplicate, false).unwrap_err();
    let WorldError::Inventory(InventoryError::DuplicateKind { refunded, .. }) = err else {
        panic!("expected a duplicate, got {err:?}");
    };
    assert_eq!(refunded, vec![(Attribute::RifleReserveAmmo, 10.0)]);
    assert_eq!(attribute(&world, id, Attribute::RifleReserveAmmo), reserve + 10.0);
    assert!(world.weapon(duplicate).is_none());
    assert_eq!(world.entity(id).unwrap().inventory.len(), 2);
}

#[test]
fn clients_cannot_change_inventories() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    let stray = WeaponId(99);
    client
        .insert_weapon(stray, rifle().kind, Vec3::ZERO)
        .unwrap();
    let before = client.entity(id).unwrap().inventory.clone();

    let err = client.add_to_inventory(id, stray, true).unwrap_err();
    assert_eq!(err, WorldError::Inventory(InventoryError::NotAuthority));
    assert_eq!(client.entity(id).unwrap().inventory, before);
    assert_eq!(client.weapon(stray).unwrap().owner, None);
}

#[test]
fn knocked_down_heroes_cannot_pick_up() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    world.apply_damage(None, id, 1000.0, false).unwrap();
    let weapon = world
        .spawn_weapon(crate::weapon::test_support::rocket_launcher().kind, Vec3::ZERO)
        .unwrap();

    let err = world.pick_up(id, weapon).unwrap_err();
    assert!(matches!(
        err,
        WorldError::Inventory(InventoryError::PickupRestricted { ref tags }) if tags == &[GameplayTag::KnockedDown]
    ));
    assert_eq!(world.weapon(weapon).unwrap().owner, None);
}

#[test]
fn pickup_equips_into_empty_hands() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let current = world.entity(id).unwrap().current_weapon.unwrap();
    world.remove_from_inventory(id, current).unwrap();
    let other = world.entity(id).unwrap().inventory.get(0).unwrap();
    world.remove_from_inventory(id, other).unwrap();
    assert!(world.entity(id).unwrap().has_tag(GameplayTag::WeaponEquippedNone));

    world.pick_up(id, current).unwrap();
    let entity = world.entity(id).unwrap();
    assert_eq!(entity.current_weapon, Some(current));
    assert!(entity.has_tag(GameplayTag::WeaponEquippedRifle));
    assert!(!entity.has_tag(GameplayTag::WeaponEquippedNone));
}

#[test]
fn weapon_cycling_wraps() {
    let mut world = server();
    let id = spawn_hero(&mut world, ALICE, Vec3::ZERO);
    let held: Vec<WeaponId> = world.entity(id).unwrap().inventory.iter().collect();
    let current = |world: &World| world.entity(id).unwrap().current_weapon;
    assert_eq!(current(&world), Some(held[0]));

    world.next_weapon(id).unwrap();
    assert_eq!(current(&world), Some(held[1]));
    assert!(world.entity(id).unwrap().has_tag(GameplayTag::WeaponEquippedShotgun));
    assert!(!world.entity(id).unwrap().has_tag(GameplayTag::WeaponEquippedRifle));

    world.next_weapon(id).unwrap();
    assert_eq!(current(&world), Some(held[0]));
    world.previous_weapon(id).unwrap();
    assert_eq!(current(&world), Some(held[1]));
    assert!(world.weapon(held[1]).unwrap().equipped);
    assert!(!world.weapon(held[0]).unwrap().equipped);
}

// ============================================================================
// Prediction and replication
// ============================================================================

#[test]
fn owner_asks_for_its_current_weapon_once_weapons_arrive() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    assert_eq!(client.entity(id).unwrap().current_weapon, None);
    assert_eq!(
        client.drain_outbox().to_server,
        vec![ServerRpc::SyncCurrentWeapon { entity: id }]
    );

    client.send_to_server(ServerRpc::SyncCurrentWeapon { entity: id });
    pump(&mut server, &mut client, ALICE);
    assert_eq!(
        client.entity(id).unwrap().current_weapon,
        server.entity(id).unwrap().current_weapon
    );
}

#[test]
fn refused_weapon_change_resyncs_the_client() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    pump(&mut server, &mut client, ALICE);
    let authoritative = server.entity(id).unwrap().current_weapon;
    assert_eq!(client.entity(id).unwrap().current_weapon, authoritative);

    server.add_loose_tag(id, GameplayTag::WeaponChanging).unwrap();
    client.activate_ability(id, AbilityKind::NextWeapon).unwrap();
    let predicted = client.entity(id).unwrap();
    assert_ne!(predicted.current_weapon, authoritative);
    assert!(predicted.changed_weapon_locally);

    for rpc in client.drain_outbox().to_server {
        let err = server.handle_server_rpc(ALICE, rpc).unwrap_err();
        assert!(matches!(err, WorldError::Ability(AbilityError::Blocked { .. })));
    }
    let replies = server.drain_outbox().to_clients;
    assert!(matches!(
        &replies[..],
        [(ALICE, ClientRpc::AbilityActivationFailed { fail_tags, .. })] if fail_tags == &[GameplayTag::WeaponChanging]
    ));
    for (_, rpc) in replies {
        client.handle_client_rpc(rpc).unwrap();
    }
    assert_eq!(
        client.drain_outbox().to_server,
        vec![ServerRpc::SyncCurrentWeapon { entity: id }]
    );

    client.send_to_server(ServerRpc::SyncCurrentWeapon { entity: id });
    pump(&mut server, &mut client, ALICE);
    let entity = client.entity(id).unwrap();
    assert_eq!(entity.current_weapon, authoritative);
    assert!(!entity.changed_weapon_locally);
}

#[test]
fn accepted_weapon_change_is_confirmed_after_the_delay() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    pump(&mut server, &mut client, ALICE);

    client.activate_ability(id, AbilityKind::NextWeapon).unwrap();
    let predicted = client.entity(id).unwrap().current_weapon;
    pump(&mut server, &mut client, ALICE);
    assert_eq!(server.entity(id).unwrap().current_weapon, predicted);
    assert!(server.entity(id).unwrap().has_tag(GameplayTag::WeaponChanging));
    assert!(client.entity(id).unwrap().changed_weapon_locally);

    for _ in 0..=server.config().weapon_change_replication_delay_ticks {
        server.advance();
    }
    assert!(!server.entity(id).unwrap().has_tag(GameplayTag::WeaponChanging));
    pump(&mut server, &mut client, ALICE);
    let entity = client.entity(id).unwrap();
    assert_eq!(entity.current_weapon, predicted);
    assert!(!entity.changed_weapon_locally);
}

#[test]
fn snapshots_follow_the_replication_table() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::new(10.0, 0.0, 0.0));
    let current = server.entity(id).unwrap().current_weapon;

    let own = server.capture_snapshot(ALICE);
    let entity = own.entities.iter().find(|e| e.id == id).unwrap();
    assert_eq!(entity.current_weapon, None);
    assert_eq!(entity.location, None);
    assert!(entity.attributes.iter().any(|(a, _)| *a == Attribute::RifleReserveAmmo));
    assert!(entity.attributes.iter().all(|(a, _)| *a != Attribute::Damage));
    let weapon = own.weapons.iter().find(|w| Some(w.id) == current).unwrap();
    assert_eq!(weapon.owner, Some(Some(id)));
    assert_eq!(weapon.primary_clip_ammo, Some(30));

    let other = server.capture_snapshot(BOB);
    let entity = other.entities.iter().find(|e| e.id == id).unwrap();
    assert_eq!(entity.current_weapon, Some(current));
    assert_eq!(entity.location, Some(Vec3::new(10.0, 0.0, 0.0)));
    assert!(entity.attributes.iter().all(|(a, _)| *a != Attribute::RifleReserveAmmo));
    assert!(entity.attributes.iter().any(|(a, _)| *a == Attribute::Health));
    let weapon = other.weapons.iter().find(|w| Some(w.id) == current).unwrap();
    assert_eq!(weapon.owner, None);
    assert_eq!(weapon.primary_clip_ammo, None);
    assert!(weapon.location.is_some());
}

#[test]
fn world_weapon_locations_reach_every_viewer() {
    let mut server = server();
    spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let dropped = server.spawn_weapon(rifle().kind, Vec3::new(0.0, 50.0, 0.0)).unwrap();

    for viewer in [ALICE, BOB] {
        let snapshot = server.capture_snapshot(viewer);
        let weapon = snapshot.weapons.iter().find(|w| w.id == dropped).unwrap();
        assert_eq!(weapon.location, Some(Vec3::new(0.0, 50.0, 0.0)));
    }
    let observer = connect(&server, BOB);
    assert_eq!(observer.weapon(dropped).unwrap().location, Vec3::new(0.0, 50.0, 0.0));
}

#[test]
fn replicated_knock_down_plays_cosmetics_on_observers() {
    let mut server = server();
    let downed = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut observer = connect(&server, BOB);
    observer.drain_notifications();

    server.apply_damage(None, downed, 1000.0, false).unwrap();
    observer
        .apply_snapshot(server.capture_snapshot(BOB))
        .unwrap();
    let entity = observer.entity(downed).unwrap();
    assert_eq!(entity.life_state(), LifeState::KnockedDown);
    assert_eq!(entity.current_weapon, server.entity(downed).unwrap().current_weapon);
    assert!(has_cue(&observer.drain_notifications(), GameplayTag::CueHeroKnockedDown));
}

#[test]
fn agreeing_moves_are_acknowledged() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    pump(&mut server, &mut client, ALICE);

    client.move_locally(id, Vec3::X, 0.1, 0.1).unwrap();
    client.flush_moves(id).unwrap();
    pump(&mut server, &mut client, ALICE);

    let expected = Vec3::X * 60.0;
    assert!(server.entity(id).unwrap().location.distance(expected) < 1e-3);
    assert!(client.entity(id).unwrap().location.distance(expected) < 1e-3);
    assert!(client.entity(id).unwrap().predictor.unacknowledged().is_empty());
}

#[test]
fn diverging_moves_are_corrected_and_replayed() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    pump(&mut server, &mut client, ALICE);

    client.entities.get_mut(&id).unwrap().location = Vec3::new(500.0, 0.0, 0.0);
    client.move_locally(id, Vec3::X, 0.1, 0.1).unwrap();
    client.flush_moves(id).unwrap();
    // Held back as pending, so it is replayed on top of the correction.
    client.move_locally(id, Vec3::X, 0.2, 0.1).unwrap();

    let to_server = client.drain_outbox().to_server;
    assert_eq!(to_server.len(), 1);
    for rpc in to_server {
        server.handle_server_rpc(ALICE, rpc).unwrap();
    }
    let replies = server.drain_outbox().to_clients;
    assert!(matches!(&replies[..], [(ALICE, ClientRpc::AdjustPosition { .. })]));
    for (_, rpc) in replies {
        client.handle_client_rpc(rpc).unwrap();
    }
    assert!(client.entity(id).unwrap().location.distance(Vec3::X * 120.0) < 1e-3);
}

#[test]
fn non_finite_moves_are_rejected() {
    use crate::movement::{CompressedFlags, ServerMove};

    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::new(10.0, 0.0, 0.0));
    server.drain_outbox();
    let valid = ServerMove {
        timestamp: 0.1,
        delta_time: 0.1,
        acceleration: Vec3::X,
        flags: CompressedFlags::empty(),
        client_location: Vec3::new(70.0, 0.0, 0.0),
    };
    let broken = [
        ("delta_time", ServerMove { delta_time: f32::NAN, ..valid }),
        ("timestamp", ServerMove { timestamp: f32::INFINITY, ..valid }),
        ("acceleration", ServerMove { acceleration: Vec3::new(f32::NAN, 0.0, 0.0), ..valid }),
        ("client_location", ServerMove { client_location: Vec3::splat(f32::NEG_INFINITY), ..valid }),
    ];

    for (field, mv) in broken {
        let err = server
            .handle_server_rpc(ALICE, ServerRpc::Move { entity: id, mv })
            .unwrap_err();
        assert_eq!(err, WorldError::InvalidMove { entity: id, field });
        assert_eq!(err.severity(), ErrorSeverity::Validation);
        assert_eq!(err.error_code(), "WORLD_INVALID_MOVE");
        assert_eq!(server.entity(id).unwrap().location, Vec3::new(10.0, 0.0, 0.0));
    }
    assert!(server.drain_outbox().to_clients.is_empty());

    server.handle_server_rpc(ALICE, ServerRpc::Move { entity: id, mv: valid }).unwrap();
    assert!(server.entity(id).unwrap().location.is_finite());
}

#[test]
fn sprint_intent_reaches_the_server() {
    let mut server = server();
    let id = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    let mut client = connect(&server, ALICE);
    pump(&mut server, &mut client, ALICE);

    client.set_sprinting(id, true).unwrap();
    assert_eq!(client.max_speed(id).unwrap(), 600.0 * 1.4);
    client.move_locally(id, Vec3::Y, 0.1, 0.1).unwrap();
    client.flush_moves(id).unwrap();
    pump(&mut server, &mut client, ALICE);
    assert_eq!(server.max_speed(id).unwrap(), 600.0 * 1.4);
    assert!(server.entity(id).unwrap().location.distance(Vec3::Y * 84.0) < 1e-3);
}

#[test]
fn rpcs_for_foreign_entities_are_rejected() {
    let mut server = server();
    let alice = spawn_hero(&mut server, ALICE, Vec3::ZERO);
    spawn_hero(&mut server, BOB, Vec3::ZERO);
    let err = server
        .handle_server_rpc(BOB, ServerRpc::SyncCurrentWeapon { entity: alice })
        .unwrap_err();
    assert!(matches!(err, WorldError::NotAuthority { .. }));
}
