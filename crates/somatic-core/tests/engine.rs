//! End-to-end engine scenarios on the starting world.

#![allow(clippy::unwrap_used)]

use somatic_character::{
    Character, CombatSettings, LimbBody, MoveRequest, PositionRequest, ScriptedOracle,
};
use somatic_core::command::Command;
use somatic_core::config::SimulationConfig;
use somatic_core::engine::{CommandOutcome, Engine};
use somatic_core::heartbeat::Heartbeat;
use somatic_types::{
    CharacterId, CombatStatus, Consciousness, MovementKind, Outcome, PositionState, RoomId,
    RoomLayer,
};
use somatic_world::{StartingRoomIds, create_starting_world};

fn engine_with(oracle: ScriptedOracle) -> (Engine, StartingRoomIds) {
    let (world, ids) = create_starting_world().unwrap();
    let config = SimulationConfig::parse("time:\n  heartbeat_short_ms: 5000\n").unwrap();
    let engine = Engine::from_config(&config, world, Box::new(oracle)).unwrap();
    (engine, ids)
}

fn engine() -> (Engine, StartingRoomIds) {
    engine_with(ScriptedOracle::new(Outcome::Pass))
}

fn humanoid(engine: &mut Engine, name: &str, room: RoomId) -> CharacterId {
    engine
        .login(Character::new(name, room, Box::new(LimbBody::humanoid(100.0))))
        .unwrap()
}

fn steps(engine: &mut Engine, n: u32) {
    for _ in 0..n {
        engine.step().unwrap();
    }
}

fn done(engine: &mut Engine, id: CharacterId, command: Command) {
    let outcome = engine.apply(id, command).unwrap();
    assert_eq!(outcome, CommandOutcome::Done);
}

#[test]
fn walk_a_route_with_queued_moves() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.town);
    done(&mut engine, ayla, Command::QueueMove(MoveRequest::new("east")));
    done(&mut engine, ayla, Command::QueueMove(MoveRequest::new("east")));
    done(&mut engine, ayla, Command::QueueMove(MoveRequest::new("north")));
    assert_eq!(engine.realm().character(ayla).unwrap().queue.len(), 2);

    steps(&mut engine, 60);
    let c = engine.realm().character(ayla).unwrap();
    assert_eq!(c.room, ids.deep_wood);
    assert!(c.queue.is_empty());
    assert!(!c.is_moving());
    assert!(engine.realm().world().room(ids.deep_wood).unwrap().contains(ayla));
    assert!(!engine.realm().world().room(ids.town).unwrap().contains(ayla));
}

#[test]
fn sneaking_takes_longer_than_walking() {
    let (mut engine, ids) = engine();
    let walker = humanoid(&mut engine, "Walker", ids.meadow);
    let sneaker = humanoid(&mut engine, "Sneaker", ids.meadow);
    done(&mut engine, walker, Command::Move(MoveRequest::new("east")));
    done(
        &mut engine,
        sneaker,
        Command::Move(MoveRequest::new("east").kind(MovementKind::Stealth)),
    );
    let walk = engine.realm().character(walker).unwrap().movement.as_ref().unwrap().duration_ms;
    let sneak = engine.realm().character(sneaker).unwrap().movement.as_ref().unwrap().duration_ms;
    assert!(sneak > walk);
}

#[test]
fn stand_up_then_walk() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.meadow);
    done(
        &mut engine,
        ayla,
        Command::Position(PositionRequest::new(PositionState::Sitting)),
    );
    done(
        &mut engine,
        ayla,
        Command::Position(PositionRequest::new(PositionState::Standing)),
    );
    done(&mut engine, ayla, Command::Move(MoveRequest::new("west")));
    steps(&mut engine, 10);
    assert_eq!(engine.realm().character(ayla).unwrap().room, ids.town);
}

#[test]
fn melee_follows_the_fight_across_rooms() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.meadow);
    let brann = humanoid(&mut engine, "Brann", ids.meadow);
    done(&mut engine, ayla, Command::Engage { target: brann, ranged: false });

    let a = engine.realm().character(ayla).unwrap();
    assert!(a.melee_range);
    assert_eq!(a.combat_target, Some(brann));
    let b = engine.realm().character(brann).unwrap();
    assert_eq!(b.combat_target, Some(ayla));
    assert_eq!(b.combat, a.combat);

    // Locked in melee: walking away is refused, fleeing is allowed.
    let walk = engine.apply(ayla, Command::Move(MoveRequest::new("east"))).unwrap();
    assert!(matches!(walk, CommandOutcome::Refused(_)));
    done(&mut engine, ayla, Command::Flee);
    assert_eq!(
        engine.realm().character(ayla).unwrap().combat_status,
        CombatStatus::Fleeing
    );
    done(&mut engine, ayla, Command::Move(MoveRequest::new("east")));
    steps(&mut engine, 15);

    let a = engine.realm().character(ayla).unwrap();
    assert_eq!(a.room, ids.forest_edge);
    assert!(!a.in_combat());
    assert!(!engine.realm().character(brann).unwrap().melee_range);
}

#[test]
fn peaceful_shrine_refuses_combat() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.shrine);
    let brann = humanoid(&mut engine, "Brann", ids.shrine);
    let outcome = engine
        .apply(ayla, Command::Engage { target: brann, ranged: false })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Refused(_)));
    assert!(engine.realm().combats().is_empty());
}

#[test]
fn ranged_engagement_across_an_exit() {
    let (mut engine, ids) = engine();
    let archer = engine
        .login(
            Character::new("Archer", ids.meadow, Box::new(LimbBody::humanoid(100.0)))
                .with_settings(CombatSettings {
                    prefer_ranged: true,
                    ..CombatSettings::default()
                }),
        )
        .unwrap();
    let target = humanoid(&mut engine, "Target", ids.town);
    done(&mut engine, archer, Command::Engage { target, ranged: true });
    assert!(!engine.realm().character(archer).unwrap().melee_range);

    // The river is two exits away from the town.
    let scout = humanoid(&mut engine, "Scout", ids.town);
    let far = humanoid(&mut engine, "Far", ids.river);
    let outcome = engine
        .apply(scout, Command::Engage { target: far, ranged: true })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Refused(_)));
}

#[test]
fn truce_from_both_sides_ends_the_fight() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.meadow);
    let brann = humanoid(&mut engine, "Brann", ids.meadow);
    done(&mut engine, ayla, Command::Engage { target: brann, ranged: false });
    done(&mut engine, ayla, Command::Truce);
    assert!(engine.realm().character(ayla).unwrap().in_combat());
    done(&mut engine, brann, Command::Truce);
    assert!(!engine.realm().character(ayla).unwrap().in_combat());
    assert!(!engine.realm().character(brann).unwrap().in_combat());
}

#[test]
fn exhausted_flyer_falls_on_the_heartbeat() {
    let (mut engine, ids) = engine();
    let bird = engine
        .login(Character::new("Kestrel", ids.meadow, Box::new(LimbBody::winged(100.0))))
        .unwrap();
    done(&mut engine, bird, Command::Fly);
    done(&mut engine, bird, Command::Ascend);
    done(&mut engine, bird, Command::Ascend);
    engine
        .realm_mut()
        .character_mut(bird)
        .unwrap()
        .body
        .stamina_mut()
        .set_maximum(0.0);

    steps(&mut engine, 12);
    let c = engine.realm().character(bird).unwrap();
    assert_eq!(c.layer, RoomLayer::GroundLevel);
    assert!(!c.is_falling());
    assert_ne!(c.position, PositionState::Flying);
}

#[test]
fn failed_climb_in_the_trees_falls_to_the_ground() {
    let (mut engine, ids) = engine_with(
        ScriptedOracle::new(Outcome::Pass).then([Outcome::MajorFail, Outcome::MajorFail]),
    );
    let ayla = humanoid(&mut engine, "Ayla", ids.forest_edge);
    let outcome = engine.apply(ayla, Command::ClimbUp).unwrap();
    assert!(outcome.is_done());
    assert!(engine.realm().character(ayla).unwrap().is_falling());

    steps(&mut engine, 5);
    let c = engine.realm().character(ayla).unwrap();
    assert!(!c.is_falling());
    assert_eq!(c.layer, RoomLayer::GroundLevel);
    assert_eq!(c.position, PositionState::Prostrate);
}

#[test]
fn death_unregisters_heartbeats_and_ends_combat() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.meadow);
    let brann = humanoid(&mut engine, "Brann", ids.meadow);
    done(&mut engine, ayla, Command::Engage { target: brann, ranged: false });

    engine.kill(brann).unwrap();
    assert!(!engine.heartbeats().is_subscribed(brann, Heartbeat::Short));
    assert!(engine.heartbeats().is_subscribed(ayla, Heartbeat::Short));
    assert_eq!(
        engine.realm().character(brann).unwrap().consciousness,
        Consciousness::Dead
    );
    steps(&mut engine, 6);
    let a = engine.realm().character(ayla).unwrap();
    assert_eq!(a.combat_target, None);
    assert!(!a.melee_range);
}

#[test]
fn logout_mid_move_leaves_no_trace() {
    let (mut engine, ids) = engine();
    let ayla = humanoid(&mut engine, "Ayla", ids.meadow);
    done(&mut engine, ayla, Command::Move(MoveRequest::new("south")));
    done(&mut engine, ayla, Command::Logout);
    assert!(engine.scheduler().is_empty());
    steps(&mut engine, 10);
    assert!(engine.realm().roster().is_empty());
    assert!(!engine.realm().world().room(ids.meadow).unwrap().contains(ayla));
    assert!(!engine.realm().world().room(ids.river).unwrap().contains(ayla));
}
