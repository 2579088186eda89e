//! The opening scene: a fixed script of commands for the default cast.
//!
//! Each beat names a cast member by name. Beats for names missing from the
//! spawned cast are skipped, so a trimmed `cast` section still runs.

use std::collections::BTreeMap;

use somatic_character::{MoveRequest, PositionRequest};
use somatic_core::command::{Command, ScriptedCommands};
use somatic_types::{CharacterId, MovementKind, PositionState};
use tracing::debug;

/// Something a cast member does, possibly aimed at another member.
enum Beat {
    Solo(Command),
    Engage { target: &'static str, ranged: bool },
}

/// Build the opening scene for the given cast.
pub fn opening_scene(cast: &BTreeMap<String, CharacterId>) -> ScriptedCommands {
    let mut script = ScriptedCommands::new();
    let mut skipped = 0_u32;
    for (tick, actor, beat) in beats() {
        let Some(&id) = cast.get(actor) else {
            skipped = skipped.saturating_add(1);
            continue;
        };
        let command = match beat {
            Beat::Solo(command) => command,
            Beat::Engage { target, ranged } => {
                let Some(&target) = cast.get(target) else {
                    skipped = skipped.saturating_add(1);
                    continue;
                };
                Command::Engage { target, ranged }
            }
        };
        script.push(tick, id, command);
    }
    debug!(
        scripted = script.remaining(),
        skipped,
        last_tick = script.last_tick(),
        "Opening scene built"
    );
    script
}

fn beats() -> Vec<(u64, &'static str, Beat)> {
    let walk = |dir: &str| Beat::Solo(Command::QueueMove(MoveRequest::new(dir)));
    let sit = PositionRequest::new(PositionState::Sitting);
    let sneak_east = MoveRequest::new("east").kind(MovementKind::Stealth);
    vec![
        // Ayla walks from the town into the deep wood.
        (1, "Ayla", walk("east")),
        (1, "Ayla", walk("east")),
        (1, "Ayla", walk("north")),
        // Kestrel takes off, circles high and comes down.
        (2, "Kestrel", Beat::Solo(Command::Fly)),
        (4, "Kestrel", Beat::Solo(Command::Ascend)),
        (12, "Kestrel", Beat::Solo(Command::Dive)),
        (14, "Kestrel", Beat::Solo(Command::Land)),
        // Wren climbs into the trees and back down.
        (3, "Wren", Beat::Solo(Command::ClimbUp)),
        (15, "Wren", Beat::Solo(Command::ClimbDown)),
        // Brann picks a fight with Dara; Dara breaks away, then they call it off.
        (5, "Brann", Beat::Engage { target: "Dara", ranged: false }),
        (8, "Dara", Beat::Solo(Command::Flee)),
        (8, "Dara", Beat::Solo(Command::Move(MoveRequest::new("west")))),
        (20, "Brann", Beat::Solo(Command::Truce)),
        (20, "Dara", Beat::Solo(Command::Truce)),
        // Dara settles in the town square for a nap.
        (24, "Dara", Beat::Solo(Command::Position(sit))),
        (26, "Dara", Beat::Solo(Command::Sleep)),
        (70, "Dara", Beat::Solo(Command::Wake)),
        // Brann slips off into the forest.
        (30, "Brann", Beat::Solo(Command::Move(sneak_east))),
        // Kestrel leaves the world.
        (90, "Kestrel", Beat::Solo(Command::Logout)),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cast(names: &[&str]) -> BTreeMap<String, CharacterId> {
        names
            .iter()
            .map(|name| ((*name).to_owned(), CharacterId::new()))
            .collect()
    }

    #[test]
    fn full_cast_scripts_every_beat() {
        let script = opening_scene(&cast(&["Ayla", "Brann", "Dara", "Kestrel", "Wren"]));
        assert_eq!(script.remaining(), beats().len());
        assert_eq!(script.last_tick(), Some(90));
    }

    #[test]
    fn missing_members_are_skipped() {
        let script = opening_scene(&cast(&["Ayla"]));
        assert_eq!(script.remaining(), 3);
        assert_eq!(script.last_tick(), Some(1));
    }

    #[test]
    fn engagement_needs_both_sides() {
        let mut script = opening_scene(&cast(&["Brann"]));
        let commands = script_commands(&mut script, 5);
        assert!(commands.is_empty());

        let members = cast(&["Brann", "Dara"]);
        let mut script = opening_scene(&members);
        let commands = script_commands(&mut script, 5);
        let dara = *members.get("Dara").unwrap();
        assert_eq!(
            commands.first().map(|(_, c)| c.clone()),
            Some(Command::Engage { target: dara, ranged: false })
        );
    }

    fn script_commands(
        script: &mut ScriptedCommands,
        tick: u64,
    ) -> Vec<(CharacterId, Command)> {
        use somatic_core::command::CommandSource;
        script.commands_for(tick).unwrap()
    }

    #[test]
    fn scene_plays_out_on_the_default_cast() {
        use somatic_character::ScriptedOracle;
        use somatic_core::command::CommandSource;
        use somatic_core::config::SimulationConfig;
        use somatic_core::engine::Engine;
        use somatic_types::{Consciousness, Outcome};
        use somatic_world::create_starting_world;

        use crate::spawner::{CastConfig, spawn_cast};

        let (world, rooms) = create_starting_world().unwrap();
        let oracle = Box::new(ScriptedOracle::new(Outcome::Pass));
        let mut engine = Engine::from_config(&SimulationConfig::default(), world, oracle).unwrap();
        let cast = spawn_cast(&CastConfig::default(), &mut engine, &rooms).unwrap();
        let mut script = opening_scene(&cast);

        for tick in 1..=100 {
            let commands = script.commands_for(tick).unwrap();
            engine.run_step(commands).unwrap();
        }

        assert_eq!(script.remaining(), 0);
        let realm = engine.realm();
        let ayla = realm.character(*cast.get("Ayla").unwrap()).unwrap();
        assert_eq!(ayla.room, rooms.deep_wood);
        let dara = realm.character(*cast.get("Dara").unwrap()).unwrap();
        assert_eq!(dara.room, rooms.town);
        assert_eq!(dara.consciousness, Consciousness::Awake);
        assert!(!dara.in_combat());
        let brann = realm.character(*cast.get("Brann").unwrap()).unwrap();
        assert_eq!(brann.room, rooms.forest_edge);
        assert!(!realm.roster().contains(*cast.get("Kestrel").unwrap()));
        assert_eq!(realm.roster().len(), 4);
    }

    #[test]
    fn empty_cast_gives_empty_script() {
        let script = opening_scene(&BTreeMap::new());
        assert_eq!(script.remaining(), 0);
    }
}
