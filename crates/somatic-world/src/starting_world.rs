//! Default starting world for demos and integration tests.
//!
//! Seven rooms chosen to exercise every kind of crossing: a meadow hub, two
//! forest rooms joined at canopy level, a river, a town with rooftops and a
//! peaceful shrine, and a cliff ledge reached by a fly-only climbable exit
//! with a fall exit back down.

use somatic_types::{Difficulty, RoomId, RoomLayer, Size};

use crate::error::WorldError;
use crate::exit::Exit;
use crate::room::Room;
use crate::terrain::{Terrain, stock};
use crate::world_map::WorldMap;

/// Identifiers for the starting rooms, returned alongside the world map so
/// callers can place characters.
#[derive(Debug, Clone, Copy)]
pub struct StartingRoomIds {
    /// Open meadow at the centre.
    pub meadow: RoomId,
    /// Edge of the forest, east of the meadow.
    pub forest_edge: RoomId,
    /// Deep wood, north of the forest edge.
    pub deep_wood: RoomId,
    /// River, south of the meadow.
    pub river: RoomId,
    /// Town square, west of the meadow.
    pub town: RoomId,
    /// Peaceful shrine inside the town.
    pub shrine: RoomId,
    /// Cliff ledge above the meadow.
    pub ledge: RoomId,
}

/// Create the default starting world.
///
/// # Errors
///
/// Returns [`WorldError`] if construction fails (should not happen with
/// the hard-coded data).
pub fn create_starting_world() -> Result<(WorldMap, StartingRoomIds), WorldError> {
    let mut map = WorldMap::new();

    let meadow = map.add_room(Room::new("Meadow", stock::plains()?))?;
    let forest_edge = map.add_room(Room::new("Forest Edge", stock::forest()?))?;
    let deep_wood = map.add_room(
        Room::new("Deep Wood", stock::forest()?.with_movement_rate(2.0))
            .with_light(Difficulty::Hard),
    )?;
    let river = map.add_room(Room::new("River", stock::river()?))?;
    let town = map.add_room(Room::new("Town Square", stock::town()?))?;
    let shrine = map.add_room(
        Room::new("Shrine", Terrain::new("stone floor", [RoomLayer::GroundLevel])?).peaceful(),
    )?;
    let ledge = map.add_room(Room::new(
        "Cliff Ledge",
        Terrain::new("ledge", [RoomLayer::GroundLevel, RoomLayer::InAir])?
            .with_hide_difficulty(Difficulty::VeryHard),
    ))?;

    map.add_exit_pair(Exit::new(meadow, forest_edge, "east"), "west")?;
    map.add_exit_pair(Exit::new(forest_edge, deep_wood, "north"), "south")?;
    map.add_exit_pair(Exit::new(meadow, river, "south"), "north")?;
    map.add_exit_pair(Exit::new(meadow, town, "west").time_multiplier(0.8), "east")?;
    map.add_exit_pair(Exit::new(town, shrine, "in").max_size(Size::Normal), "out")?;
    map.add_exit_pair(
        Exit::new(meadow, ledge, "up")
            .fly_only()
            .climbable(Difficulty::Hard)
            .time_multiplier(2.0),
        "down",
    )?;
    map.add_exit(Exit::new(ledge, meadow, "jump").fall_exit())?;

    Ok((
        map,
        StartingRoomIds {
            meadow,
            forest_edge,
            deep_wood,
            river,
            town,
            shrine,
            ledge,
        },
    ))
}
