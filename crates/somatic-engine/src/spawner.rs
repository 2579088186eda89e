//! Cast spawner for seeding the world with its opening characters.
//!
//! The cast is read from the `cast` section of `somatic-config.yaml`. Each
//! member names a starting room and a body plan; the spawner builds the
//! character and logs it in through the engine so heartbeats are wired
//! from the first step.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use somatic_character::{Character, CombatSettings, LimbBody};
use somatic_core::engine::Engine;
use somatic_types::{CharacterId, RoomId};
use somatic_world::StartingRoomIds;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the cast, loaded from the `cast` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastConfig {
    /// Characters logged in before the first step.
    #[serde(default = "default_members")]
    pub members: Vec<CastMember>,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            members: default_members(),
        }
    }
}

/// One character of the opening cast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastMember {
    /// Display name; must be unique within the cast.
    pub name: String,

    /// Starting room.
    pub room: StartingRoom,

    /// Body plan.
    #[serde(default)]
    pub body: BodyPlan,

    /// Maximum stamina.
    #[serde(default = "default_max_stamina")]
    pub max_stamina: f64,

    /// Open fights at range rather than in melee.
    #[serde(default)]
    pub prefer_ranged: bool,
}

impl CastMember {
    fn new(name: &str, room: StartingRoom, body: BodyPlan) -> Self {
        Self {
            name: name.to_owned(),
            room,
            body,
            max_stamina: default_max_stamina(),
            prefer_ranged: false,
        }
    }
}

/// Rooms of the starting world a cast member may start in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingRoom {
    /// The open meadow.
    Meadow,
    /// The forest edge.
    ForestEdge,
    /// The deep wood.
    DeepWood,
    /// The river.
    River,
    /// The town square.
    Town,
    /// The shrine.
    Shrine,
    /// The cliff ledge.
    Ledge,
}

impl StartingRoom {
    /// Resolve to the room id in a freshly built starting world.
    pub const fn resolve(self, ids: &StartingRoomIds) -> RoomId {
        match self {
            Self::Meadow => ids.meadow,
            Self::ForestEdge => ids.forest_edge,
            Self::DeepWood => ids.deep_wood,
            Self::River => ids.river,
            Self::Town => ids.town,
            Self::Shrine => ids.shrine,
            Self::Ledge => ids.ledge,
        }
    }
}

/// Body plans the spawner knows how to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPlan {
    /// Two arms, two legs.
    #[default]
    Humanoid,
    /// Two wings, two legs.
    Winged,
}

impl BodyPlan {
    fn build(self, max_stamina: f64) -> LimbBody {
        match self {
            Self::Humanoid => LimbBody::humanoid(max_stamina),
            Self::Winged => LimbBody::winged(max_stamina),
        }
    }
}

const fn default_max_stamina() -> f64 {
    100.0
}

fn default_members() -> Vec<CastMember> {
    vec![
        CastMember::new("Ayla", StartingRoom::Town, BodyPlan::Humanoid),
        CastMember::new("Brann", StartingRoom::Meadow, BodyPlan::Humanoid),
        CastMember::new("Dara", StartingRoom::Meadow, BodyPlan::Humanoid),
        CastMember::new("Kestrel", StartingRoom::Meadow, BodyPlan::Winged),
        CastMember::new("Wren", StartingRoom::ForestEdge, BodyPlan::Humanoid),
    ]
}

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// Check the cast before anything is logged in.
fn validate(config: &CastConfig) -> Result<(), EngineError> {
    let mut seen = BTreeSet::new();
    for member in &config.members {
        if member.name.trim().is_empty() {
            return Err(EngineError::Cast {
                message: String::from("cast member with an empty name"),
            });
        }
        if !seen.insert(member.name.as_str()) {
            return Err(EngineError::Cast {
                message: format!("duplicate cast member {}", member.name),
            });
        }
        if !member.max_stamina.is_finite() || member.max_stamina < 0.0 {
            return Err(EngineError::Cast {
                message: format!(
                    "cast member {} has invalid max_stamina {}",
                    member.name, member.max_stamina
                ),
            });
        }
    }
    Ok(())
}

/// Log the whole cast into the engine.
///
/// Returns the new character ids keyed by name.
///
/// # Errors
///
/// Returns [`EngineError::Cast`] for an empty or duplicate name or a bad
/// stamina value, and [`EngineError::Core`] if a login fails.
pub fn spawn_cast(
    config: &CastConfig,
    engine: &mut Engine,
    rooms: &StartingRoomIds,
) -> Result<BTreeMap<String, CharacterId>, EngineError> {
    validate(config)?;

    let mut cast = BTreeMap::new();
    for member in &config.members {
        let room = member.room.resolve(rooms);
        let character = Character::new(
            member.name.clone(),
            room,
            Box::new(member.body.build(member.max_stamina)),
        )
        .with_settings(CombatSettings {
            prefer_ranged: member.prefer_ranged,
            ..CombatSettings::default()
        });
        let id = engine.login(character)?;

        info!(
            character = %id,
            name = %member.name,
            room = %room,
            body = ?member.body,
            "Spawned cast member"
        );
        cast.insert(member.name.clone(), id);
    }
    Ok(cast)
}
