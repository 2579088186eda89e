//! Enumeration types shared across the Somatic workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// Physical size class of a character or the largest thing an exit admits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Size {
    /// Insects, mice.
    Tiny,
    /// Cats, small dogs.
    VerySmall,
    /// Children, large dogs.
    Small,
    /// Adult humans.
    #[default]
    Normal,
    /// Horses, bears.
    Large,
    /// Elephants.
    VeryLarge,
    /// Giants.
    Huge,
    /// Dragons.
    Enormous,
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// The manner in which a character traverses an exit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum MovementKind {
    /// Ordinary travel on foot (or crawling).
    #[default]
    Single,
    /// Travel while dragging something behind.
    Drag,
    /// Swimming through water.
    Swim,
    /// Flying through the air.
    Fly,
    /// Climbing along a surface.
    Climb,
    /// Sneaking.
    Stealth,
}

/// Which side of the exit an in-progress movement is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Still in the room being left.
    OriginalRoom,
    /// Arrived in the destination room.
    NewRoom,
}

/// Special handling required when crossing an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionType {
    /// Nothing special.
    Normal,
    /// Moving from branches in one room to branches in the next.
    TreesToTrees,
    /// Only passable in flight.
    FlyOnly,
    /// Only passable by swimming.
    SwimOnly,
    /// Crossing drops the character to a lower layer.
    FallExit,
    /// Leaving the water for dry land.
    SwimToLand,
}

// ---------------------------------------------------------------------------
// Exertion
// ---------------------------------------------------------------------------

/// How hard a character has been working recently.
///
/// Derived from the stamina spend rate. It is never a gate by itself; it
/// only feeds display, regeneration and movement-speed penalties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ExertionLevel {
    /// Completely still.
    Rest,
    /// Everyday activity.
    #[default]
    Normal,
    /// Light work.
    Low,
    /// Moderate work.
    Moderate,
    /// Heavy work.
    Heavy,
    /// Very heavy work.
    VeryHeavy,
    /// Flat out.
    ExtremelyHeavy,
}

impl ExertionLevel {
    /// Every exertion level from lowest to highest.
    pub const ALL: [Self; 7] = [
        Self::Rest,
        Self::Normal,
        Self::Low,
        Self::Moderate,
        Self::Heavy,
        Self::VeryHeavy,
        Self::ExtremelyHeavy,
    ];

    /// Multiplier applied to stamina regeneration at this exertion level.
    pub const fn regeneration_factor(self) -> f64 {
        match self {
            Self::Rest => 1.5,
            Self::Normal => 1.0,
            Self::Low => 0.75,
            Self::Moderate => 0.5,
            Self::Heavy => 0.25,
            Self::VeryHeavy | Self::ExtremelyHeavy => 0.0,
        }
    }

    /// Number of grades above `Normal`; zero for `Rest` and `Normal`.
    pub const fn strain(self) -> u8 {
        match self {
            Self::Rest | Self::Normal => 0,
            Self::Low => 1,
            Self::Moderate => 2,
            Self::Heavy => 3,
            Self::VeryHeavy => 4,
            Self::ExtremelyHeavy => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Character status
// ---------------------------------------------------------------------------

/// Whether a character is in a state to act at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Consciousness {
    /// Awake and able to act.
    #[default]
    Awake,
    /// Asleep.
    Sleeping,
    /// Knocked out.
    Unconscious,
    /// Dead. Terminal.
    Dead,
}

impl Consciousness {
    /// Whether the character can act.
    pub const fn can_act(self) -> bool {
        matches!(self, Self::Awake)
    }

    /// Whether the character is helpless against attack.
    pub const fn is_helpless(self) -> bool {
        matches!(self, Self::Sleeping | Self::Unconscious)
    }

    /// Lower-case description ("asleep").
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Sleeping => "asleep",
            Self::Unconscious => "unconscious",
            Self::Dead => "dead",
        }
    }
}

/// Per-character engagement state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum CombatStatus {
    /// Not part of any combat.
    #[default]
    Unengaged,
    /// Fighting at arm's length.
    EngagedMelee,
    /// Fighting at range.
    EngagedRanged,
    /// Trying to get away.
    Fleeing,
    /// Asking everyone to stop.
    TruceRequested,
}

impl CombatStatus {
    /// Whether the character is part of a combat in any capacity.
    pub const fn in_combat(self) -> bool {
        !matches!(self, Self::Unengaged)
    }
}

/// Which side of a character an opponent is attacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Face to face.
    #[default]
    Front,
    /// From the side.
    Flank,
    /// From behind.
    Rear,
}
