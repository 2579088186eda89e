//! Body postures and the spatial modifiers that relate a posture to a target.
//!
//! [`PositionState`] is a closed enum. Every variant carries a fixed
//! attribute table (uprightness, fall safety, movement restriction, forced
//! transition while moving, relative height) exposed through `const fn`
//! accessors. Behaviour that depends on the posture dispatches on the tag
//! rather than on per-posture objects.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The posture a character's body is currently in.
///
/// Exactly one posture is active per character. The body decides which
/// postures are valid for it at all (a fish has no `Standing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionState {
    /// On both feet.
    Standing,
    /// Seated on the ground or on something.
    Sitting,
    /// Resting on one or both knees.
    Kneeling,
    /// Crouched on the feet with knees bent.
    Squatting,
    /// Standing but propped against something.
    Leaning,
    /// Reclining lazily.
    Lounging,
    /// Collapsed in a heap.
    Slumped,
    /// Lying with limbs spread out.
    Sprawled,
    /// Lying face down.
    Prone,
    /// Lying flat, face down and stretched out (crawling posture).
    Prostrate,
    /// Clinging to a climbable surface.
    Climbing,
    /// Actively swimming.
    Swimming,
    /// Floating passively in water.
    Floating,
    /// Airborne under one's own power.
    Flying,
}

/// How a posture limits travel through exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MoveRestriction {
    /// The posture never prevents movement.
    Free,
    /// The character must change posture before moving.
    Restricted,
    /// Movement is free unless the character is positioned in or on something.
    FreeIfNotInOn,
}

/// Capability class of a posture, used to ask the body whether it can hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PostureClass {
    /// Needs legs able to bear weight.
    Standing,
    /// Needs a leg, or a leg braced by an arm.
    Kneeling,
    /// Needs enough control to hold the torso up.
    Sitting,
    /// Needs nothing at all.
    Lying,
    /// Needs limbs able to grip.
    Climbing,
    /// Needs to be in water.
    Swimming,
    /// Needs working wings.
    Flying,
}

/// Relative direction of a posture change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostureDirection {
    /// The new posture is higher than the old one.
    Up,
    /// The new posture is lower than the old one.
    Down,
    /// Both postures sit at the same height.
    Level,
}

impl PositionState {
    /// Every posture, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Standing,
        Self::Sitting,
        Self::Kneeling,
        Self::Squatting,
        Self::Leaning,
        Self::Lounging,
        Self::Slumped,
        Self::Sprawled,
        Self::Prone,
        Self::Prostrate,
        Self::Climbing,
        Self::Swimming,
        Self::Floating,
        Self::Flying,
    ];

    /// Whether the body is held vertically in this posture.
    pub const fn upright(self) -> bool {
        matches!(
            self,
            Self::Standing | Self::Squatting | Self::Leaning | Self::Climbing | Self::Flying
        )
    }

    /// Whether the posture keeps the character from falling when the layer
    /// offers no footing.
    pub const fn safe_from_falling(self) -> bool {
        matches!(
            self,
            Self::Climbing | Self::Flying | Self::Swimming | Self::Floating
        )
    }

    /// How this posture restricts movement through exits.
    pub const fn move_restriction(self) -> MoveRestriction {
        match self {
            Self::Sitting | Self::Lounging | Self::Slumped | Self::Sprawled => {
                MoveRestriction::Restricted
            }
            Self::Kneeling | Self::Squatting | Self::Leaning => MoveRestriction::FreeIfNotInOn,
            Self::Standing
            | Self::Prone
            | Self::Prostrate
            | Self::Climbing
            | Self::Swimming
            | Self::Floating
            | Self::Flying => MoveRestriction::Free,
        }
    }

    /// The posture a character is forced into while travelling, if any.
    pub const fn transition_on_movement(self) -> Option<Self> {
        match self {
            Self::Kneeling => Some(Self::Prostrate),
            Self::Squatting | Self::Leaning => Some(Self::Standing),
            Self::Floating => Some(Self::Swimming),
            _ => None,
        }
    }

    /// Relative height of the posture. Only meaningful for comparisons.
    pub const fn height(self) -> u8 {
        match self {
            Self::Prone | Self::Prostrate | Self::Sprawled => 0,
            Self::Slumped | Self::Lounging | Self::Swimming | Self::Floating => 1,
            Self::Sitting => 2,
            Self::Kneeling | Self::Squatting => 3,
            Self::Standing | Self::Leaning | Self::Climbing => 4,
            Self::Flying => 5,
        }
    }

    /// Compare the height of this posture with another.
    pub fn compare_height(self, other: Self) -> Ordering {
        self.height().cmp(&other.height())
    }

    /// Direction of travel when moving from `self` to `target`.
    pub fn direction_to(self, target: Self) -> PostureDirection {
        match target.compare_height(self) {
            Ordering::Greater => PostureDirection::Up,
            Ordering::Less => PostureDirection::Down,
            Ordering::Equal => PostureDirection::Level,
        }
    }

    /// The capability class the body must support to hold this posture.
    pub const fn class(self) -> PostureClass {
        match self {
            Self::Standing | Self::Leaning | Self::Squatting => PostureClass::Standing,
            Self::Kneeling => PostureClass::Kneeling,
            Self::Sitting | Self::Lounging => PostureClass::Sitting,
            Self::Slumped | Self::Sprawled | Self::Prone | Self::Prostrate => PostureClass::Lying,
            Self::Climbing => PostureClass::Climbing,
            Self::Swimming | Self::Floating => PostureClass::Swimming,
            Self::Flying => PostureClass::Flying,
        }
    }

    /// Present-participle description ("standing", "lying prone").
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Standing => "standing",
            Self::Sitting => "sitting",
            Self::Kneeling => "kneeling",
            Self::Squatting => "squatting",
            Self::Leaning => "leaning",
            Self::Lounging => "lounging",
            Self::Slumped => "slumped",
            Self::Sprawled => "sprawled out",
            Self::Prone => "lying prone",
            Self::Prostrate => "prostrate",
            Self::Climbing => "climbing",
            Self::Swimming => "swimming",
            Self::Floating => "floating",
            Self::Flying => "flying",
        }
    }

    /// Third-person verb phrase used when a character adopts this posture.
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Standing => "stands",
            Self::Sitting => "sits",
            Self::Kneeling => "kneels",
            Self::Squatting => "squats",
            Self::Leaning => "leans",
            Self::Lounging => "lounges",
            Self::Slumped => "slumps",
            Self::Sprawled => "sprawls out",
            Self::Prone => "lies prone",
            Self::Prostrate => "drops prostrate",
            Self::Climbing => "begins climbing",
            Self::Swimming => "begins swimming",
            Self::Floating => "floats",
            Self::Flying => "takes flight",
        }
    }
}

impl core::fmt::Display for PositionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Spatial relationship between a posture and its target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum PositionModifier {
    /// No relationship; the target, if any, is just nearby.
    #[default]
    None,
    /// Resting on top of the target.
    On,
    /// Inside the target.
    In,
    /// Beneath the target.
    Under,
    /// Behind the target.
    Behind,
    /// Surrounding the target.
    Around,
}

impl PositionModifier {
    /// The preposition used when describing the relationship.
    pub const fn preposition(self) -> &'static str {
        match self {
            Self::None => "by",
            Self::On => "on",
            Self::In => "in",
            Self::Under => "under",
            Self::Behind => "behind",
            Self::Around => "around",
        }
    }

    /// Whether the modifier places the character in or on its target.
    pub const fn is_in_or_on(self) -> bool {
        matches!(self, Self::In | Self::On)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kneeling_crawls_when_moving() {
        assert_eq!(
            PositionState::Kneeling.transition_on_movement(),
            Some(PositionState::Prostrate)
        );
        assert_eq!(PositionState::Standing.transition_on_movement(), None);
    }

    #[test]
    fn seated_postures_are_restricted() {
        assert_eq!(
            PositionState::Sitting.move_restriction(),
            MoveRestriction::Restricted
        );
        assert_eq!(
            PositionState::Leaning.move_restriction(),
            MoveRestriction::FreeIfNotInOn
        );
        assert_eq!(PositionState::Prone.move_restriction(), MoveRestriction::Free);
    }

    #[test]
    fn standing_up_from_prone_is_up() {
        assert_eq!(
            PositionState::Prone.direction_to(PositionState::Standing),
            PostureDirection::Up
        );
        assert_eq!(
            PositionState::Standing.direction_to(PositionState::Sitting),
            PostureDirection::Down
        );
        assert_eq!(
            PositionState::Prone.direction_to(PositionState::Prostrate),
            PostureDirection::Level
        );
    }

    #[test]
    fn only_vertical_postures_are_upright() {
        let upright: Vec<PositionState> = PositionState::ALL
            .iter()
            .copied()
            .filter(|p| p.upright())
            .collect();
        assert!(upright.contains(&PositionState::Standing));
        assert!(!upright.contains(&PositionState::Kneeling));
        assert!(!upright.contains(&PositionState::Prone));
    }

    #[test]
    fn lying_postures_need_no_capability() {
        assert_eq!(PositionState::Prostrate.class(), PostureClass::Lying);
        assert_eq!(PositionState::Kneeling.class(), PostureClass::Kneeling);
        assert_eq!(PositionState::Squatting.class(), PostureClass::Standing);
    }

    #[test]
    fn in_and_on_are_enclosing_modifiers() {
        assert!(PositionModifier::On.is_in_or_on());
        assert!(PositionModifier::In.is_in_or_on());
        assert!(!PositionModifier::Behind.is_in_or_on());
        assert_eq!(PositionModifier::default(), PositionModifier::None);
    }
}
