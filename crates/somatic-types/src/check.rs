//! Graded skill-check vocabulary: difficulties, outcomes and check kinds.
//!
//! The oracle that actually rolls checks lives in `somatic-character`; this
//! module only defines the shared language for asking and answering.

use serde::{Deserialize, Serialize};

/// How hard a check is, from no roll at all to no chance at all.
///
/// Declared easiest first so the derived ordering reads "harder is greater".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Always succeeds.
    Automatic,
    /// Almost nobody fails.
    Trivial,
    /// Extremely easy.
    ExtremelyEasy,
    /// Very easy.
    VeryEasy,
    /// Easy.
    Easy,
    /// The default difficulty.
    Normal,
    /// Hard.
    Hard,
    /// Very hard.
    VeryHard,
    /// Extremely hard.
    ExtremelyHard,
    /// Only masters succeed.
    Insane,
    /// Never succeeds.
    Impossible,
}

impl Difficulty {
    /// Every difficulty from easiest to hardest.
    pub const ALL: [Self; 11] = [
        Self::Automatic,
        Self::Trivial,
        Self::ExtremelyEasy,
        Self::VeryEasy,
        Self::Easy,
        Self::Normal,
        Self::Hard,
        Self::VeryHard,
        Self::ExtremelyHard,
        Self::Insane,
        Self::Impossible,
    ];

    /// Position of this difficulty within [`Difficulty::ALL`].
    pub const fn rank(self) -> usize {
        self as usize
    }

    /// The difficulty `steps` grades easier, saturating at `Automatic`.
    pub fn easier(self, steps: usize) -> Self {
        let rank = self.rank().saturating_sub(steps);
        Self::ALL.get(rank).copied().unwrap_or(Self::Automatic)
    }

    /// The difficulty `steps` grades harder, saturating at `Impossible`.
    pub fn harder(self, steps: usize) -> Self {
        let rank = self.rank().saturating_add(steps);
        Self::ALL.get(rank).copied().unwrap_or(Self::Impossible)
    }

    /// Movement time multiplier for moving through a room whose visibility
    /// check sits at this difficulty.
    pub const fn sight_speed_multiplier(self) -> f64 {
        match self {
            Self::Impossible => 3.0,
            Self::Insane => 2.5,
            Self::ExtremelyHard => 2.0,
            Self::VeryHard => 1.75,
            Self::Hard => 1.5,
            Self::Normal => 1.25,
            Self::Easy => 1.1,
            Self::VeryEasy => 1.05,
            Self::ExtremelyEasy | Self::Trivial | Self::Automatic => 1.0,
        }
    }
}

/// Graded result of a skill check.
///
/// Declared worst first so the derived ordering reads "better is greater".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// A disastrous failure.
    MajorFail,
    /// A plain failure.
    Fail,
    /// A narrow failure.
    MinorFail,
    /// A narrow success.
    MinorPass,
    /// A plain success.
    Pass,
    /// An outstanding success.
    MajorPass,
}

impl Outcome {
    /// Whether the outcome counts as a success.
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::MinorPass | Self::Pass | Self::MajorPass)
    }

    /// Whether the outcome counts as a failure.
    pub const fn is_fail(self) -> bool {
        !self.is_pass()
    }

    /// Signed degree of success: -3 (major fail) to +3 (major pass).
    pub const fn degree(self) -> i8 {
        match self {
            Self::MajorFail => -3,
            Self::Fail => -2,
            Self::MinorFail => -1,
            Self::MinorPass => 1,
            Self::Pass => 2,
            Self::MajorPass => 3,
        }
    }
}

/// The answer to a single skill check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// The graded outcome.
    pub outcome: Outcome,
    /// Percentage chance of success the roll was made against (0--100).
    pub target_number: f64,
}

/// What a check is testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckType {
    /// Climbing up or down a surface.
    Climb,
    /// Keeping one's head above water.
    StayAfloat,
    /// Propelling oneself through water.
    Swim,
    /// Sustained powered flight.
    Fly,
    /// Walking with a crutch or other aid while unable to stand unaided.
    AidedWalking,
    /// Noticing an approaching attacker.
    SpotAttacker,
    /// Picking one's way through a poorly lit room.
    Visibility,
    /// Landing a fall without breaking anything.
    LandFall,
}
