//! Skill-check oracle: graded outcomes for actions that can go wrong.
//!
//! Every risky action (climbing, staying afloat, crutch-walking, spotting an
//! ambusher) asks a [`SkillCheckOracle`] for an [`Outcome`]. The oracle is a
//! trait so the engine can run on real dice ([`RollUnderOracle`]) while
//! tests script exact outcomes ([`ScriptedOracle`]).
//!
//! Target numbers run 0--100. A character's skill in the checked ability is
//! shifted by the difficulty, ten points per grade either side of `Normal`.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use somatic_types::{CharacterId, CheckResult, CheckType, Difficulty, Outcome};
use tracing::debug;

/// Answers skill checks.
pub trait SkillCheckOracle: core::fmt::Debug + Send {
    /// Target number for a check, without rolling.
    fn target_number(&self, skill: f64, check: CheckType, difficulty: Difficulty) -> f64;

    /// Roll a check.
    fn check(
        &mut self,
        actor: CharacterId,
        skill: f64,
        check: CheckType,
        difficulty: Difficulty,
    ) -> CheckResult;

    /// Roll once and grade the roll against every difficulty, easiest
    /// first.
    fn check_against_all_difficulties(
        &mut self,
        actor: CharacterId,
        skill: f64,
        check: CheckType,
    ) -> Vec<(Difficulty, CheckResult)>;

    /// Whether the check cannot possibly succeed.
    fn would_be_abject_failure(&self, skill: f64, check: CheckType, difficulty: Difficulty) -> bool {
        self.target_number(skill, check, difficulty) <= 0.0
    }
}

/// Target number for `skill` at `difficulty`, clamped to 0--100.
pub fn target_number(skill: f64, difficulty: Difficulty) -> f64 {
    let modifier = match difficulty {
        Difficulty::Automatic => return 100.0,
        Difficulty::Impossible => return 0.0,
        Difficulty::Trivial => 40.0,
        Difficulty::ExtremelyEasy => 30.0,
        Difficulty::VeryEasy => 20.0,
        Difficulty::Easy => 10.0,
        Difficulty::Normal => 0.0,
        Difficulty::Hard => -10.0,
        Difficulty::VeryHard => -20.0,
        Difficulty::ExtremelyHard => -30.0,
        Difficulty::Insane => -40.0,
    };
    let skill = if skill.is_finite() { skill } else { 0.0 };
    (skill + modifier).clamp(0.0, 100.0)
}

/// Grade a roll against a target number. Lower rolls are better.
pub fn grade(roll: f64, target_number: f64, difficulty: Difficulty) -> Outcome {
    match difficulty {
        Difficulty::Automatic => return Outcome::MajorPass,
        Difficulty::Impossible => return Outcome::MajorFail,
        _ => {}
    }
    let margin = target_number - roll;
    if margin >= 30.0 {
        Outcome::MajorPass
    } else if margin >= 10.0 {
        Outcome::Pass
    } else if margin >= 0.0 {
        Outcome::MinorPass
    } else if margin > -10.0 {
        Outcome::MinorFail
    } else if margin > -30.0 {
        Outcome::Fail
    } else {
        Outcome::MajorFail
    }
}

/// Percentile dice: roll 1--100 and compare with the target number.
#[derive(Debug, Clone)]
pub struct RollUnderOracle {
    rng: SmallRng,
}

impl RollUnderOracle {
    /// Create an oracle with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create an oracle seeded from the thread generator.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    fn roll(&mut self) -> f64 {
        f64::from(self.rng.random_range(1_u32..=100))
    }
}

impl SkillCheckOracle for RollUnderOracle {
    fn target_number(&self, skill: f64, _check: CheckType, difficulty: Difficulty) -> f64 {
        target_number(skill, difficulty)
    }

    fn check(
        &mut self,
        actor: CharacterId,
        skill: f64,
        check: CheckType,
        difficulty: Difficulty,
    ) -> CheckResult {
        let tn = target_number(skill, difficulty);
        let roll = self.roll();
        let outcome = grade(roll, tn, difficulty);
        debug!(character = %actor, ?check, ?difficulty, tn, roll, ?outcome, "skill check");
        CheckResult {
            outcome,
            target_number: tn,
        }
    }

    fn check_against_all_difficulties(
        &mut self,
        actor: CharacterId,
        skill: f64,
        check: CheckType,
    ) -> Vec<(Difficulty, CheckResult)> {
        let roll = self.roll();
        debug!(character = %actor, ?check, roll, "skill check against all difficulties");
        Difficulty::ALL
            .iter()
            .map(|difficulty| {
                let tn = target_number(skill, *difficulty);
                (
                    *difficulty,
                    CheckResult {
                        outcome: grade(roll, tn, *difficulty),
                        target_number: tn,
                    },
                )
            })
            .collect()
    }
}

/// Returns queued outcomes in order, then a fixed default.
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    queue: VecDeque<Outcome>,
    fallback: Outcome,
    target_number: f64,
    abject: bool,
}

impl ScriptedOracle {
    /// Every check returns `fallback` until outcomes are queued.
    pub const fn new(fallback: Outcome) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
            target_number: 50.0,
            abject: false,
        }
    }

    /// An oracle under which everything succeeds.
    pub const fn always_pass() -> Self {
        Self::new(Outcome::Pass)
    }

    /// Queue outcomes to be returned before the fallback.
    #[must_use]
    pub fn then(mut self, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        self.queue.extend(outcomes);
        self
    }

    /// Report this target number for every check.
    #[must_use]
    pub const fn with_target_number(mut self, target_number: f64) -> Self {
        self.target_number = target_number;
        self
    }

    /// Report every check as an abject failure.
    #[must_use]
    pub const fn abject(mut self) -> Self {
        self.abject = true;
        self.target_number = 0.0;
        self
    }

    fn pop(&mut self) -> Outcome {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

impl SkillCheckOracle for ScriptedOracle {
    fn target_number(&self, _skill: f64, _check: CheckType, _difficulty: Difficulty) -> f64 {
        self.target_number
    }

    fn check(
        &mut self,
        _actor: CharacterId,
        _skill: f64,
        _check: CheckType,
        _difficulty: Difficulty,
    ) -> CheckResult {
        CheckResult {
            outcome: self.pop(),
            target_number: self.target_number,
        }
    }

    fn check_against_all_difficulties(
        &mut self,
        _actor: CharacterId,
        _skill: f64,
        _check: CheckType,
    ) -> Vec<(Difficulty, CheckResult)> {
        let outcome = self.pop();
        Difficulty::ALL
            .iter()
            .map(|difficulty| {
                (
                    *difficulty,
                    CheckResult {
                        outcome,
                        target_number: self.target_number,
                    },
                )
            })
            .collect()
    }

    fn would_be_abject_failure(
        &self,
        _skill: f64,
        _check: CheckType,
        _difficulty: Difficulty,
    ) -> bool {
        self.abject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_shifts_target_number() {
        assert!((target_number(50.0, Difficulty::Normal) - 50.0).abs() < f64::EPSILON);
        assert!((target_number(50.0, Difficulty::Hard) - 40.0).abs() < f64::EPSILON);
        assert!((target_number(80.0, Difficulty::Trivial) - 100.0).abs() < f64::EPSILON);
        assert!(target_number(10.0, Difficulty::Insane).abs() < f64::EPSILON);
        assert!(target_number(100.0, Difficulty::Impossible).abs() < f64::EPSILON);
    }

    #[test]
    fn margins_grade_outcomes() {
        assert_eq!(grade(10.0, 50.0, Difficulty::Normal), Outcome::MajorPass);
        assert_eq!(grade(35.0, 50.0, Difficulty::Normal), Outcome::Pass);
        assert_eq!(grade(50.0, 50.0, Difficulty::Normal), Outcome::MinorPass);
        assert_eq!(grade(55.0, 50.0, Difficulty::Normal), Outcome::MinorFail);
        assert_eq!(grade(70.0, 50.0, Difficulty::Normal), Outcome::Fail);
        assert_eq!(grade(95.0, 50.0, Difficulty::Normal), Outcome::MajorFail);
        assert_eq!(grade(1.0, 100.0, Difficulty::Impossible), Outcome::MajorFail);
        assert_eq!(grade(100.0, 0.0, Difficulty::Automatic), Outcome::MajorPass);
    }

    #[test]
    fn one_roll_grades_monotonically() {
        let mut oracle = RollUnderOracle::seeded(7);
        let graded =
            oracle.check_against_all_difficulties(CharacterId::new(), 50.0, CheckType::LandFall);
        assert_eq!(graded.len(), Difficulty::ALL.len());
        for pair in graded.windows(2) {
            if let [(_, easier), (_, harder)] = pair {
                assert!(easier.outcome >= harder.outcome);
            }
        }
    }

    #[test]
    fn scripted_oracle_replays_queue_then_falls_back() {
        let mut oracle = ScriptedOracle::new(Outcome::Pass).then([Outcome::MajorFail]);
        let id = CharacterId::new();
        let first = oracle.check(id, 0.0, CheckType::Climb, Difficulty::Normal);
        let second = oracle.check(id, 0.0, CheckType::Climb, Difficulty::Normal);
        assert_eq!(first.outcome, Outcome::MajorFail);
        assert_eq!(second.outcome, Outcome::Pass);
    }

    #[test]
    fn abject_failure_follows_target_number() {
        let oracle = RollUnderOracle::seeded(1);
        assert!(oracle.would_be_abject_failure(5.0, CheckType::StayAfloat, Difficulty::Insane));
        assert!(!oracle.would_be_abject_failure(50.0, CheckType::StayAfloat, Difficulty::Normal));
        assert!(ScriptedOracle::always_pass().abject().would_be_abject_failure(
            100.0,
            CheckType::StayAfloat,
            Difficulty::Trivial
        ));
    }
}
