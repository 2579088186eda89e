//! Stamina ledger, exertion tracking and the shared cost formulas.
//!
//! Every action that costs stamina (moving, standing up, flying, swimming,
//! climbing, dragging) prices itself through the functions in this module
//! and pays through [`Stamina::spend`]. The ledger keeps
//! `0 <= current <= maximum` at every observation point: costs are checked
//! before they are applied, and both `spend` and `gain` clamp.
//!
//! Exertion is derived from how much has been spent inside a sliding
//! window. It is never a gate, only an input to regeneration and speed.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use somatic_types::ExertionLevel;
use tracing::warn;

use crate::config::{ExertionThresholds, StaminaConfig};

/// A character's stamina pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamina {
    /// Current stamina.
    current: f64,
    /// Maximum stamina.
    maximum: f64,
    /// Recent spends as `(game ms, amount)`, oldest first.
    recent: VecDeque<(u64, f64)>,
    /// Exertion derived from the recent spend rate.
    exertion: ExertionLevel,
    /// Slow-moving exertion, updated on the long heartbeat.
    longterm: ExertionLevel,
}

impl Stamina {
    /// Create a full ledger with the given maximum.
    ///
    /// A non-finite or negative maximum is treated as zero.
    pub fn new(maximum: f64) -> Self {
        let maximum = sanitize(maximum, "maximum");
        Self {
            current: maximum,
            maximum,
            recent: VecDeque::new(),
            exertion: ExertionLevel::Normal,
            longterm: ExertionLevel::Normal,
        }
    }

    /// Current stamina.
    pub const fn current(&self) -> f64 {
        self.current
    }

    /// Maximum stamina.
    pub const fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Current stamina as a fraction of the maximum (zero when the maximum
    /// is zero).
    pub fn fraction(&self) -> f64 {
        if self.maximum > 0.0 {
            self.current / self.maximum
        } else {
            0.0
        }
    }

    /// Current exertion level.
    pub const fn exertion(&self) -> ExertionLevel {
        self.exertion
    }

    /// Long-term exertion level.
    pub const fn longterm_exertion(&self) -> ExertionLevel {
        self.longterm
    }

    /// Whether `amount` can be paid in full.
    pub fn can_spend(&self, amount: f64) -> bool {
        amount.is_finite() && amount >= 0.0 && amount <= self.current
    }

    /// Spend up to `amount` at game time `now_ms`, returning what was
    /// actually deducted.
    pub fn spend(&mut self, amount: f64, now_ms: u64) -> f64 {
        let amount = sanitize(amount, "spend");
        let applied = amount.min(self.current);
        self.current = (self.current - applied).max(0.0);
        if applied > 0.0 {
            self.recent.push_back((now_ms, applied));
        }
        applied
    }

    /// Gain up to `amount`, returning what was actually added.
    pub fn gain(&mut self, amount: f64) -> f64 {
        let amount = sanitize(amount, "gain");
        let applied = amount.min(self.maximum - self.current).max(0.0);
        self.current = (self.current + applied).min(self.maximum);
        applied
    }

    /// Change the maximum, clamping current stamina to it.
    pub fn set_maximum(&mut self, maximum: f64) {
        self.maximum = sanitize(maximum, "maximum");
        self.current = self.current.min(self.maximum);
    }

    /// Recompute exertion from spends inside the window ending at `now_ms`.
    pub fn update_exertion(&mut self, now_ms: u64, config: &StaminaConfig) -> ExertionLevel {
        let cutoff = now_ms.saturating_sub(config.exertion_window_ms);
        while self.recent.front().is_some_and(|(at, _)| *at < cutoff) {
            self.recent.pop_front();
        }
        let spent: f64 = self.recent.iter().map(|(_, amount)| amount).sum();
        let rate = if self.maximum > 0.0 {
            spent / self.maximum
        } else {
            0.0
        };
        self.exertion = exertion_for_rate(rate, &config.exertion_thresholds);
        self.exertion
    }

    /// Move long-term exertion one grade toward current exertion.
    pub fn update_longterm(&mut self) -> ExertionLevel {
        let current = self.exertion as usize;
        let longterm = self.longterm as usize;
        let next = match current.cmp(&longterm) {
            core::cmp::Ordering::Greater => longterm.saturating_add(1),
            core::cmp::Ordering::Less => longterm.saturating_sub(1),
            core::cmp::Ordering::Equal => longterm,
        };
        self.longterm = ExertionLevel::ALL
            .get(next)
            .copied()
            .unwrap_or(self.longterm);
        self.longterm
    }

    /// Regenerate for one short heartbeat, scaled by exertion. Returns the
    /// amount gained.
    pub fn regenerate(&mut self, config: &StaminaConfig) -> f64 {
        let amount = self.maximum * config.regen_fraction * self.exertion.regeneration_factor();
        self.gain(amount)
    }
}

/// Treat negative, NaN and infinite inputs as zero, with a warning.
fn sanitize(amount: f64, what: &'static str) -> f64 {
    if amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        warn!(amount, what, "clamped invalid stamina input to zero");
        0.0
    }
}

/// Map a spend rate to an exertion level.
pub fn exertion_for_rate(rate: f64, thresholds: &ExertionThresholds) -> ExertionLevel {
    if rate <= 0.0 {
        ExertionLevel::Rest
    } else if rate >= thresholds.extremely_heavy {
        ExertionLevel::ExtremelyHeavy
    } else if rate >= thresholds.very_heavy {
        ExertionLevel::VeryHeavy
    } else if rate >= thresholds.heavy {
        ExertionLevel::Heavy
    } else if rate >= thresholds.moderate {
        ExertionLevel::Moderate
    } else if rate >= thresholds.low {
        ExertionLevel::Low
    } else {
        ExertionLevel::Normal
    }
}

// ---------------------------------------------------------------------------
// Cost formulas
// ---------------------------------------------------------------------------

/// Stamina multiplier for dragging `dragged_weight` with `capacity`.
///
/// Ranges from the base multiplier (2.0) for a weightless load to
/// base + load multiplier (2.5) at or beyond full capacity.
pub fn drag_multiplier(config: &StaminaConfig, dragged_weight: f64, capacity: f64) -> f64 {
    let load = if capacity > 0.0 {
        (dragged_weight / capacity).clamp(0.0, 1.0)
    } else {
        1.0
    };
    config
        .drag_load_multiplier
        .mul_add(load, config.drag_base_multiplier)
}

/// Cost multiplier derived from a skill-check target number (0--100).
///
/// Lower skill means a higher multiplier: `100 / tn`, with the target
/// number floored at 0.1 and the result capped at the configured maximum.
pub fn skill_cost_multiplier(config: &StaminaConfig, target_number: f64) -> f64 {
    let tn = if target_number.is_finite() {
        target_number.max(0.1)
    } else {
        0.1
    };
    (100.0 / tn).min(config.max_skill_multiplier)
}

/// Cost of crossing an exit.
///
/// `base * posture_multiplier * (1 + encumbrance * factor) * drag`, where
/// `drag` is 1.0 when nothing is being dragged.
pub fn movement_cost(
    config: &StaminaConfig,
    base: f64,
    posture_multiplier: f64,
    encumbrance: f64,
    drag: f64,
) -> f64 {
    base * posture_multiplier * encumbrance.mul_add(config.encumbrance_cost_factor, 1.0) * drag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn spend_clamps_at_zero() {
        let mut s = Stamina::new(10.0);
        assert!(approx(s.spend(4.0, 0), 4.0));
        assert!(approx(s.spend(100.0, 0), 6.0));
        assert!(approx(s.current(), 0.0));
        assert!(!s.can_spend(0.5));
        assert!(s.can_spend(0.0));
    }

    #[test]
    fn gain_clamps_at_maximum() {
        let mut s = Stamina::new(10.0);
        s.spend(3.0, 0);
        assert!(approx(s.gain(50.0), 3.0));
        assert!(approx(s.current(), 10.0));
    }

    #[test]
    fn invalid_amounts_do_nothing() {
        let mut s = Stamina::new(10.0);
        assert!(approx(s.spend(-5.0, 0), 0.0));
        assert!(approx(s.gain(f64::NAN), 0.0));
        assert!(approx(s.current(), 10.0));
        assert!(!s.can_spend(f64::INFINITY));
        assert!(!s.can_spend(-1.0));
    }

    #[test]
    fn ledger_stays_in_bounds_under_any_sequence() {
        let mut s = Stamina::new(20.0);
        let ops = [7.5, -3.0, 12.0, 40.0, 0.25, -100.0, 19.0, 1.0e9, -1.0e9];
        for (i, amount) in ops.iter().enumerate() {
            if i % 2 == 0 {
                s.spend(*amount, 0);
            } else {
                s.gain(*amount);
            }
            assert!(s.current() >= 0.0 && s.current() <= s.maximum());
        }
        s.set_maximum(5.0);
        assert!(s.current() <= 5.0);
    }

    #[test]
    fn exertion_follows_spend_rate() {
        let config = StaminaConfig::default();
        let mut s = Stamina::new(100.0);
        assert_eq!(s.update_exertion(1_000, &config), ExertionLevel::Rest);
        s.spend(3.0, 1_000);
        assert_eq!(s.update_exertion(1_000, &config), ExertionLevel::Low);
        s.spend(30.0, 2_000);
        assert_eq!(s.update_exertion(2_000, &config), ExertionLevel::VeryHeavy);
        // Everything ages out of the window.
        assert_eq!(s.update_exertion(200_000, &config), ExertionLevel::Rest);
    }

    #[test]
    fn longterm_moves_one_grade_at_a_time() {
        let config = StaminaConfig::default();
        let mut s = Stamina::new(100.0);
        s.spend(50.0, 0);
        s.update_exertion(0, &config);
        assert_eq!(s.exertion(), ExertionLevel::ExtremelyHeavy);
        assert_eq!(s.update_longterm(), ExertionLevel::Low);
        assert_eq!(s.update_longterm(), ExertionLevel::Moderate);
    }

    #[test]
    fn regeneration_slows_under_exertion() {
        let config = StaminaConfig::default();
        let mut rested = Stamina::new(100.0);
        rested.spend(50.0, 0);
        rested.update_exertion(1_000_000, &config);
        let mut strained = Stamina::new(100.0);
        strained.spend(50.0, 0);
        strained.update_exertion(0, &config);
        assert!(rested.regenerate(&config) > strained.regenerate(&config));
    }

    #[test]
    fn drag_multiplier_spans_two_to_two_and_a_half() {
        let config = StaminaConfig::default();
        assert!(approx(drag_multiplier(&config, 0.0, 50.0), 2.0));
        assert!(approx(drag_multiplier(&config, 25.0, 50.0), 2.25));
        assert!(approx(drag_multiplier(&config, 500.0, 50.0), 2.5));
    }

    #[test]
    fn skill_multiplier_is_capped() {
        let config = StaminaConfig::default();
        assert!(approx(skill_cost_multiplier(&config, 100.0), 1.0));
        assert!(approx(skill_cost_multiplier(&config, 50.0), 2.0));
        assert!(approx(skill_cost_multiplier(&config, 0.0), 1000.0));
        assert!(approx(skill_cost_multiplier(&config, 0.01), 1000.0));
    }

    #[test]
    fn encumbrance_raises_movement_cost() {
        let config = StaminaConfig::default();
        let light = movement_cost(&config, 1.0, 1.0, 0.0, 1.0);
        let heavy = movement_cost(&config, 1.0, 1.0, 0.5, 1.0);
        assert!(approx(light, 1.0));
        assert!(approx(heavy, 1.5));
        assert!(approx(movement_cost(&config, 1.0, 1.0, 0.0, 2.0), 2.0));
    }
}
