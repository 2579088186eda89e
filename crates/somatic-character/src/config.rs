//! Tunable parameters for stamina, movement and combat rules.
//!
//! The engine loads these from the `stamina`, `movement` and `combat`
//! sections of the simulation YAML and hands them to the [`Realm`]. Every
//! field has a default so a partial YAML section is valid.
//!
//! [`Realm`]: crate::realm::Realm

use serde::{Deserialize, Serialize};

/// Spend-rate thresholds (fraction of maximum stamina spent within the
/// exertion window) at which each exertion level begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExertionThresholds {
    /// `Low` from this rate.
    pub low: f64,
    /// `Moderate` from this rate.
    pub moderate: f64,
    /// `Heavy` from this rate.
    pub heavy: f64,
    /// `VeryHeavy` from this rate.
    pub very_heavy: f64,
    /// `ExtremelyHeavy` from this rate.
    pub extremely_heavy: f64,
}

impl Default for ExertionThresholds {
    fn default() -> Self {
        Self {
            low: 0.02,
            moderate: 0.05,
            heavy: 0.10,
            very_heavy: 0.20,
            extremely_heavy: 0.35,
        }
    }
}

/// Stamina ledger and cost parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaConfig {
    /// Fraction of maximum stamina regained per short heartbeat at
    /// `Normal` exertion (default: 0.05).
    pub regen_fraction: f64,

    /// Width of the sliding window used to derive exertion, in game
    /// milliseconds (default: 60 000).
    pub exertion_window_ms: u64,

    /// Spend-rate thresholds for each exertion level.
    pub exertion_thresholds: ExertionThresholds,

    /// Base cost of crossing an exit on foot (default: 1.0).
    pub base_move_cost: f64,

    /// Extra cost per unit of encumbrance fraction (default: 1.0).
    pub encumbrance_cost_factor: f64,

    /// Cost of standing up from a lower posture (default: 0.5).
    pub posture_up_cost: f64,

    /// Base cost per flying heartbeat or flying move (default: 2.0).
    pub fly_cost: f64,

    /// Base cost per swimming heartbeat or swimming move (default: 1.5).
    pub swim_cost: f64,

    /// Base cost per climbing heartbeat or climbing move (default: 1.5).
    pub climb_cost: f64,

    /// Ceiling on the skill-derived cost multiplier (default: 1000).
    pub max_skill_multiplier: f64,

    /// Drag multiplier floor (default: 2.0).
    pub drag_base_multiplier: f64,

    /// Drag multiplier added at full carrying capacity (default: 0.5).
    pub drag_load_multiplier: f64,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            regen_fraction: 0.05,
            exertion_window_ms: 60_000,
            exertion_thresholds: ExertionThresholds::default(),
            base_move_cost: 1.0,
            encumbrance_cost_factor: 1.0,
            posture_up_cost: 0.5,
            fly_cost: 2.0,
            swim_cost: 1.5,
            climb_cost: 1.5,
            max_skill_multiplier: 1000.0,
            drag_base_multiplier: 2.0,
            drag_load_multiplier: 0.5,
        }
    }
}

/// Movement timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Time to cross an exit unencumbered and unhurt, in game
    /// milliseconds (default: 3000).
    pub base_speed_ms: f64,

    /// Extra time per unit of encumbrance fraction, as a fraction of base
    /// speed (default: 1.0).
    pub encumbrance_speed_factor: f64,

    /// Extra milliseconds per point of wound damage (default: 50).
    pub wound_penalty_ms: f64,

    /// Time multiplier added per exertion grade above `Normal`
    /// (default: 0.1).
    pub exertion_penalty: f64,

    /// Upper bound of the random tie-break jitter in milliseconds
    /// (default: 10).
    pub tiebreak_ms: f64,

    /// Time multiplier for sneaking (default: 2.0).
    pub stealth_time_multiplier: f64,

    /// Time multiplier for dragging (default: 1.5).
    pub drag_time_multiplier: f64,

    /// Damage per layer fallen, per hit (default: 8.0).
    pub fall_damage_per_layer: f64,

    /// Time spent in the air per layer fallen (default: 500).
    pub fall_ms_per_layer: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed_ms: 3000.0,
            encumbrance_speed_factor: 1.0,
            wound_penalty_ms: 50.0,
            exertion_penalty: 0.1,
            tiebreak_ms: 10.0,
            stealth_time_multiplier: 2.0,
            drag_time_multiplier: 1.5,
            fall_damage_per_layer: 8.0,
            fall_ms_per_layer: 500,
        }
    }
}

/// Combat engagement parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Difficulty grades granted to an attacker the target could not see
    /// (default: 2).
    pub ambush_bonus: u8,

    /// How long a rescued character may not re-engage its attacker, in
    /// game milliseconds (default: 15 000).
    pub rescue_cooldown_ms: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            ambush_bonus: 2,
            rescue_cooldown_ms: 15_000,
        }
    }
}

/// Every rule parameter a [`Realm`] needs.
///
/// [`Realm`]: crate::realm::Realm
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Stamina parameters.
    pub stamina: StaminaConfig,
    /// Movement parameters.
    pub movement: MovementConfig,
    /// Combat parameters.
    pub combat: CombatConfig,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RulesConfig::default();
        assert!((cfg.stamina.max_skill_multiplier - 1000.0).abs() < f64::EPSILON);
        assert!((cfg.movement.base_speed_ms - 3000.0).abs() < f64::EPSILON);
        assert_eq!(cfg.combat.ambush_bonus, 2);
    }

    #[test]
    fn thresholds_ascend() {
        let t = ExertionThresholds::default();
        assert!(t.low < t.moderate);
        assert!(t.moderate < t.heavy);
        assert!(t.heavy < t.very_heavy);
        assert!(t.very_heavy < t.extremely_heavy);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: RulesConfig =
            serde_json::from_str(r#"{"movement": {"base_speed_ms": 1500.0}}"#).unwrap();
        assert!((cfg.movement.base_speed_ms - 1500.0).abs() < f64::EPSILON);
        assert!((cfg.movement.tiebreak_ms - 10.0).abs() < f64::EPSILON);
        assert_eq!(cfg.combat, CombatConfig::default());
    }
}
