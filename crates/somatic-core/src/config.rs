//! Configuration loading and typed config structures for the Somatic engine.
//!
//! The canonical configuration lives in `somatic-config.yaml` at the project
//! root. Every section is optional; missing keys fall back to the defaults
//! below. The `stamina`, `movement` and `combat` sections deserialize
//! straight into the rule parameters of `somatic-character` and are handed
//! to the realm through [`SimulationConfig::rules`].

use std::path::Path;

use serde::Deserialize;
use somatic_character::{CombatConfig, MovementConfig, RulesConfig, StaminaConfig};
use tracing::warn;

/// Environment variable that overrides `world.seed`.
pub const SEED_ENV_VAR: &str = "SOMATIC_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `somatic-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Heartbeat periods.
    #[serde(default)]
    pub time: TimeConfig,

    /// Stamina ledger and cost parameters.
    #[serde(default)]
    pub stamina: StaminaConfig,

    /// Movement timing and fall parameters.
    #[serde(default)]
    pub movement: MovementConfig,

    /// Combat engagement parameters.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SOMATIC_SEED`, when set to an integer, overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.world.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The rule parameters for the realm.
    pub fn rules(&self) -> RulesConfig {
        RulesConfig {
            stamina: self.stamina.clone(),
            movement: self.movement.clone(),
            combat: self.combat.clone(),
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between engine steps.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Game milliseconds that pass per engine step.
    #[serde(default = "default_game_ms_per_tick")]
    pub game_ms_per_tick: u64,
}

impl WorldConfig {
    /// Apply `SOMATIC_SEED` if it is set.
    pub fn apply_env_overrides(&mut self) {
        let Ok(raw) = std::env::var(SEED_ENV_VAR) else {
            return;
        };
        match raw.trim().parse::<u64>() {
            Ok(seed) => self.seed = seed,
            Err(err) => warn!(value = %raw, error = %err, "ignoring unparsable SOMATIC_SEED"),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            game_ms_per_tick: default_game_ms_per_tick(),
        }
    }
}

/// Heartbeat configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeConfig {
    /// Period of the short heartbeat (regeneration, flight upkeep), in
    /// game milliseconds.
    #[serde(default = "default_heartbeat_short_ms")]
    pub heartbeat_short_ms: u64,

    /// Period of the long heartbeat (long-term exertion, effect expiry),
    /// in game milliseconds.
    #[serde(default = "default_heartbeat_long_ms")]
    pub heartbeat_long_ms: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_short_ms: default_heartbeat_short_ms(),
            heartbeat_long_ms: default_heartbeat_long_ms(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of engine steps before the run ends (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Somatic".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_game_ms_per_tick() -> u64 {
    1000
}

const fn default_heartbeat_short_ms() -> u64 {
    10_000
}

const fn default_heartbeat_long_ms() -> u64 {
    60_000
}

const fn default_max_ticks() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_owned()
}
