//! Engine binary for Somatic.
//!
//! Wires the starting world, the opening cast and a scripted scene into
//! the run loop, then runs until the step limit, an empty world, or
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `somatic-config.yaml` (or `SOMATIC_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the starting world map
//! 4. Build the engine with a seeded skill-check oracle
//! 5. Spawn the cast
//! 6. Build the opening scene
//! 7. Create operator state and hook Ctrl-C to a clean stop
//! 8. Run the simulation loop
//! 9. Log the result

mod error;
mod log_callback;
mod scene;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use somatic_character::RollUnderOracle;
use somatic_core::config::SimulationConfig;
use somatic_core::engine::Engine;
use somatic_core::operator::OperatorState;
use somatic_core::runner;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_callback::LogCallback;
use crate::spawner::CastConfig;

/// Environment variable naming an alternative config file.
const CONFIG_ENV_VAR: &str = "SOMATIC_CONFIG";

/// Config file used when `SOMATIC_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "somatic-config.yaml";

/// Steps between progress lines.
const REPORT_EVERY: u64 = 10;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report afterwards.
    let path = config_path();
    let config = load_config(&path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("somatic-engine starting");
    if path.exists() {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        game_ms_per_tick = config.world.game_ms_per_tick,
        "World settings"
    );

    // 3. Create the starting world.
    let (world, rooms) = somatic_world::create_starting_world()?;
    info!(rooms = world.room_count(), "Starting world created");

    // 4. Build the engine.
    let oracle = Box::new(RollUnderOracle::seeded(config.world.seed));
    let mut engine = Engine::from_config(&config, world, oracle)?;

    // 5. Spawn the cast.
    let cast_config = load_cast_config(&path)?;
    let cast = spawner::spawn_cast(&cast_config, &mut engine, &rooms)?;
    info!(cast = cast.len(), "Cast spawned");

    // 6. Build the opening scene.
    let mut script = scene::opening_scene(&cast);

    // 7. Create operator state.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    let stopper = Arc::clone(&operator);
    let _ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after this step");
                stopper.request_stop();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });

    // 8. Run.
    let mut callback = LogCallback::new(REPORT_EVERY);
    let result =
        runner::run_simulation(&mut engine, &mut script, &operator, &mut callback).await?;

    // 9. Report.
    runner::log_simulation_end(&result);
    info!(
        refused_total = callback.refused_total(),
        remaining_characters = engine.realm().roster().len(),
        "somatic-engine finished"
    );

    Ok(())
}

/// The config file to read: `SOMATIC_CONFIG` if set, else the default.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.world.apply_env_overrides();
        Ok(config)
    }
}

/// Load the cast from the `cast` section of the config file.
///
/// A missing file or a missing `cast` key gives the default cast.
fn load_cast_config(path: &Path) -> Result<CastConfig, EngineError> {
    if !path.exists() {
        return Ok(CastConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Cast {
        message: format!("failed to read config file: {e}"),
    })?;
    parse_cast_config(&contents)
}

fn parse_cast_config(contents: &str) -> Result<CastConfig, EngineError> {
    if contents.trim().is_empty() {
        return Ok(CastConfig::default());
    }

    // Parse the full YAML and extract just the "cast" section.
    let raw: serde_yml::Value = serde_yml::from_str(contents).map_err(|e| EngineError::Cast {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("cast").map_or_else(
        || Ok(CastConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Cast {
                message: format!("failed to parse cast config: {e}"),
            })
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::spawner::StartingRoom;

    #[test]
    fn missing_cast_section_gives_default_cast() {
        let cast = parse_cast_config("world:\n  seed: 1\n").unwrap();
        assert_eq!(cast, CastConfig::default());
        assert_eq!(parse_cast_config("").unwrap(), CastConfig::default());
    }

    #[test]
    fn cast_section_is_read() {
        let yaml = "world:\n  seed: 1\ncast:\n  members:\n    - name: Solo\n      room: river\n";
        let cast = parse_cast_config(yaml).unwrap();
        assert_eq!(cast.members.len(), 1);
        assert_eq!(cast.members.first().map(|m| m.room), Some(StartingRoom::River));
    }

    #[test]
    fn malformed_cast_section_is_an_error() {
        let yaml = "cast:\n  members:\n    - room: river\n";
        assert!(matches!(parse_cast_config(yaml), Err(EngineError::Cast { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = Path::new("/nonexistent/somatic-config.yaml");
        assert_eq!(load_cast_config(path).unwrap(), CastConfig::default());
        assert!(load_config(path).is_ok());
    }

    #[test]
    fn project_config_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(DEFAULT_CONFIG_PATH);
        if path.exists() {
            assert!(load_config(&path).is_ok());
            let cast = load_cast_config(&path).unwrap();
            assert!(!cast.members.is_empty());
        }
    }
}
