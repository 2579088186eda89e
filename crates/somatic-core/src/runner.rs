//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives [`Engine::run_step`] once per tick interval,
//! pulling each step's commands from a [`CommandSource`], until the step
//! limit is reached, the world empties, or an operator stops it.

use std::sync::Arc;

use tracing::info;

use crate::command::CommandSource;
use crate::engine::{Engine, StepSummary};
use crate::error::CoreError;
use crate::operator::{OperatorState, SimulationEndReason};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying engine error.
        #[from]
        source: CoreError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last step summary, if any step completed.
    pub final_summary: Option<StepSummary>,
    /// Total number of steps executed.
    pub total_ticks: u64,
}

/// Callback invoked after each step completes.
pub trait StepCallback: Send {
    /// Called after a step completes successfully.
    fn on_step(&mut self, summary: &StepSummary, engine: &Engine);
}

/// A no-op step callback.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _engine: &Engine) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails on an invariant violation or
/// the command source fails.
pub async fn run_simulation(
    engine: &mut Engine,
    commands: &mut dyn CommandSource,
    operator: &Arc<OperatorState>,
    callback: &mut dyn StepCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<StepSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        characters = engine.realm().roster().len(),
        "Simulation starting"
    );

    loop {
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Simulation resumed");
        }

        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::OperatorStop,
                final_summary: last_summary,
                total_ticks,
            });
        }

        let tick = engine.clock().tick().saturating_add(1);
        let issued = commands
            .commands_for(tick)
            .map_err(CoreError::from)?;
        let summary = engine.run_step(issued)?;
        total_ticks = total_ticks.saturating_add(1);

        callback.on_step(&summary, engine);

        if summary.characters == 0 {
            info!(tick = summary.tick, "No characters left in the world");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::Depopulated,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);

        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the simulation end.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_characters = result.final_summary.as_ref().map(|s| s.characters),
        "Simulation ended"
    );
}
