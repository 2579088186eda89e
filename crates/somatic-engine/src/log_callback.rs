//! Step callback that reports the run through tracing.

use somatic_core::engine::{Engine, StepSummary};
use somatic_core::runner::StepCallback;
use tracing::{debug, info};

/// Logs a summary line every `every` steps, and any step where something
/// happened at debug level.
pub struct LogCallback {
    every: u64,
    refused_total: u64,
}

impl LogCallback {
    /// Report every `every` steps (0 disables the periodic line).
    pub const fn new(every: u64) -> Self {
        Self {
            every,
            refused_total: 0,
        }
    }

    /// Refused commands seen so far.
    pub const fn refused_total(&self) -> u64 {
        self.refused_total
    }

    const fn is_report_tick(&self, tick: u64) -> bool {
        matches!(tick.checked_rem(self.every), Some(0))
    }
}

const fn eventful(summary: &StepSummary) -> bool {
    summary.commands_done > 0
        || summary.commands_refused > 0
        || summary.arrivals > 0
        || summary.landings > 0
}

impl StepCallback for LogCallback {
    fn on_step(&mut self, summary: &StepSummary, engine: &Engine) {
        self.refused_total = self
            .refused_total
            .saturating_add(u64::from(summary.commands_refused));

        if eventful(summary) {
            debug!(
                tick = summary.tick,
                done = summary.commands_done,
                refused = summary.commands_refused,
                arrivals = summary.arrivals,
                landings = summary.landings,
                "Step"
            );
        }

        if self.is_report_tick(summary.tick) {
            info!(
                tick = summary.tick,
                game_ms = summary.now_ms,
                characters = summary.characters,
                fights = engine.realm().combats().len(),
                pending_events = engine.scheduler().len(),
                refused_total = self.refused_total,
                "Progress"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use somatic_character::ScriptedOracle;
    use somatic_core::config::SimulationConfig;
    use somatic_types::Outcome;
    use somatic_world::create_starting_world;

    use super::*;

    fn engine() -> Engine {
        let (world, _ids) = create_starting_world().unwrap();
        let oracle = Box::new(ScriptedOracle::new(Outcome::Pass));
        Engine::from_config(&SimulationConfig::default(), world, oracle).unwrap()
    }

    #[test]
    fn report_ticks_follow_the_period() {
        let cb = LogCallback::new(10);
        assert!(!cb.is_report_tick(9));
        assert!(cb.is_report_tick(10));
        assert!(cb.is_report_tick(20));
        assert!(!LogCallback::new(0).is_report_tick(10));
    }

    #[test]
    fn quiet_step_is_not_eventful() {
        assert!(!eventful(&StepSummary::default()));
        let summary = StepSummary {
            arrivals: 1,
            ..StepSummary::default()
        };
        assert!(eventful(&summary));
    }

    #[test]
    fn accumulates_refusals() {
        let engine = engine();
        let mut cb = LogCallback::new(0);
        let summary = StepSummary {
            tick: 1,
            commands_refused: 2,
            ..StepSummary::default()
        };
        cb.on_step(&summary, &engine);
        cb.on_step(&summary, &engine);
        assert_eq!(cb.refused_total(), 4);
    }
}
