//! Operator control state for a running simulation.
//!
//! Shared between the run loop and whatever drives it from outside (a
//! signal handler, an admin console). Control fields are atomics so the
//! loop reads them without locking; pausing parks the loop on a
//! [`Notify`] until resumed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

use crate::config::SimulationBoundsConfig;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// An operator issued a stop command.
    OperatorStop,
    /// Every character has left the world.
    Depopulated,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    paused: AtomicBool,
    resume_notify: Notify,
    stop_requested: AtomicBool,
    tick_interval_ms: AtomicU64,
    max_ticks: u64,
}

impl OperatorState {
    /// Create operator state from configuration.
    pub fn new(tick_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            max_ticks: bounds.max_ticks,
        }
    }

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the simulation is no longer paused.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    /// Request a clean stop before the next step.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // A paused loop must wake to see the stop.
        self.resume();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Real milliseconds between steps.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the real time between steps. Returns the previous value.
    pub fn set_tick_interval_ms(&self, ms: u64) -> u64 {
        self.tick_interval_ms.swap(ms, Ordering::AcqRel)
    }

    /// Maximum steps (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether `current_tick` is at or past the step limit.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn bounds(max_ticks: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig { max_ticks }
    }

    #[test]
    fn initial_state_is_running() {
        let op = OperatorState::new(100, &bounds(10));
        assert!(!op.is_paused());
        assert!(!op.is_stop_requested());
        assert_eq!(op.tick_interval_ms(), 100);
    }

    #[test]
    fn tick_limit_zero_means_unlimited() {
        let op = OperatorState::new(100, &bounds(0));
        assert!(!op.tick_limit_reached(u64::MAX));
    }

    #[test]
    fn tick_limit_reached() {
        let op = OperatorState::new(100, &bounds(5));
        assert!(!op.tick_limit_reached(4));
        assert!(op.tick_limit_reached(5));
    }

    #[test]
    fn set_tick_interval_returns_previous() {
        let op = OperatorState::new(100, &bounds(0));
        assert_eq!(op.set_tick_interval_ms(250), 100);
        assert_eq!(op.tick_interval_ms(), 250);
    }

    #[tokio::test]
    async fn stop_wakes_a_paused_loop() {
        let op = Arc::new(OperatorState::new(0, &bounds(0)));
        op.pause();
        let waiter = Arc::clone(&op);
        let handle = tokio::spawn(async move { waiter.wait_if_paused().await });
        op.request_stop();
        assert!(handle.await.is_ok());
        assert!(op.is_stop_requested());
        assert!(!op.is_paused());
    }
}
