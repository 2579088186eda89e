//! Game clock for the Somatic engine.
//!
//! The clock counts engine steps and derives game time from them. Game
//! time is never stored independently: `now_ms = tick * game_ms_per_tick`.
//! Every derivation uses checked arithmetic.

use crate::config::WorldConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter or game time would overflow.
    #[error("clock overflow at tick {tick}")]
    Overflow {
        /// The tick that could not be advanced past.
        tick: u64,
    },

    /// Invalid time configuration (e.g. zero game time per step).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Step counter and game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    /// Steps taken so far.
    tick: u64,
    /// Game milliseconds per step.
    game_ms_per_tick: u64,
}

impl GameClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `game_ms_per_tick` is 0.
    pub fn new(config: &WorldConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, config.game_ms_per_tick)
    }

    /// Create a clock at an arbitrary tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `game_ms_per_tick` is 0 or
    /// the tick's game time does not fit in a `u64`.
    pub fn from_parts(tick: u64, game_ms_per_tick: u64) -> Result<Self, ClockError> {
        if game_ms_per_tick == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "game_ms_per_tick must be at least 1".to_owned(),
            });
        }
        if tick.checked_mul(game_ms_per_tick).is_none() {
            return Err(ClockError::InvalidConfig {
                reason: format!("tick {tick} overflows game time"),
            });
        }
        Ok(Self {
            tick,
            game_ms_per_tick,
        })
    }

    /// Advance one step. Returns the new game time.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the tick or the derived game
    /// time would exceed `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        let overflow = ClockError::Overflow { tick: self.tick };
        let next = self.tick.checked_add(1).ok_or(overflow)?;
        let now = next
            .checked_mul(self.game_ms_per_tick)
            .ok_or(ClockError::Overflow { tick: self.tick })?;
        self.tick = next;
        Ok(now)
    }

    /// Current step.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Game milliseconds per step.
    pub const fn game_ms_per_tick(&self) -> u64 {
        self.game_ms_per_tick
    }

    /// Current game time in milliseconds.
    pub const fn now_ms(&self) -> u64 {
        // Checked at construction and on every advance.
        self.tick.saturating_mul(self.game_ms_per_tick)
    }
}
