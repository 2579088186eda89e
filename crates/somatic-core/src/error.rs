//! Error types for the somatic-core crate.

use somatic_character::CharacterError;

use crate::clock::ClockError;
use crate::command::CommandError;

/// Errors that can occur while the engine processes a step.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A rules operation hit an invariant violation.
    #[error("character error: {source}")]
    Character {
        /// The underlying character error.
        #[from]
        source: CharacterError,
    },

    /// The game clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The command source failed.
    #[error("command error: {source}")]
    Command {
        /// The underlying command error.
        #[from]
        source: CommandError,
    },
}
