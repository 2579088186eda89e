//! Error types for the somatic-character crate.
//!
//! [`CharacterError`] is reserved for invariant violations and lookups that
//! should never fail. Expected gameplay failures are refusals (see
//! [`crate::refusal`]) and never surface here.

use somatic_types::{CharacterId, CombatId, Consciousness, RoomId};
use somatic_world::WorldError;
use tracing::error;

/// Errors that can occur during character state operations.
#[derive(Debug, thiserror::Error)]
pub enum CharacterError {
    /// Character with the given ID was not found in the roster.
    #[error("character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// A character with this ID is already in the roster.
    #[error("duplicate character: {0}")]
    DuplicateCharacter(CharacterId),

    /// Combat with the given ID was not found in the registry.
    #[error("combat not found: {0}")]
    CombatNotFound(CombatId),

    /// The character's own room does not list it as an occupant.
    #[error("character {character} is not present in its own room {room}")]
    NotInOwnRoom {
        /// The character.
        character: CharacterId,
        /// The room the character believes it is in.
        room: RoomId,
    },

    /// A dead character was given a living state.
    #[error("character {character} is dead and cannot become {requested:?}")]
    DeadCannotRevive {
        /// The dead character.
        character: CharacterId,
        /// The consciousness that was requested.
        requested: Consciousness,
    },

    /// A world-graph operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

impl CharacterError {
    /// Report an invariant violation.
    ///
    /// Logs at `error`, trips a debug assertion so development builds halt
    /// on the spot, and hands the error back for propagation so release
    /// builds degrade to a failed no-op.
    #[allow(clippy::assertions_on_constants)]
    pub fn violation(self) -> Self {
        error!(error = %self, "invariant violation");
        debug_assert!(false, "invariant violation: {self}");
        self
    }
}
