//! Observable output produced by state changes.
//!
//! The engine never renders text for players itself. Every state change
//! emits an [`Echo`] that an external renderer formats and delivers to
//! whoever is in the room.

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, RoomId};

/// A single line of observable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    /// Room in which the echo is observable.
    pub room: RoomId,
    /// Character the echo is about, if any.
    pub actor: Option<CharacterId>,
    /// Third-person description of what happened.
    pub text: String,
}

impl Echo {
    /// Build an echo about `actor` in `room`.
    pub fn about(room: RoomId, actor: CharacterId, text: impl Into<String>) -> Self {
        Self {
            room,
            actor: Some(actor),
            text: text.into(),
        }
    }

    /// Build an echo that is not attributed to any character.
    pub fn ambient(room: RoomId, text: impl Into<String>) -> Self {
        Self {
            room,
            actor: None,
            text: text.into(),
        }
    }
}

impl core::fmt::Display for Echo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.text)
    }
}
