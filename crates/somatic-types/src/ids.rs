//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Characters, rooms, exits, items and combats never hold references to one
//! another. They hold these identifiers and resolve them through the owning
//! registry, which keeps the character/combat/target graph free of cycles.
//! All IDs use UUID v7 (time-ordered) so that ordered maps iterate in
//! creation order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a playable or non-playable character.
    CharacterId
}

define_id! {
    /// Unique identifier for a room (a cell in the world graph).
    RoomId
}

define_id! {
    /// Unique identifier for a directed exit between two rooms.
    ExitId
}

define_id! {
    /// Unique identifier for an item lying in a room.
    ItemId
}

define_id! {
    /// Unique identifier for a combat aggregate.
    CombatId
}

define_id! {
    /// Unique identifier for an effect attached to a character or room.
    EffectId
}

define_id! {
    /// Unique identifier for a bodypart on a character's body.
    BodypartId
}

/// Anything a character can perceive and be positioned against.
///
/// Position targets and drag targets are expressed through this enum so that
/// the position machine never needs to know whether it is dealing with a
/// piece of furniture or another character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Perceivable {
    /// Another character.
    Character(CharacterId),
    /// An item in the room.
    Item(ItemId),
}

impl core::fmt::Display for Perceivable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Character(id) => write!(f, "character {id}"),
            Self::Item(id) => write!(f, "item {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let character = CharacterId::new();
        let room = RoomId::new();
        assert_ne!(character.into_inner(), Uuid::nil());
        assert_ne!(room.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = CharacterId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<CharacterId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn perceivable_display_names_the_kind() {
        let item = ItemId::new();
        assert!(Perceivable::Item(item).to_string().starts_with("item "));
    }
}
