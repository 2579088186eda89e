//! Error types for the `somatic-world` crate.
//!
//! These are invariant violations, not gameplay refusals. A character
//! trying to walk through a wall is refused by the movement engine; a
//! character being removed from a room it was never in is a bug and ends
//! up here.

use somatic_types::{CharacterId, ExitId, ItemId, RoomId, RoomLayer};

/// Errors that can occur during world-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A room was not found in the world graph.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// An exit was not found in the world graph.
    #[error("exit not found: {0}")]
    ExitNotFound(ExitId),

    /// An item was not found in the world graph.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The character is not present in the specified room.
    #[error("character {character} is not in room {room}")]
    CharacterNotInRoom {
        /// The character.
        character: CharacterId,
        /// The room.
        room: RoomId,
    },

    /// The character is already present in the specified room.
    #[error("character {character} is already in room {room}")]
    CharacterAlreadyInRoom {
        /// The character.
        character: CharacterId,
        /// The room.
        room: RoomId,
    },

    /// The room's terrain has no such layer.
    #[error("room {room} does not support layer {layer:?}")]
    LayerNotSupported {
        /// The room.
        room: RoomId,
        /// The requested layer.
        layer: RoomLayer,
    },

    /// A room was inserted twice.
    #[error("duplicate room id: {0}")]
    DuplicateRoom(RoomId),

    /// An exit was inserted twice.
    #[error("duplicate exit id: {0}")]
    DuplicateExit(ExitId),

    /// An item was inserted twice.
    #[error("duplicate item id: {0}")]
    DuplicateItem(ItemId),

    /// The terrain was built without any layers.
    #[error("terrain {0:?} has no layers")]
    EmptyTerrain(String),
}
