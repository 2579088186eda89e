//! Room (cell) implementation with layered occupant tracking.
//!
//! A [`Room`] is shared by everyone in it. Its mutation methods
//! ([`Room::enter`], [`Room::leave`], [`Room::insert_item`]) are the only
//! points at which occupancy changes, and they are only ever called from
//! within a single engine step.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use somatic_types::{CharacterId, Difficulty, ItemId, RoomId, RoomLayer};
use tracing::debug;

use crate::error::WorldError;
use crate::terrain::Terrain;

/// A room in the world graph and the characters and items inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier.
    pub id: RoomId,
    /// Short display name.
    pub name: String,
    /// Terrain deciding which layers exist.
    pub terrain: Terrain,
    /// Whether violence is forbidden here.
    pub peaceful: bool,
    /// Difficulty of seeing where one is going (darkness, fog).
    pub light_difficulty: Difficulty,
    /// Characters present, with the layer each one occupies.
    occupants: BTreeMap<CharacterId, RoomLayer>,
    /// Items lying in the room.
    items: BTreeSet<ItemId>,
}

impl Room {
    /// Create an empty, lit, non-peaceful room.
    pub fn new(name: impl Into<String>, terrain: Terrain) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            terrain,
            peaceful: false,
            light_difficulty: Difficulty::Trivial,
            occupants: BTreeMap::new(),
            items: BTreeSet::new(),
        }
    }

    /// Mark the room as a place where fighting is forbidden.
    #[must_use]
    pub const fn peaceful(mut self) -> Self {
        self.peaceful = true;
        self
    }

    /// Set how hard it is to see in the room.
    #[must_use]
    pub const fn with_light(mut self, difficulty: Difficulty) -> Self {
        self.light_difficulty = difficulty;
        self
    }

    // -------------------------------------------------------------------
    // Occupants
    // -------------------------------------------------------------------

    /// Put a character into the room at `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CharacterAlreadyInRoom`] if the character is
    /// already here, or [`WorldError::LayerNotSupported`] if the terrain has
    /// no such layer.
    pub fn enter(&mut self, character: CharacterId, layer: RoomLayer) -> Result<(), WorldError> {
        if self.occupants.contains_key(&character) {
            return Err(WorldError::CharacterAlreadyInRoom {
                character,
                room: self.id,
            });
        }
        if !self.terrain.supports(layer) {
            return Err(WorldError::LayerNotSupported {
                room: self.id,
                layer,
            });
        }
        self.occupants.insert(character, layer);
        debug!(room = %self.id, character = %character, ?layer, "character entered room");
        Ok(())
    }

    /// Remove a character from the room, returning the layer it was on.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CharacterNotInRoom`] if the character is not here.
    pub fn leave(&mut self, character: CharacterId) -> Result<RoomLayer, WorldError> {
        let layer = self
            .occupants
            .remove(&character)
            .ok_or(WorldError::CharacterNotInRoom {
                character,
                room: self.id,
            })?;
        debug!(room = %self.id, character = %character, "character left room");
        Ok(layer)
    }

    /// Move a character already in the room to another layer.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CharacterNotInRoom`] or
    /// [`WorldError::LayerNotSupported`].
    pub fn set_layer(&mut self, character: CharacterId, layer: RoomLayer) -> Result<(), WorldError> {
        if !self.terrain.supports(layer) {
            return Err(WorldError::LayerNotSupported {
                room: self.id,
                layer,
            });
        }
        let slot = self
            .occupants
            .get_mut(&character)
            .ok_or(WorldError::CharacterNotInRoom {
                character,
                room: self.id,
            })?;
        *slot = layer;
        Ok(())
    }

    /// The layer a character occupies, if present.
    pub fn layer_of(&self, character: CharacterId) -> Option<RoomLayer> {
        self.occupants.get(&character).copied()
    }

    /// Whether a character is in the room.
    pub fn contains(&self, character: CharacterId) -> bool {
        self.occupants.contains_key(&character)
    }

    /// All characters in the room, in id order.
    pub fn occupants(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.occupants.keys().copied()
    }

    /// Characters on a specific layer.
    pub fn occupants_on(&self, layer: RoomLayer) -> Vec<CharacterId> {
        self.occupants
            .iter()
            .filter(|(_, l)| **l == layer)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Number of characters in the room.
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    // -------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------

    /// Add an item to the room.
    pub fn insert_item(&mut self, item: ItemId) {
        self.items.insert(item);
    }

    /// Remove an item from the room. Returns whether it was present.
    pub fn remove_item(&mut self, item: ItemId) -> bool {
        self.items.remove(&item)
    }

    /// Whether an item is in the room.
    pub fn contains_item(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    /// All items in the room.
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }
}
