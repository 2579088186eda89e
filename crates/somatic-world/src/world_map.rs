//! World graph: rooms as nodes, exits as directed edges.
//!
//! The [`WorldMap`] owns every [`Room`], [`Exit`] and [`Item`]. Characters
//! are not stored here; rooms only record which characters are present and
//! on which layer.
//!
//! Internally, an adjacency map indexes outbound exits per room:
//! `BTreeMap<RoomId, Vec<ExitId>>`.

use std::collections::BTreeMap;

use somatic_types::{CharacterId, ExitId, ItemId, RoomId, RoomLayer};
use tracing::debug;

use crate::error::WorldError;
use crate::exit::Exit;
use crate::item::Item;
use crate::room::Room;

/// The world graph holding all rooms, exits and items.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WorldMap {
    /// All rooms indexed by their identifier.
    rooms: BTreeMap<RoomId, Room>,
    /// All exits indexed by their identifier.
    exits: BTreeMap<ExitId, Exit>,
    /// All items indexed by their identifier.
    items: BTreeMap<ItemId, Item>,
    /// Outbound adjacency: room -> exits departing from it.
    outbound: BTreeMap<RoomId, Vec<ExitId>>,
}

impl WorldMap {
    /// Create an empty world map.
    pub const fn new() -> Self {
        Self {
            rooms: BTreeMap::new(),
            exits: BTreeMap::new(),
            items: BTreeMap::new(),
            outbound: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Rooms
    // -------------------------------------------------------------------

    /// Add a room to the map, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoom`] if the id is already taken.
    pub fn add_room(&mut self, room: Room) -> Result<RoomId, WorldError> {
        let id = room.id;
        if self.rooms.contains_key(&id) {
            return Err(WorldError::DuplicateRoom(id));
        }
        self.rooms.insert(id, room);
        self.outbound.entry(id).or_default();
        Ok(id)
    }

    /// Get a room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Get a room mutably.
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Get a room or fail with [`WorldError::RoomNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] if absent.
    pub fn require_room(&self, id: RoomId) -> Result<&Room, WorldError> {
        self.rooms.get(&id).ok_or(WorldError::RoomNotFound(id))
    }

    /// Get a room mutably or fail with [`WorldError::RoomNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] if absent.
    pub fn require_room_mut(&mut self, id: RoomId) -> Result<&mut Room, WorldError> {
        self.rooms.get_mut(&id).ok_or(WorldError::RoomNotFound(id))
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Iterate over all rooms.
    pub fn rooms(&self) -> impl Iterator<Item = (&RoomId, &Room)> {
        self.rooms.iter()
    }

    // -------------------------------------------------------------------
    // Exits
    // -------------------------------------------------------------------

    /// Add an exit. Both endpoints must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] if either endpoint is missing,
    /// or [`WorldError::DuplicateExit`] if the id is already taken.
    pub fn add_exit(&mut self, exit: Exit) -> Result<ExitId, WorldError> {
        if !self.rooms.contains_key(&exit.from) {
            return Err(WorldError::RoomNotFound(exit.from));
        }
        if !self.rooms.contains_key(&exit.to) {
            return Err(WorldError::RoomNotFound(exit.to));
        }
        if self.exits.contains_key(&exit.id) {
            return Err(WorldError::DuplicateExit(exit.id));
        }
        let id = exit.id;
        self.outbound.entry(exit.from).or_default().push(id);
        self.exits.insert(id, exit);
        Ok(id)
    }

    /// Add an exit and a plain exit back the other way.
    ///
    /// The return leg copies every flag except `fall_exit`.
    ///
    /// # Errors
    ///
    /// Propagates [`WorldMap::add_exit`].
    pub fn add_exit_pair(
        &mut self,
        exit: Exit,
        back_keyword: &str,
    ) -> Result<(ExitId, ExitId), WorldError> {
        let mut back = exit.clone();
        back.id = ExitId::new();
        back.from = exit.to;
        back.to = exit.from;
        back.keyword = back_keyword.to_owned();
        back.fall_exit = false;
        let forward = self.add_exit(exit)?;
        let reverse = self.add_exit(back)?;
        Ok((forward, reverse))
    }

    /// Get an exit.
    pub fn exit(&self, id: ExitId) -> Option<&Exit> {
        self.exits.get(&id)
    }

    /// Get an exit or fail with [`WorldError::ExitNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ExitNotFound`] if absent.
    pub fn require_exit(&self, id: ExitId) -> Result<&Exit, WorldError> {
        self.exits.get(&id).ok_or(WorldError::ExitNotFound(id))
    }

    /// Exits leaving a room.
    pub fn exits_from(&self, room: RoomId) -> Vec<&Exit> {
        self.outbound
            .get(&room)
            .map(|ids| ids.iter().filter_map(|id| self.exits.get(id)).collect())
            .unwrap_or_default()
    }

    /// Find an exit out of `room` by keyword.
    pub fn exit_by_keyword(&self, room: RoomId, keyword: &str) -> Option<&Exit> {
        self.exits_from(room)
            .into_iter()
            .find(|exit| exit.keyword.eq_ignore_ascii_case(keyword))
    }

    /// Whether an exit leads directly from `from` to `to`.
    pub fn is_adjacent(&self, from: RoomId, to: RoomId) -> bool {
        self.exits_from(from).iter().any(|exit| exit.to == to)
    }

    // -------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------

    /// Add an item and place it in its room.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`] or [`WorldError::DuplicateItem`].
    pub fn add_item(&mut self, item: Item) -> Result<ItemId, WorldError> {
        let id = item.id;
        if self.items.contains_key(&id) {
            return Err(WorldError::DuplicateItem(id));
        }
        self.require_room_mut(item.room)?.insert_item(id);
        self.items.insert(id, item);
        Ok(id)
    }

    /// Get an item.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Get an item mutably.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Iterate over all items mutably.
    pub fn items_mut(&mut self) -> impl Iterator<Item = (&ItemId, &mut Item)> {
        self.items.iter_mut()
    }

    /// Move an item to another room and layer.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ItemNotFound`] or [`WorldError::RoomNotFound`].
    pub fn relocate_item(
        &mut self,
        id: ItemId,
        to: RoomId,
        layer: RoomLayer,
    ) -> Result<(), WorldError> {
        let from = self.items.get(&id).ok_or(WorldError::ItemNotFound(id))?.room;
        self.require_room(to)?;
        self.require_room_mut(from)?.remove_item(id);
        self.require_room_mut(to)?.insert_item(id);
        if let Some(item) = self.items.get_mut(&id) {
            item.room = to;
            item.layer = layer;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Characters
    // -------------------------------------------------------------------

    /// Move a character from one room to another.
    ///
    /// Validates both rooms before touching either, so a failure leaves
    /// occupancy unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoomNotFound`], [`WorldError::CharacterNotInRoom`]
    /// or [`WorldError::LayerNotSupported`].
    pub fn move_character(
        &mut self,
        character: CharacterId,
        from: RoomId,
        to: RoomId,
        layer: RoomLayer,
    ) -> Result<(), WorldError> {
        {
            let origin = self.require_room(from)?;
            if !origin.contains(character) {
                return Err(WorldError::CharacterNotInRoom {
                    character,
                    room: from,
                });
            }
            let destination = self.require_room(to)?;
            if !destination.terrain.supports(layer) {
                return Err(WorldError::LayerNotSupported { room: to, layer });
            }
        }
        self.require_room_mut(from)?.leave(character)?;
        self.require_room_mut(to)?.enter(character, layer)?;
        debug!(character = %character, from = %from, to = %to, ?layer, "character relocated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::terrain::stock;

    fn two_rooms() -> (WorldMap, RoomId, RoomId) {
        let mut map = WorldMap::new();
        let a = map.add_room(Room::new("A", stock::plains().unwrap())).unwrap();
        let b = map.add_room(Room::new("B", stock::forest().unwrap())).unwrap();
        map.add_exit_pair(Exit::new(a, b, "east"), "west").unwrap();
        (map, a, b)
    }

    #[test]
    fn exit_pairs_are_indexed_both_ways() {
        let (map, a, b) = two_rooms();
        assert!(map.is_adjacent(a, b));
        assert!(map.is_adjacent(b, a));
        assert_eq!(map.exit_by_keyword(a, "EAST").map(|e| e.to), Some(b));
        assert_eq!(map.exit_by_keyword(b, "west").map(|e| e.to), Some(a));
        assert!(map.exit_by_keyword(a, "north").is_none());
    }

    #[test]
    fn duplicate_room_rejected() {
        let mut map = WorldMap::new();
        let room = Room::new("A", stock::plains().unwrap());
        assert!(map.add_room(room.clone()).is_ok());
        assert!(map.add_room(room).is_err());
    }

    #[test]
    fn exit_requires_valid_endpoints() {
        let mut map = WorldMap::new();
        let a = map.add_room(Room::new("A", stock::plains().unwrap())).unwrap();
        assert!(map.add_exit(Exit::new(a, RoomId::new(), "nowhere")).is_err());
    }

    #[test]
    fn move_character_between_rooms() {
        let (mut map, a, b) = two_rooms();
        let c = CharacterId::new();
        map.require_room_mut(a).unwrap().enter(c, RoomLayer::GroundLevel).unwrap();
        map.move_character(c, a, b, RoomLayer::InTrees).unwrap();
        assert!(!map.room(a).unwrap().contains(c));
        assert_eq!(map.room(b).unwrap().layer_of(c), Some(RoomLayer::InTrees));
    }

    #[test]
    fn failed_move_leaves_occupancy_alone() {
        let (mut map, a, b) = two_rooms();
        let c = CharacterId::new();
        map.require_room_mut(a).unwrap().enter(c, RoomLayer::GroundLevel).unwrap();
        assert!(map.move_character(c, a, b, RoomLayer::OnRooftops).is_err());
        assert!(map.room(a).unwrap().contains(c));
    }

    #[test]
    fn items_follow_relocation() {
        let (mut map, a, b) = two_rooms();
        let id = map.add_item(Item::new("a log", a, RoomLayer::GroundLevel)).unwrap();
        map.relocate_item(id, b, RoomLayer::GroundLevel).unwrap();
        assert!(!map.room(a).unwrap().contains_item(id));
        assert!(map.room(b).unwrap().contains_item(id));
        assert_eq!(map.item(id).map(|i| i.room), Some(b));
    }
}
