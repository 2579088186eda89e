//! Registry of every character in the realm.

use std::collections::BTreeMap;

use somatic_types::{CharacterId, Perceivable, RoomId};

use crate::character::Character;
use crate::error::CharacterError;

/// All characters, indexed by id.
#[derive(Debug, Default)]
pub struct Roster {
    characters: BTreeMap<CharacterId, Character>,
}

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self {
            characters: BTreeMap::new(),
        }
    }

    /// Add a character.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::DuplicateCharacter`] if the id is taken.
    pub fn insert(&mut self, character: Character) -> Result<CharacterId, CharacterError> {
        let id = character.id;
        if self.characters.contains_key(&id) {
            return Err(CharacterError::DuplicateCharacter(id));
        }
        self.characters.insert(id, character);
        Ok(id)
    }

    /// Remove a character.
    pub fn remove(&mut self, id: CharacterId) -> Option<Character> {
        self.characters.remove(&id)
    }

    /// Get a character.
    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Get a character mutably.
    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Get a character or fail.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] if absent.
    pub fn require(&self, id: CharacterId) -> Result<&Character, CharacterError> {
        self.characters
            .get(&id)
            .ok_or(CharacterError::CharacterNotFound(id))
    }

    /// Get a character mutably or fail.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] if absent.
    pub fn require_mut(&mut self, id: CharacterId) -> Result<&mut Character, CharacterError> {
        self.characters
            .get_mut(&id)
            .ok_or(CharacterError::CharacterNotFound(id))
    }

    /// Whether the roster holds `id`.
    pub fn contains(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Every character id, in order.
    pub fn ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    /// Iterate over every character.
    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Characters in `room`.
    pub fn in_room(&self, room: RoomId) -> Vec<CharacterId> {
        self.characters
            .values()
            .filter(|c| c.room == room)
            .map(|c| c.id)
            .collect()
    }

    /// Characters positioned against `target` with any modifier.
    pub fn positioned_against(&self, target: Perceivable) -> Vec<CharacterId> {
        self.characters
            .values()
            .filter(|c| c.target == Some(target))
            .map(|c| c.id)
            .collect()
    }

    /// Characters positioned `On` `target`.
    pub fn riding(&self, target: Perceivable) -> Vec<CharacterId> {
        self.characters
            .values()
            .filter(|c| c.is_on(target))
            .map(|c| c.id)
            .collect()
    }

    /// Characters whose combat target is `id`.
    pub fn attackers_of(&self, id: CharacterId) -> Vec<CharacterId> {
        self.characters
            .values()
            .filter(|c| c.combat_target == Some(id))
            .map(|c| c.id)
            .collect()
    }
}
