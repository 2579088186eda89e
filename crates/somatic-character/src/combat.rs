//! Combat aggregates: who is fighting in the same brawl.
//!
//! A [`Combat`] owns a set of combatant ids and the truce requests made so
//! far. Characters refer to their combat by [`CombatId`] only; the
//! [`CombatRegistry`] resolves ids, merges aggregates when fights join, and
//! destroys an aggregate once its last combatant leaves.

use std::collections::{BTreeMap, BTreeSet};

use somatic_types::{CharacterId, CombatId};
use tracing::{debug, info};

use crate::error::CharacterError;

/// Operations every combat aggregate supports.
pub trait CombatAggregate {
    /// Add a combatant. Returns whether it was new.
    fn join(&mut self, combatant: CharacterId) -> bool;

    /// Remove a combatant. Returns whether it was present.
    fn leave(&mut self, combatant: CharacterId) -> bool;

    /// Absorb every combatant of `other`.
    fn merge_from(&mut self, other: Self)
    where
        Self: Sized;

    /// Record a truce request. Returns whether every combatant has now
    /// asked for one.
    fn request_truce(&mut self, combatant: CharacterId) -> bool;

    /// Forget every truce request.
    fn reset_truce(&mut self);

    /// The combatants.
    fn combatants(&self) -> &BTreeSet<CharacterId>;
}

/// One brawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combat {
    /// Unique identifier.
    pub id: CombatId,
    combatants: BTreeSet<CharacterId>,
    truce: BTreeSet<CharacterId>,
}

impl Combat {
    /// Create a combat with no combatants.
    pub fn new() -> Self {
        Self {
            id: CombatId::new(),
            combatants: BTreeSet::new(),
            truce: BTreeSet::new(),
        }
    }

    /// Whether `combatant` takes part.
    pub fn contains(&self, combatant: CharacterId) -> bool {
        self.combatants.contains(&combatant)
    }

    /// Whether nobody is left.
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Whether `combatant` has asked for a truce.
    pub fn requested_truce(&self, combatant: CharacterId) -> bool {
        self.truce.contains(&combatant)
    }
}

impl Default for Combat {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatAggregate for Combat {
    fn join(&mut self, combatant: CharacterId) -> bool {
        self.combatants.insert(combatant)
    }

    fn leave(&mut self, combatant: CharacterId) -> bool {
        self.truce.remove(&combatant);
        self.combatants.remove(&combatant)
    }

    fn merge_from(&mut self, other: Self) {
        self.combatants.extend(other.combatants);
        self.truce.clear();
    }

    fn request_truce(&mut self, combatant: CharacterId) -> bool {
        if self.combatants.contains(&combatant) {
            self.truce.insert(combatant);
        }
        !self.combatants.is_empty() && self.combatants.is_subset(&self.truce)
    }

    fn reset_truce(&mut self) {
        self.truce.clear();
    }

    fn combatants(&self) -> &BTreeSet<CharacterId> {
        &self.combatants
    }
}

/// Every live combat.
#[derive(Debug, Default)]
pub struct CombatRegistry {
    combats: BTreeMap<CombatId, Combat>,
}

impl CombatRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            combats: BTreeMap::new(),
        }
    }

    /// Start a combat between `combatants`.
    pub fn create(&mut self, combatants: impl IntoIterator<Item = CharacterId>) -> CombatId {
        let mut combat = Combat::new();
        for combatant in combatants {
            combat.join(combatant);
        }
        let id = combat.id;
        info!(combat = %id, combatants = combat.combatants.len(), "combat started");
        self.combats.insert(id, combat);
        id
    }

    /// Get a combat.
    pub fn get(&self, id: CombatId) -> Option<&Combat> {
        self.combats.get(&id)
    }

    /// Get a combat or fail.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CombatNotFound`] if absent.
    pub fn require_mut(&mut self, id: CombatId) -> Result<&mut Combat, CharacterError> {
        self.combats
            .get_mut(&id)
            .ok_or(CharacterError::CombatNotFound(id))
    }

    /// Fold `from` into `into`, returning the combatants that moved.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CombatNotFound`] if either is missing.
    pub fn merge(
        &mut self,
        into: CombatId,
        from: CombatId,
    ) -> Result<Vec<CharacterId>, CharacterError> {
        if into == from {
            return Ok(Vec::new());
        }
        if !self.combats.contains_key(&into) {
            return Err(CharacterError::CombatNotFound(into));
        }
        let absorbed = self
            .combats
            .remove(&from)
            .ok_or(CharacterError::CombatNotFound(from))?;
        let moved: Vec<CharacterId> = absorbed.combatants.iter().copied().collect();
        self.require_mut(into)?.merge_from(absorbed);
        info!(into = %into, from = %from, moved = moved.len(), "combats merged");
        Ok(moved)
    }

    /// Remove `combatant` from combat `id`, destroying the combat when it
    /// empties. Returns whether the combat was destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CombatNotFound`] if absent.
    pub fn leave(&mut self, id: CombatId, combatant: CharacterId) -> Result<bool, CharacterError> {
        let combat = self.require_mut(id)?;
        combat.leave(combatant);
        debug!(combat = %id, character = %combatant, "left combat");
        if combat.is_empty() {
            self.combats.remove(&id);
            info!(combat = %id, "combat ended");
            return Ok(true);
        }
        Ok(false)
    }

    /// Number of live combats.
    pub fn len(&self) -> usize {
        self.combats.len()
    }

    /// Whether there are no live combats.
    pub fn is_empty(&self) -> bool {
        self.combats.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_unites_combatants() {
        let mut registry = CombatRegistry::new();
        let (a, b, c, d) = (
            CharacterId::new(),
            CharacterId::new(),
            CharacterId::new(),
            CharacterId::new(),
        );
        let first = registry.create([a, b]);
        let second = registry.create([c, d]);
        let moved = registry.merge(first, second).unwrap();
        assert_eq!(moved.len(), 2);
        assert_eq!(registry.len(), 1);
        let merged = registry.get(first).unwrap();
        assert!([a, b, c, d].iter().all(|id| merged.contains(*id)));
        assert!(registry.get(second).is_none());
    }

    #[test]
    fn combat_destroyed_when_empty() {
        let mut registry = CombatRegistry::new();
        let (a, b) = (CharacterId::new(), CharacterId::new());
        let id = registry.create([a, b]);
        assert!(!registry.leave(id, a).unwrap());
        assert!(registry.leave(id, b).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn truce_needs_everyone() {
        let mut combat = Combat::new();
        let (a, b) = (CharacterId::new(), CharacterId::new());
        combat.join(a);
        combat.join(b);
        assert!(!combat.request_truce(a));
        assert!(combat.requested_truce(a));
        assert!(combat.request_truce(b));
        combat.reset_truce();
        assert!(!combat.requested_truce(a));
    }

    #[test]
    fn outsiders_cannot_vote_for_truce() {
        let mut combat = Combat::new();
        let a = CharacterId::new();
        combat.join(a);
        assert!(!combat.request_truce(CharacterId::new()));
        assert!(combat.request_truce(a));
    }
}
