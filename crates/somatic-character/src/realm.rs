//! The realm: world, characters and combats under one owner.
//!
//! Every rule in this crate is a method on [`Realm`] (mutators) or on a
//! [`CharacterView`] borrowed from it (pure predicates). Characters, rooms
//! and combats refer to each other by id only and are resolved here, so a
//! single `&mut Realm` is the one synchronization point for all shared
//! state. The engine processes one event at a time against it.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use somatic_types::{
    CharacterId, CheckResult, CheckType, Consciousness, Difficulty, Echo, ItemId, Perceivable,
    PositionModifier, PositionState, RoomId, RoomLayer,
};
use somatic_world::{Room, Terrain, WorldMap};
use tracing::{debug, info};

use crate::character::Character;
use crate::combat::CombatRegistry;
use crate::config::RulesConfig;
use crate::error::CharacterError;
use crate::flight::FallStart;
use crate::roster::Roster;
use crate::skill_check::SkillCheckOracle;

/// Owner of all mutable game state.
#[derive(Debug)]
pub struct Realm {
    pub(crate) world: WorldMap,
    pub(crate) roster: Roster,
    pub(crate) combats: CombatRegistry,
    pub(crate) config: RulesConfig,
    pub(crate) oracle: Box<dyn SkillCheckOracle>,
    pub(crate) rng: SmallRng,
    now_ms: u64,
    next_token: u64,
    echoes: Vec<Echo>,
}

/// What changed when a character's consciousness changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsciousnessReport {
    /// The previous state.
    pub previous: Consciousness,
    /// A fall begun by losing the ability to hold on or stay aloft.
    pub fall: Option<FallStart>,
}

impl Realm {
    /// Create a realm over `world`.
    pub fn new(
        world: WorldMap,
        config: RulesConfig,
        oracle: Box<dyn SkillCheckOracle>,
        seed: u64,
    ) -> Self {
        Self {
            world,
            roster: Roster::new(),
            combats: CombatRegistry::new(),
            config,
            oracle,
            rng: SmallRng::seed_from_u64(seed),
            now_ms: 0,
            next_token: 0,
            echoes: Vec::new(),
        }
    }

    /// The world map.
    pub const fn world(&self) -> &WorldMap {
        &self.world
    }

    /// The world map, mutably (for placing items and building rooms).
    pub const fn world_mut(&mut self) -> &mut WorldMap {
        &mut self.world
    }

    /// Every character.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Get a character.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.roster.get(id)
    }

    /// Get a character mutably, for effects and administrative edits.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.roster.get_mut(id)
    }

    /// Every live combat.
    pub const fn combats(&self) -> &CombatRegistry {
        &self.combats
    }

    /// Rule parameters.
    pub const fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Current game time.
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance game time. Time never runs backwards.
    pub fn set_time(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Take every echo produced since the last drain.
    pub fn drain_echoes(&mut self) -> Vec<Echo> {
        core::mem::take(&mut self.echoes)
    }

    pub(crate) fn echo(&mut self, room: RoomId, actor: CharacterId, text: impl Into<String>) {
        self.echoes.push(Echo::about(room, actor, text));
    }

    pub(crate) const fn next_token(&mut self) -> u64 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }

    // -------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------

    /// Borrow a validated view of a character for predicates.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] for an unknown id, and
    /// reports [`CharacterError::NotInOwnRoom`] as an invariant violation
    /// when the character's room does not list it.
    pub fn view(&self, id: CharacterId) -> Result<CharacterView<'_>, CharacterError> {
        let character = self.roster.require(id)?;
        let room = self.world.require_room(character.room)?;
        if !room.contains(id) {
            return Err(CharacterError::NotInOwnRoom {
                character: id,
                room: character.room,
            }
            .violation());
        }
        Ok(CharacterView {
            realm: self,
            character,
            room,
        })
    }

    /// Whether two characters share a room and a layer.
    pub fn colocated(&self, a: CharacterId, b: CharacterId) -> bool {
        match (self.roster.get(a), self.roster.get(b)) {
            (Some(a), Some(b)) => a.room == b.room && a.layer == b.layer,
            _ => false,
        }
    }

    /// Whether `b` is in `a`'s room or a room adjacent through an exit.
    pub fn in_line_of_sight(&self, a: CharacterId, b: CharacterId) -> bool {
        match (self.roster.get(a), self.roster.get(b)) {
            (Some(a), Some(b)) => a.room == b.room || self.world.is_adjacent(a.room, b.room),
            _ => false,
        }
    }

    pub(crate) fn name_of(&self, what: Perceivable) -> String {
        match what {
            Perceivable::Character(id) => self
                .roster
                .get(id)
                .map_or_else(|| String::from("someone"), |c| c.name.clone()),
            Perceivable::Item(id) => self
                .world
                .item(id)
                .map_or_else(|| String::from("something"), |i| i.name.clone()),
        }
    }

    pub(crate) fn roll(
        &mut self,
        id: CharacterId,
        check: CheckType,
        difficulty: Difficulty,
    ) -> Result<CheckResult, CharacterError> {
        let skill = self.roster.require(id)?.skill(check);
        Ok(self.oracle.check(id, skill, check, difficulty))
    }

    pub(crate) fn roll_all(
        &mut self,
        id: CharacterId,
        check: CheckType,
    ) -> Result<Vec<(Difficulty, CheckResult)>, CharacterError> {
        let skill = self.roster.require(id)?.skill(check);
        Ok(self.oracle.check_against_all_difficulties(id, skill, check))
    }

    // -------------------------------------------------------------------
    // Occupancy
    // -------------------------------------------------------------------

    /// Change a character's layer within its room.
    pub(crate) fn set_layer(
        &mut self,
        id: CharacterId,
        layer: RoomLayer,
    ) -> Result<(), CharacterError> {
        let character = self.roster.require_mut(id)?;
        self.world
            .require_room_mut(character.room)?
            .set_layer(id, layer)?;
        character.layer = layer;
        self.refresh_melee(id)
    }

    /// Move a character to another room.
    pub(crate) fn relocate(
        &mut self,
        id: CharacterId,
        to: RoomId,
        layer: RoomLayer,
    ) -> Result<(), CharacterError> {
        let character = self.roster.require_mut(id)?;
        self.world.move_character(id, character.room, to, layer)?;
        character.room = to;
        character.layer = layer;
        self.refresh_melee(id)
    }

    /// Items in `room` positioned against `base`.
    pub(crate) fn items_against(
        &self,
        room: RoomId,
        base: Perceivable,
        only_on: bool,
    ) -> Vec<ItemId> {
        let Some(room) = self.world.room(room) else {
            return Vec::new();
        };
        room.items()
            .filter(|id| {
                self.world.item(*id).is_some_and(|item| {
                    item.target == Some(base)
                        && (!only_on || item.modifier == PositionModifier::On)
                })
            })
            .collect()
    }

    /// Quietly release everything positioned against `base`.
    pub(crate) fn release_positioned_against(
        &mut self,
        base: Perceivable,
        room: RoomId,
    ) -> Vec<Perceivable> {
        let mut released = Vec::new();
        for item in self.items_against(room, base, false) {
            if let Some(item) = self.world.item_mut(item) {
                item.clear_position();
                released.push(Perceivable::Item(item.id));
            }
        }
        for id in self.roster.positioned_against(base) {
            if let Some(character) = self.roster.get_mut(id) {
                character.clear_position_target();
                released.push(Perceivable::Character(id));
            }
        }
        released
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Bring a character into the world at its room, on the nearest layer
    /// the room supports.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::DuplicateCharacter`] or a world error if
    /// the room does not exist.
    pub fn login(&mut self, mut character: Character) -> Result<CharacterId, CharacterError> {
        let id = character.id;
        if self.roster.contains(id) {
            return Err(CharacterError::DuplicateCharacter(id));
        }
        let room = self.world.require_room_mut(character.room)?;
        let layer = room.terrain.nearest_layer(character.layer);
        room.enter(id, layer)?;
        character.layer = layer;
        let (room, text) = (character.room, format!("{} appears.", character.name));
        self.roster.insert(character)?;
        info!(character = %id, room = %room, ?layer, "character logged in");
        self.echo(room, id, text);
        Ok(id)
    }

    /// Remove a character from the world, tearing down its combat,
    /// movement and positioning links.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] for an unknown id.
    pub fn logout(&mut self, id: CharacterId) -> Result<Character, CharacterError> {
        self.view(id)?;
        self.leave_combat(id)?;
        self.cancel_for_mover_only(id)?;
        let room = {
            let character = self.roster.require_mut(id)?;
            character.fall = None;
            character.clear_position_target();
            character.room
        };
        let me = Perceivable::Character(id);
        self.release_positioned_against(me, room);
        for other in self.roster.ids() {
            if let Some(mover) = self.roster.get_mut(other)
                && let Some(movement) = mover.movement.as_mut()
                && movement.dragging == Some(me)
            {
                movement.dragging = None;
            }
        }
        self.world.require_room_mut(room)?.leave(id)?;
        let character = self.roster.remove(id).ok_or(CharacterError::CharacterNotFound(id))?;
        info!(character = %id, room = %room, "character logged out");
        self.echo(room, id, format!("{} vanishes.", character.name));
        Ok(character)
    }

    /// Change a character's consciousness.
    ///
    /// Losing consciousness cancels movement, drops a flyer or climber into
    /// a fall, leaves a swimmer floating and collapses anyone upright. Death
    /// also ends the character's part in combat.
    ///
    /// # Errors
    ///
    /// Reports [`CharacterError::DeadCannotRevive`] as an invariant
    /// violation when a dead character is given any other state.
    pub fn set_consciousness(
        &mut self,
        id: CharacterId,
        next: Consciousness,
    ) -> Result<ConsciousnessReport, CharacterError> {
        let character = self.roster.require(id)?;
        let previous = character.consciousness;
        if previous == Consciousness::Dead && next != Consciousness::Dead {
            return Err(CharacterError::DeadCannotRevive {
                character: id,
                requested: next,
            }
            .violation());
        }
        let mut report = ConsciousnessReport {
            previous,
            fall: None,
        };
        if previous == next {
            return Ok(report);
        }
        let (room, name, position) = (character.room, character.name.clone(), character.position);
        self.roster.require_mut(id)?.consciousness = next;
        debug!(character = %id, ?previous, ?next, "consciousness changed");
        self.echo(room, id, format!("{name} is now {}.", next.describe()));

        if next != Consciousness::Awake {
            self.cancel_for_mover_only(id)?;
            match position {
                PositionState::Flying | PositionState::Climbing => {
                    report.fall = Some(self.start_fall(id)?);
                }
                PositionState::Swimming => {
                    self.roster.require_mut(id)?.position = PositionState::Floating;
                }
                state if state.upright() => {
                    self.roster.require_mut(id)?.position = PositionState::Sprawled;
                    self.echo(room, id, format!("{name} collapses."));
                }
                _ => {}
            }
        }
        if next == Consciousness::Dead {
            self.leave_combat(id)?;
            info!(character = %id, "character died");
        }
        Ok(report)
    }

    /// Kill a character.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] for an unknown id.
    pub fn kill(&mut self, id: CharacterId) -> Result<ConsciousnessReport, CharacterError> {
        self.set_consciousness(id, Consciousness::Dead)
    }
}

/// A validated, read-only view of one character and its room.
///
/// All `can_*` and `why_cannot_*` predicates live here; none of them mutate
/// anything, so callers may probe freely before committing.
#[derive(Debug, Clone, Copy)]
pub struct CharacterView<'a> {
    pub(crate) realm: &'a Realm,
    pub(crate) character: &'a Character,
    pub(crate) room: &'a Room,
}

impl<'a> CharacterView<'a> {
    /// The character.
    pub const fn character(&self) -> &'a Character {
        self.character
    }

    /// The character's room.
    pub const fn room(&self) -> &'a Room {
        self.room
    }

    /// The room's terrain.
    pub const fn terrain(&self) -> &'a Terrain {
        &self.room.terrain
    }

    /// Skill target number the oracle would use.
    pub(crate) fn target_number(&self, check: CheckType, difficulty: Difficulty) -> f64 {
        self.realm
            .oracle
            .target_number(self.character.skill(check), check, difficulty)
    }
}
