//! The character record: everything the rules know about one body.

use std::collections::{BTreeMap, VecDeque};

use somatic_types::{
    CharacterId, CheckType, CombatId, CombatStatus, Consciousness, ExitId, MovementKind,
    MovementPhase, Perceivable, PositionModifier, PositionState, RoomId, RoomLayer,
    TransitionType,
};

use crate::body::Body;
use crate::effects::EffectRegistry;
use crate::stamina::Stamina;

/// Skill value used for checks the character has no entry for.
pub const DEFAULT_SKILL: f64 = 40.0;

/// Player-chosen combat preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CombatSettings {
    /// Keep attacking sleeping or unconscious opponents.
    pub attack_helpless: bool,
    /// Never take an opponent's exposed rear.
    pub forbid_flanking: bool,
    /// Open fights at range rather than closing to melee.
    pub prefer_ranged: bool,
}

/// A traversal in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    /// Token the scheduled arrival must present.
    pub token: u64,
    /// Exit being crossed.
    pub exit: ExitId,
    /// Origin room.
    pub from: RoomId,
    /// Destination room.
    pub to: RoomId,
    /// Layer the mover arrives at.
    pub arrival_layer: RoomLayer,
    /// Kind of movement.
    pub kind: MovementKind,
    /// Terrain transition classification.
    pub transition: TransitionType,
    /// Game time the move began.
    pub started_at: u64,
    /// Game milliseconds until arrival.
    pub duration_ms: u64,
    /// Progress.
    pub phase: MovementPhase,
    /// What is being dragged along.
    pub dragging: Option<Perceivable>,
}

/// A request to move through an exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Exit keyword ("north", "up").
    pub keyword: String,
    /// Kind of movement.
    pub kind: MovementKind,
    /// Skip blocking effects.
    pub ignore_blockers: bool,
    /// Accept the risk of flying, swimming or dropping.
    pub ignore_safe_movement: bool,
    /// What to drag, for [`MovementKind::Drag`].
    pub dragging: Option<Perceivable>,
}

impl MoveRequest {
    /// Walk through the exit named `keyword`.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            kind: MovementKind::Single,
            ignore_blockers: false,
            ignore_safe_movement: false,
            dragging: None,
        }
    }

    /// Use a different movement kind.
    #[must_use]
    pub const fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Drag something along.
    #[must_use]
    pub const fn dragging(mut self, what: Perceivable) -> Self {
        self.kind = MovementKind::Drag;
        self.dragging = Some(what);
        self
    }

    /// Accept the risk of an unsafe crossing.
    #[must_use]
    pub const fn insist(mut self) -> Self {
        self.ignore_safe_movement = true;
        self
    }

    /// Ignore blocking effects.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.ignore_blockers = true;
        self
    }
}

/// A fall that has begun but not yet landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFall {
    /// Token the scheduled landing must present.
    pub token: u64,
    /// Layer the fall started from.
    pub from_layer: RoomLayer,
}

/// A playable character.
#[derive(Debug)]
pub struct Character {
    /// Unique identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Current room.
    pub room: RoomId,
    /// Current layer within the room.
    pub layer: RoomLayer,
    /// Current posture.
    pub position: PositionState,
    /// Relationship to the position target.
    pub modifier: PositionModifier,
    /// What the character is positioned against.
    pub target: Option<Perceivable>,
    /// Physical form.
    pub body: Box<dyn Body>,
    /// Awake, asleep, unconscious or dead.
    pub consciousness: Consciousness,
    /// Active effects.
    pub effects: EffectRegistry,
    /// Skill values by check.
    pub skills: BTreeMap<CheckType, f64>,
    /// The traversal in progress.
    pub movement: Option<Movement>,
    /// Follow-up moves.
    pub queue: VecDeque<MoveRequest>,
    /// A fall in progress.
    pub fall: Option<PendingFall>,
    /// Combat the character takes part in.
    pub combat: Option<CombatId>,
    /// Who the character is fighting.
    pub combat_target: Option<CharacterId>,
    /// Whether locked in melee with the target.
    pub melee_range: bool,
    /// Engagement state.
    pub combat_status: CombatStatus,
    /// Combat preferences.
    pub combat_settings: CombatSettings,
}

impl Character {
    /// Create an awake, standing character at ground level.
    pub fn new(name: impl Into<String>, room: RoomId, body: Box<dyn Body>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            room,
            layer: RoomLayer::GroundLevel,
            position: PositionState::Standing,
            modifier: PositionModifier::None,
            target: None,
            body,
            consciousness: Consciousness::Awake,
            effects: EffectRegistry::new(),
            skills: BTreeMap::new(),
            movement: None,
            queue: VecDeque::new(),
            fall: None,
            combat: None,
            combat_target: None,
            melee_range: false,
            combat_status: CombatStatus::Unengaged,
            combat_settings: CombatSettings::default(),
        }
    }

    /// Start on another layer.
    #[must_use]
    pub const fn on_layer(mut self, layer: RoomLayer) -> Self {
        self.layer = layer;
        self
    }

    /// Start in another posture.
    #[must_use]
    pub const fn in_position(mut self, position: PositionState) -> Self {
        self.position = position;
        self
    }

    /// Set a skill value.
    #[must_use]
    pub fn with_skill(mut self, check: CheckType, value: f64) -> Self {
        self.skills.insert(check, value);
        self
    }

    /// Set combat preferences.
    #[must_use]
    pub const fn with_settings(mut self, settings: CombatSettings) -> Self {
        self.combat_settings = settings;
        self
    }

    /// Skill value for a check.
    pub fn skill(&self, check: CheckType) -> f64 {
        self.skills.get(&check).copied().unwrap_or(DEFAULT_SKILL)
    }

    /// Stamina ledger.
    pub fn stamina(&self) -> &Stamina {
        self.body.stamina()
    }

    /// Whether a traversal is in progress.
    pub const fn is_moving(&self) -> bool {
        self.movement.is_some()
    }

    /// Whether a fall is in progress.
    pub const fn is_falling(&self) -> bool {
        self.fall.is_some()
    }

    /// Whether the character takes part in a combat.
    pub const fn in_combat(&self) -> bool {
        self.combat.is_some()
    }

    /// Whether the character is positioned `On` `target`.
    pub fn is_on(&self, target: Perceivable) -> bool {
        self.modifier == PositionModifier::On && self.target == Some(target)
    }

    /// Drop any positioning against a target.
    pub const fn clear_position_target(&mut self) {
        self.modifier = PositionModifier::None;
        self.target = None;
    }

    /// Forget every combat reference.
    pub const fn clear_combat(&mut self) {
        self.combat = None;
        self.combat_target = None;
        self.melee_range = false;
        self.combat_status = CombatStatus::Unengaged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::LimbBody;

    #[test]
    fn new_character_is_idle_and_standing() {
        let c = Character::new("Ayla", RoomId::new(), Box::new(LimbBody::humanoid(50.0)));
        assert_eq!(c.position, PositionState::Standing);
        assert!(!c.is_moving());
        assert!(!c.in_combat());
        assert!((c.stamina().current() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn skills_default_when_unset() {
        let c = Character::new("Ayla", RoomId::new(), Box::new(LimbBody::humanoid(50.0)))
            .with_skill(CheckType::Climb, 75.0);
        assert!((c.skill(CheckType::Climb) - 75.0).abs() < f64::EPSILON);
        assert!((c.skill(CheckType::Swim) - DEFAULT_SKILL).abs() < f64::EPSILON);
    }

    #[test]
    fn move_request_builders() {
        let item = Perceivable::Item(somatic_types::ItemId::new());
        let req = MoveRequest::new("north").dragging(item).insist();
        assert_eq!(req.kind, MovementKind::Drag);
        assert_eq!(req.dragging, Some(item));
        assert!(req.ignore_safe_movement);
        assert!(!req.ignore_blockers);
    }
}
