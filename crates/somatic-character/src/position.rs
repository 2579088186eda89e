//! Position state machine: changing posture, modifier and target.
//!
//! [`CharacterView::why_cannot_move_position`] applies the rules in a fixed
//! order and returns the first refusal. [`Realm::move_position`] re-runs
//! the same check and mutates only when it passes, so a refused change
//! leaves every piece of state untouched.
//!
//! Standing up from a non-upright posture knocks off everything resting
//! `On` the character. The walk is breadth-first over a snapshot of riders
//! with a visited set, so it terminates and never touches a character
//! twice.

use std::collections::{BTreeSet, VecDeque};

use somatic_types::{
    CharacterId, Perceivable, PositionModifier, PositionState, PostureClass, PostureDirection,
};
use tracing::debug;

use crate::error::CharacterError;
use crate::realm::{CharacterView, Realm};
use crate::refusal::PositionRefusal;

/// A requested posture change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    /// Target posture.
    pub state: PositionState,
    /// Relationship to the target.
    pub modifier: PositionModifier,
    /// What to be positioned against.
    pub target: Option<Perceivable>,
    /// Skip the restricted-posture rule.
    pub ignore_restrictions: bool,
    /// Allow the change during a movement.
    pub ignore_movement: bool,
}

impl PositionRequest {
    /// Adopt `state` with no target.
    pub const fn new(state: PositionState) -> Self {
        Self {
            state,
            modifier: PositionModifier::None,
            target: None,
            ignore_restrictions: false,
            ignore_movement: false,
        }
    }

    /// Position against `target`.
    #[must_use]
    pub const fn against(mut self, modifier: PositionModifier, target: Perceivable) -> Self {
        self.modifier = modifier;
        self.target = Some(target);
        self
    }

    /// Skip the restricted-posture rule.
    #[must_use]
    pub const fn ignoring_restrictions(mut self) -> Self {
        self.ignore_restrictions = true;
        self
    }

    /// Allow the change during a movement.
    #[must_use]
    pub const fn ignoring_movement(mut self) -> Self {
        self.ignore_movement = true;
        self
    }
}

/// Result of a posture change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReport {
    /// Previous posture.
    pub from: PositionState,
    /// New posture.
    pub to: PositionState,
    /// Everything knocked off the character by standing up.
    pub knocked_off: Vec<Perceivable>,
}

impl CharacterView<'_> {
    /// Whether the posture change would be allowed.
    pub fn can_move_position(&self, request: &PositionRequest) -> bool {
        self.why_cannot_move_position(request).is_none()
    }

    /// The first rule the posture change breaks, if any.
    pub fn why_cannot_move_position(&self, request: &PositionRequest) -> Option<PositionRefusal> {
        let c = self.character;
        if !c.consciousness.can_act() {
            return Some(PositionRefusal::NotAwake(c.consciousness));
        }
        if request.state == c.position
            && request.modifier == c.modifier
            && request.target == c.target
        {
            return Some(PositionRefusal::AlreadyThere);
        }
        if !c.body.is_valid_position(request.state) {
            return Some(PositionRefusal::InvalidForBody(request.state));
        }
        if !request.ignore_restrictions
            && c.position.move_restriction() == somatic_types::MoveRestriction::Restricted
            && request.modifier != PositionModifier::None
            && (request.modifier != c.modifier || request.target != c.target)
        {
            return Some(PositionRefusal::Restricted(c.position));
        }
        if let Some(refusal) = self.target_refusal(request) {
            return Some(refusal);
        }
        if !request.ignore_movement && c.is_moving() {
            return Some(PositionRefusal::Moving);
        }
        if let Some(forced) = c.effects.forced_position()
            && forced != request.state
        {
            return Some(PositionRefusal::Forced(forced));
        }
        if !self.body_allows(request.state) {
            return Some(PositionRefusal::Incapable(request.state));
        }
        if let Some(refusal) = self.footing_refusal(request.state) {
            return Some(refusal);
        }
        let cost = self.position_cost(request.state);
        if cost > 0.0 && !c.stamina().can_spend(cost) {
            return Some(PositionRefusal::TooTired);
        }
        None
    }

    fn target_refusal(&self, request: &PositionRequest) -> Option<PositionRefusal> {
        let c = self.character;
        let Some(target) = request.target else {
            return (request.modifier != PositionModifier::None)
                .then_some(PositionRefusal::MissingTarget);
        };
        let refuses = PositionRefusal::TargetRefuses {
            state: request.state,
            preposition: request.modifier.preposition(),
        };
        match target {
            Perceivable::Character(other) => {
                if other == c.id {
                    return Some(PositionRefusal::SelfTarget);
                }
                if !self.realm.colocated(c.id, other) {
                    return Some(PositionRefusal::TargetNotHere);
                }
                let upright = self
                    .realm
                    .character(other)
                    .is_some_and(|o| o.position.upright());
                match request.modifier {
                    PositionModifier::None | PositionModifier::Behind | PositionModifier::Around => {
                        None
                    }
                    PositionModifier::On if !upright => None,
                    _ => Some(refuses),
                }
            }
            Perceivable::Item(item) => {
                let Some(item) = self.realm.world().item(item) else {
                    return Some(PositionRefusal::TargetNotHere);
                };
                if item.room != c.room || item.layer != c.layer {
                    return Some(PositionRefusal::TargetNotHere);
                }
                (!item.can_be_positioned_against(request.state, request.modifier))
                    .then_some(refuses)
            }
        }
    }

    /// Whether the body can physically hold `state`.
    pub fn body_allows(&self, state: PositionState) -> bool {
        let body = &self.character.body;
        match state {
            PositionState::Floating => true,
            PositionState::Swimming => body.can_swim(),
            _ => match state.class() {
                PostureClass::Standing => body.can_stand(false),
                PostureClass::Kneeling => body.can_kneel(),
                PostureClass::Sitting => body.can_sit_up(),
                PostureClass::Lying => true,
                PostureClass::Climbing => body.can_climb(),
                PostureClass::Swimming => body.can_swim(),
                PostureClass::Flying => body.can_fly(),
            },
        }
    }

    fn footing_refusal(&self, state: PositionState) -> Option<PositionRefusal> {
        let terrain = self.terrain();
        let layer = self.character.layer;
        let aquatic_posture = matches!(state, PositionState::Swimming | PositionState::Floating);
        if terrain.is_water_layer(layer) {
            return (!aquatic_posture).then_some(PositionRefusal::NoFooting(state));
        }
        if aquatic_posture {
            return Some(PositionRefusal::NeedsWater(state));
        }
        if !terrain.has_footing(layer) && !state.safe_from_falling() {
            return Some(PositionRefusal::NoFooting(state));
        }
        None
    }

    /// Stamina needed to move from the current posture to `state`.
    pub fn position_cost(&self, state: PositionState) -> f64 {
        if self.character.position.direction_to(state) == PostureDirection::Up {
            self.realm.config.stamina.posture_up_cost
        } else {
            0.0
        }
    }
}

impl Realm {
    /// Change posture.
    ///
    /// Returns `Ok(Err(_))` with the reason when the change is refused, in
    /// which case nothing is mutated.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a broken
    /// occupancy invariant.
    pub fn move_position(
        &mut self,
        id: CharacterId,
        request: PositionRequest,
    ) -> Result<Result<PositionReport, PositionRefusal>, CharacterError> {
        let cost = {
            let view = self.view(id)?;
            if let Some(refusal) = view.why_cannot_move_position(&request) {
                debug!(character = %id, %refusal, "position change refused");
                return Ok(Err(refusal));
            }
            view.position_cost(request.state)
        };
        let now = self.now_ms();
        let character = self.roster.require_mut(id)?;
        let from = character.position;
        if cost > 0.0 {
            character.body.stamina_mut().spend(cost, now);
        }
        character.position = request.state;
        character.modifier = request.modifier;
        character.target = request.target;
        let (room, name) = (character.room, character.name.clone());

        let text = match request.target {
            Some(target) => format!(
                "{name} {} {} {}.",
                request.state.verb(),
                request.modifier.preposition(),
                self.name_of(target)
            ),
            None => format!("{name} {}.", request.state.verb()),
        };
        debug!(character = %id, ?from, to = ?request.state, "position changed");
        self.echo(room, id, text);

        let knocked_off = if !from.upright() && request.state.upright() {
            self.knock_off_riders(id)?
        } else {
            Vec::new()
        };
        Ok(Ok(PositionReport {
            from,
            to: request.state,
            knocked_off,
        }))
    }

    /// Knock everything resting `On` `origin` to the ground, standing up
    /// any knocked-off character that can, and continue with whatever was
    /// resting on them.
    fn knock_off_riders(&mut self, origin: CharacterId) -> Result<Vec<Perceivable>, CharacterError> {
        let mut knocked = Vec::new();
        let mut visited = BTreeSet::from([origin]);
        let mut queue = VecDeque::from([origin]);

        while let Some(base) = queue.pop_front() {
            let base_ref = Perceivable::Character(base);
            let (room, base_name) = {
                let character = self.roster.require(base)?;
                (character.room, character.name.clone())
            };

            for item in self.items_against(room, base_ref, true) {
                if let Some(item) = self.world.item_mut(item) {
                    item.clear_position();
                    let text = format!("{} falls off {base_name}.", item.name);
                    knocked.push(Perceivable::Item(item.id));
                    self.echo(room, base, text);
                }
            }

            for rider in self.roster.riding(base_ref) {
                if !visited.insert(rider) {
                    continue;
                }
                self.roster.require_mut(rider)?.clear_position_target();
                let cost = self.scramble_cost(rider)?;
                let stands = cost.is_some();
                let now = self.now_ms();
                let character = self.roster.require_mut(rider)?;
                if let Some(cost) = cost {
                    if cost > 0.0 {
                        character.body.stamina_mut().spend(cost, now);
                    }
                    character.position = PositionState::Standing;
                }
                let text = if stands {
                    format!(
                        "{} is knocked off {base_name} and scrambles upright.",
                        character.name
                    )
                } else {
                    format!("{} is knocked off {base_name}.", character.name)
                };
                knocked.push(Perceivable::Character(rider));
                self.echo(room, rider, text);
                if stands {
                    queue.push_back(rider);
                }
            }
        }
        Ok(knocked)
    }

    /// Stamina a knocked-off rider spends scrambling upright, or `None`
    /// when the rider stays down under the ordinary posture rules.
    fn scramble_cost(&self, rider: CharacterId) -> Result<Option<f64>, CharacterError> {
        let view = self.view(rider)?;
        if view.character().position.upright() {
            return Ok(None);
        }
        let stand = PositionRequest::new(PositionState::Standing).ignoring_movement();
        if let Some(refusal) = view.why_cannot_move_position(&stand) {
            debug!(character = %rider, %refusal, "knocked-off rider stays down");
            return Ok(None);
        }
        Ok(Some(view.position_cost(PositionState::Standing)))
    }
}
