//! Movement through exits.
//!
//! A move is planned against a [`CharacterView`], begun by
//! [`Realm::begin_move`] (which spends stamina, applies any forced posture
//! and records a [`Movement`]), and completed later by
//! [`Realm::complete_move`] when the scheduled arrival fires. Arrival
//! settles the mover into the destination: posture follows the layer,
//! branch-to-branch crossings roll for a slip, melee range is refreshed and
//! the next queued move starts.
//!
//! # Speed model
//!
//! ```text
//! (base * (1 + encumbrance * factor) + wounds * penalty + jitter)
//!     * exit * effects * posture * sight * terrain * aided * exertion * kind
//! ```
//!
//! The jitter only breaks ties between simultaneous movers.

use rand::Rng;
use somatic_types::{
    CharacterId, CheckType, CombatStatus, Difficulty, ExitId, MoveRestriction, MovementKind,
    MovementPhase, Outcome, Perceivable, PositionModifier, PositionState, RoomId, RoomLayer,
    Size, TransitionType,
};
use somatic_world::{Exit, Room};
use tracing::{debug, warn};

use crate::character::{MoveRequest, Movement};
use crate::error::CharacterError;
use crate::flight::FallStart;
use crate::realm::{CharacterView, Realm};
use crate::refusal::{MoveRefusal, StopRefusal};
use crate::stamina::{drag_multiplier, movement_cost, skill_cost_multiplier};

/// Longest movement the engine will schedule, in game milliseconds.
const MAX_DURATION_MS: f64 = 1_000_000_000.0;

/// Everything decided about a move before it begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlan {
    /// Exit to cross.
    pub exit: ExitId,
    /// Destination room.
    pub to: RoomId,
    /// How the crossing is classified.
    pub transition: TransitionType,
    /// Posture the mover takes for the crossing, if any. Either forced by
    /// the exit or the posture's own transition on movement.
    pub posture: Option<PositionState>,
    /// Layer the mover arrives at.
    pub arrival_layer: RoomLayer,
    /// Stamina the move costs.
    pub cost: f64,
    /// Whether every rule was skipped.
    pub bypass: bool,
}

/// A move that has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// Token the arrival must present.
    pub token: u64,
    /// Game milliseconds until arrival.
    pub duration_ms: u64,
    /// Exit being crossed.
    pub exit: ExitId,
    /// Destination room.
    pub to: RoomId,
    /// How the crossing is classified.
    pub transition: TransitionType,
}

/// A completed arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalReport {
    /// Room arrived in.
    pub room: RoomId,
    /// Layer arrived at.
    pub layer: RoomLayer,
    /// A fall that started on arrival.
    pub fall: Option<FallStart>,
    /// The queued move that began straight after.
    pub next: Option<MoveReport>,
    /// Whether arriving ended the character's flight from combat.
    pub fled: bool,
}

/// Result of [`Realm::queue_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The character was idle and the move began at once.
    Started(MoveReport),
    /// The move was queued; the queue now holds this many.
    Queued(usize),
}

/// Result of [`Realm::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    /// Whether a movement in progress was cancelled.
    pub cancelled: bool,
    /// Number of queued moves dropped.
    pub cleared: usize,
}

/// Movement time multiplier for crutch-walking with the given outcome.
const fn aided_walking_multiplier(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::MajorPass => 1.25,
        Outcome::Pass => 1.5,
        Outcome::MinorPass => 1.75,
        Outcome::MinorFail => 2.0,
        Outcome::Fail => 2.4,
        Outcome::MajorFail => 2.8,
    }
}

/// The visibility difficulty a mover actually faces after a sight check.
fn effective_light(light: Difficulty, outcome: Outcome) -> Difficulty {
    match outcome {
        Outcome::MajorPass => Difficulty::Trivial,
        Outcome::Pass => light.easier(4),
        Outcome::MinorPass => light.easier(2),
        Outcome::MinorFail => light,
        Outcome::Fail => light.harder(1),
        Outcome::MajorFail => light.harder(2),
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn duration_from_ms(ms: f64) -> u64 {
    if !ms.is_finite() {
        warn!(ms, "non-finite movement duration");
        return MAX_DURATION_MS as u64;
    }
    ms.clamp(1.0, MAX_DURATION_MS).round() as u64
}

impl CharacterView<'_> {
    /// Whether a move through the exit would be allowed.
    pub fn can_move(&self, request: &MoveRequest) -> bool {
        self.plan_move(request).is_ok()
    }

    /// The first rule the move breaks, if any.
    pub fn why_cannot_move(&self, request: &MoveRequest) -> Option<MoveRefusal> {
        self.plan_move(request).err()
    }

    /// Plan a move without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`MoveRefusal`] that applies.
    pub fn plan_move(&self, request: &MoveRequest) -> Result<MovePlan, MoveRefusal> {
        let c = self.character;
        if !c.consciousness.can_act() {
            return Err(MoveRefusal::NotAwake(c.consciousness));
        }
        let world = self.realm.world();
        let exit = world
            .exit_by_keyword(c.room, &request.keyword)
            .ok_or(MoveRefusal::NoSuchExit)?;
        let destination = world.room(exit.to).ok_or(MoveRefusal::NoSuchExit)?;
        if c.is_moving() {
            return Err(MoveRefusal::AlreadyMoving);
        }
        if c.is_falling() {
            return Err(MoveRefusal::Falling);
        }
        if c.melee_range && c.combat_status != CombatStatus::Fleeing {
            return Err(MoveRefusal::InMelee);
        }
        let transition = exit.transition_type(self.terrain(), &destination.terrain, c.layer);

        if c.effects.ignores_movement() {
            return Ok(MovePlan {
                exit: exit.id,
                to: exit.to,
                transition,
                posture: self.movement_transition(),
                arrival_layer: exit.arrival_layer(&destination.terrain, c.layer),
                cost: 0.0,
                bypass: true,
            });
        }

        if !request.ignore_blockers
            && let Some(reason) = c.effects.blocking("move")
        {
            return Err(MoveRefusal::Blocked(reason));
        }
        match c.position.move_restriction() {
            MoveRestriction::Restricted => return Err(MoveRefusal::Restricted(c.position)),
            MoveRestriction::FreeIfNotInOn if c.modifier.is_in_or_on() => {
                let way = if c.modifier == PositionModifier::In {
                    "out of"
                } else {
                    "off"
                };
                return Err(MoveRefusal::Enclosed(way));
            }
            _ => {}
        }

        let dragged = match (request.kind, request.dragging) {
            (MovementKind::Drag, Some(what)) => Some(self.drag_load(what)?),
            (MovementKind::Drag, None) => return Err(MoveRefusal::DragTargetNotHere),
            _ => None,
        };

        let crossing = self.crossing(exit, destination, transition, request);
        let posture = crossing
            .as_ref()
            .ok()
            .copied()
            .flatten()
            .or_else(|| self.movement_transition())
            .unwrap_or(c.position);
        let cost = self.move_cost(exit, destination, posture, dragged.map(|(weight, _)| weight));
        if !c.stamina().can_spend(cost) {
            return Err(MoveRefusal::TooTired);
        }
        if !exit.admits(c.body.size()) {
            return Err(MoveRefusal::TooBig);
        }
        if let Some((_, size)) = dragged
            && !exit.admits(size)
        {
            return Err(MoveRefusal::DragTooBig);
        }
        let switch = crossing?;

        let arrival_layer = if switch.unwrap_or(c.position) == PositionState::Flying {
            destination.terrain.nearest_layer(c.layer)
        } else {
            exit.arrival_layer(&destination.terrain, c.layer)
        };
        Ok(MovePlan {
            exit: exit.id,
            to: exit.to,
            transition,
            posture: switch.or_else(|| self.movement_transition()),
            arrival_layer,
            cost,
            bypass: false,
        })
    }

    /// The posture the current one drops into while moving, when the body
    /// can hold it and no effect pins another posture.
    fn movement_transition(&self) -> Option<PositionState> {
        let c = self.character;
        c.position
            .transition_on_movement()
            .filter(|p| c.body.is_valid_position(*p) && self.body_allows(*p))
            .filter(|p| c.effects.forced_position().is_none_or(|forced| forced == *p))
    }

    /// Weight and size of something the character wants to drag.
    fn drag_load(&self, what: Perceivable) -> Result<(f64, Size), MoveRefusal> {
        let c = self.character;
        match what {
            Perceivable::Character(other) if other != c.id && self.realm.colocated(c.id, other) => {
                self.realm
                    .character(other)
                    .map(|o| (o.body.weight(), o.body.size()))
                    .ok_or(MoveRefusal::DragTargetNotHere)
            }
            Perceivable::Item(item) => self
                .realm
                .world()
                .item(item)
                .filter(|i| i.room == c.room && i.layer == c.layer)
                .map(|i| (i.weight, i.size))
                .ok_or(MoveRefusal::DragTargetNotHere),
            Perceivable::Character(_) => Err(MoveRefusal::DragTargetNotHere),
        }
    }

    /// Decide whether the crossing is possible and which posture it forces.
    fn crossing(
        &self,
        exit: &Exit,
        destination: &Room,
        transition: TransitionType,
        request: &MoveRequest,
    ) -> Result<Option<PositionState>, MoveRefusal> {
        let c = self.character;
        let body = &c.body;
        let insist = request.ignore_safe_movement;
        let flying = c.position == PositionState::Flying;
        match transition {
            TransitionType::FallExit => {
                if flying || insist {
                    Ok(None)
                } else {
                    Err(MoveRefusal::UnsafeDrop)
                }
            }
            TransitionType::FlyOnly => {
                if flying || (c.position == PositionState::Climbing && exit.climbable) {
                    return Ok(None);
                }
                if exit.climbable
                    && body.can_climb()
                    && body.is_valid_position(PositionState::Climbing)
                {
                    return Ok(Some(PositionState::Climbing));
                }
                if body.can_fly() {
                    return if insist {
                        Ok(Some(PositionState::Flying))
                    } else {
                        Err(MoveRefusal::UnsafeFlight)
                    };
                }
                Err(MoveRefusal::MustFly)
            }
            TransitionType::SwimOnly => {
                if matches!(c.position, PositionState::Swimming | PositionState::Floating) {
                    return Ok(None);
                }
                if exit.swim_only && !body.can_swim() {
                    return Err(MoveRefusal::MustSwim);
                }
                if !insist {
                    let drowning = self.realm.oracle.would_be_abject_failure(
                        c.skill(CheckType::StayAfloat),
                        CheckType::StayAfloat,
                        destination.terrain.stay_afloat_difficulty(),
                    );
                    return Err(MoveRefusal::UnsafeSwim { drowning });
                }
                Ok(Some(if body.can_swim() {
                    PositionState::Swimming
                } else {
                    PositionState::Floating
                }))
            }
            TransitionType::TreesToTrees => {
                if flying || body.can_climb() {
                    Ok(None)
                } else {
                    Err(MoveRefusal::MustClimb)
                }
            }
            TransitionType::Normal | TransitionType::SwimToLand => Ok(None),
        }
    }

    /// Stamina cost of crossing `exit` in `posture`.
    fn move_cost(
        &self,
        exit: &Exit,
        destination: &Room,
        posture: PositionState,
        dragged_weight: Option<f64>,
    ) -> f64 {
        let c = self.character;
        let config = &self.realm.config.stamina;
        let base = match posture {
            PositionState::Flying => {
                config.fly_cost
                    * skill_cost_multiplier(
                        config,
                        self.target_number(CheckType::Fly, Difficulty::Normal),
                    )
            }
            PositionState::Swimming | PositionState::Floating => {
                config.swim_cost
                    * skill_cost_multiplier(
                        config,
                        self.target_number(
                            CheckType::Swim,
                            destination.terrain.stay_afloat_difficulty(),
                        ),
                    )
            }
            PositionState::Climbing => {
                config.climb_cost
                    * skill_cost_multiplier(
                        config,
                        self.target_number(CheckType::Climb, exit.climb_difficulty),
                    )
            }
            _ => config.base_move_cost,
        };
        let drag = dragged_weight.map_or(1.0, |weight| {
            drag_multiplier(config, weight, c.body.carrying_capacity())
        });
        movement_cost(
            config,
            base,
            c.body.speed(posture).stamina_multiplier,
            c.body.encumbrance(),
            drag,
        )
    }
}

impl Realm {
    /// Begin crossing an exit.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a broken
    /// occupancy invariant.
    pub fn begin_move(
        &mut self,
        id: CharacterId,
        request: MoveRequest,
    ) -> Result<Result<MoveReport, MoveRefusal>, CharacterError> {
        let (plan, exit_time, keyword) = {
            let view = self.view(id)?;
            match view.plan_move(&request) {
                Ok(plan) => {
                    let exit = self.world.require_exit(plan.exit)?;
                    (plan, exit.time_multiplier, exit.keyword.clone())
                }
                Err(refusal) => {
                    debug!(character = %id, %refusal, "move refused");
                    return Ok(Err(refusal));
                }
            }
        };
        let now = self.now_ms();
        let (room, name) = {
            let character = self.roster.require(id)?;
            (character.room, character.name.clone())
        };

        let character = self.roster.require_mut(id)?;
        let forced = plan.posture.filter(|p| *p != character.position);
        character.clear_position_target();
        if !plan.bypass {
            character.body.stamina_mut().spend(plan.cost, now);
        }
        if let Some(posture) = forced {
            character.position = posture;
            self.echo(room, id, format!("{name} {}.", posture.verb()));
        }
        self.release_positioned_against(Perceivable::Character(id), room);

        let duration_ms = self.move_speed(id, exit_time, request.kind)?;
        let token = self.next_token();
        let movement = Movement {
            token,
            exit: plan.exit,
            from: room,
            to: plan.to,
            arrival_layer: plan.arrival_layer,
            kind: request.kind,
            transition: plan.transition,
            started_at: now,
            duration_ms,
            phase: MovementPhase::OriginalRoom,
            dragging: request.dragging,
        };
        self.roster.require_mut(id)?.movement = Some(movement);
        debug!(character = %id, to = %plan.to, duration_ms, transition = ?plan.transition, "move begun");
        if request.kind != MovementKind::Stealth {
            self.echo(room, id, format!("{name} leaves {keyword}."));
        }
        Ok(Ok(MoveReport {
            token,
            duration_ms,
            exit: plan.exit,
            to: plan.to,
            transition: plan.transition,
        }))
    }

    /// Game milliseconds a crossing takes.
    fn move_speed(
        &mut self,
        id: CharacterId,
        exit_time: f64,
        kind: MovementKind,
    ) -> Result<u64, CharacterError> {
        let cfg = self.config.movement.clone();
        let (encumbrance, wounds, effects, posture, light, terrain_rate, strain) = {
            let c = self.roster.require(id)?;
            let room = self.world.require_room(c.room)?;
            (
                c.body.encumbrance(),
                c.body.wound_total(),
                c.effects.speed_multiplier(),
                c.body.speed(c.position).multiplier,
                room.light_difficulty,
                room.terrain.movement_rate,
                c.stamina().exertion().strain(),
            )
        };
        let jitter = if cfg.tiebreak_ms > 0.0 {
            self.rng.random_range(0.0..cfg.tiebreak_ms)
        } else {
            0.0
        };
        let base = wounds.mul_add(
            cfg.wound_penalty_ms,
            cfg.base_speed_ms * encumbrance.mul_add(cfg.encumbrance_speed_factor, 1.0),
        ) + jitter;
        let sight = self.sight_multiplier(id, light)?;
        let aided = self.aided_walking_penalty(id)?;
        let exertion = f64::from(strain).mul_add(cfg.exertion_penalty, 1.0);
        let kind = match kind {
            MovementKind::Stealth => cfg.stealth_time_multiplier,
            MovementKind::Drag => cfg.drag_time_multiplier,
            _ => 1.0,
        };
        let total =
            base * exit_time * effects * posture * sight * terrain_rate * aided * exertion * kind;
        Ok(duration_from_ms(total))
    }

    fn sight_multiplier(&mut self, id: CharacterId, light: Difficulty) -> Result<f64, CharacterError> {
        if light <= Difficulty::Trivial {
            return Ok(light.sight_speed_multiplier());
        }
        let outcome = self.roll(id, CheckType::Visibility, light)?.outcome;
        Ok(effective_light(light, outcome).sight_speed_multiplier())
    }

    fn aided_walking_penalty(&mut self, id: CharacterId) -> Result<f64, CharacterError> {
        let needs_aid = {
            let c = self.roster.require(id)?;
            c.position.upright()
                && !matches!(c.position, PositionState::Flying | PositionState::Climbing)
                && !c.body.can_stand(true)
                && c.body.can_stand(false)
        };
        if !needs_aid {
            return Ok(1.0);
        }
        let outcome = self
            .roll(id, CheckType::AidedWalking, Difficulty::Normal)?
            .outcome;
        Ok(aided_walking_multiplier(outcome))
    }

    /// Finish a movement whose scheduled arrival has fired.
    ///
    /// A stale token (the move was stopped or superseded) is ignored and
    /// returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a broken
    /// occupancy invariant.
    pub fn complete_move(
        &mut self,
        id: CharacterId,
        token: u64,
    ) -> Result<Option<ArrivalReport>, CharacterError> {
        let movement = {
            let character = self.roster.require_mut(id)?;
            let Some(stored) = character.movement.as_mut().filter(|m| m.token == token) else {
                debug!(character = %id, token, "stale arrival ignored");
                return Ok(None);
            };
            stored.phase = MovementPhase::NewRoom;
            stored.clone()
        };
        let layer = self
            .world
            .require_room(movement.to)?
            .terrain
            .nearest_layer(movement.arrival_layer);
        self.relocate(id, movement.to, layer)?;
        if let Some(what) = movement.dragging {
            self.drag_along(id, what, movement.from, movement.to, layer)?;
        }
        // The crossing is over once mover and load are in place.
        self.roster.require_mut(id)?.movement = None;

        let mut fall = self.arrival_climb_check(id, &movement)?;
        if fall.is_none() {
            fall = self.settle_arrival(id)?;
        }
        let fled = self.check_flee_success(id)?;

        let name = self.roster.require(id)?.name.clone();
        if movement.kind != MovementKind::Stealth {
            self.echo(movement.to, id, format!("{name} arrives."));
        }

        let next = if fall.is_none() {
            self.begin_next_queued(id)?
        } else {
            self.roster.require_mut(id)?.queue.clear();
            None
        };
        let layer = self.roster.require(id)?.layer;
        Ok(Some(ArrivalReport {
            room: movement.to,
            layer,
            fall,
            next,
            fled,
        }))
    }

    /// Pull a dragged item or character along to the mover's new room.
    fn drag_along(
        &mut self,
        id: CharacterId,
        what: Perceivable,
        from: RoomId,
        to: RoomId,
        layer: RoomLayer,
    ) -> Result<(), CharacterError> {
        match what {
            Perceivable::Item(item) => {
                if self.world.item(item).is_some_and(|i| i.room == from) {
                    self.world.relocate_item(item, to, layer)?;
                    if let Some(item) = self.world.item_mut(item) {
                        item.clear_position();
                    }
                }
            }
            Perceivable::Character(other) => {
                let present = self
                    .roster
                    .get(other)
                    .is_some_and(|o| o.room == from && !o.is_moving());
                if present && other != id {
                    self.relocate(other, to, layer)?;
                    let dragged = self.roster.require_mut(other)?;
                    dragged.clear_position_target();
                    let text = format!("{} is dragged in.", dragged.name);
                    self.echo(to, other, text);
                }
            }
        }
        Ok(())
    }

    /// Put the mover in the posture its new layer demands.
    fn settle_arrival(&mut self, id: CharacterId) -> Result<Option<FallStart>, CharacterError> {
        let (room, layer) = {
            let c = self.roster.require(id)?;
            (c.room, c.layer)
        };
        let terrain = &self.world.require_room(room)?.terrain;
        let wet = terrain.is_water_layer(layer);
        let footing = terrain.has_footing(layer);

        let character = self.roster.require_mut(id)?;
        let body = &character.body;
        let position = character.position;
        let next = if wet {
            match position {
                PositionState::Swimming | PositionState::Floating => None,
                _ if body.can_swim() => Some(PositionState::Swimming),
                _ => Some(PositionState::Floating),
            }
        } else if !footing {
            match position {
                PositionState::Flying => None,
                _ if body.can_fly() && body.is_valid_position(PositionState::Flying) => {
                    Some(PositionState::Flying)
                }
                _ => return self.start_fall(id).map(Some),
            }
        } else {
            match position {
                PositionState::Swimming | PositionState::Floating | PositionState::Climbing => {
                    if body.can_stand(false) && body.is_valid_position(PositionState::Standing) {
                        Some(PositionState::Standing)
                    } else {
                        Some(PositionState::Prostrate)
                    }
                }
                _ => None,
            }
        };
        if let Some(posture) = next {
            character.position = posture;
            let text = format!("{} {}.", character.name, posture.verb());
            self.echo(room, id, text);
        }
        Ok(None)
    }

    /// Roll for a slip after climbing across to new branches or up a cliff.
    fn arrival_climb_check(
        &mut self,
        id: CharacterId,
        movement: &Movement,
    ) -> Result<Option<FallStart>, CharacterError> {
        let (flying, climbed) = {
            let c = self.roster.require(id)?;
            (
                c.position == PositionState::Flying,
                c.position == PositionState::Climbing,
            )
        };
        if flying {
            return Ok(None);
        }
        let difficulty = match movement.transition {
            TransitionType::TreesToTrees => {
                self.world.require_room(movement.to)?.terrain.climb_difficulty
            }
            TransitionType::FlyOnly if climbed => {
                self.world.require_exit(movement.exit)?.climb_difficulty
            }
            _ => return Ok(None),
        };
        let (outcome, fell) = self.climb_roll(id, difficulty)?;
        debug!(character = %id, ?outcome, fell, "climb across");
        if fell {
            return self.start_fall(id).map(Some);
        }
        Ok(None)
    }

    fn begin_next_queued(&mut self, id: CharacterId) -> Result<Option<MoveReport>, CharacterError> {
        let Some(request) = self.roster.require_mut(id)?.queue.pop_front() else {
            return Ok(None);
        };
        match self.begin_move(id, request)? {
            Ok(report) => Ok(Some(report)),
            Err(refusal) => {
                debug!(character = %id, %refusal, "queued move refused; queue cleared");
                self.roster.require_mut(id)?.queue.clear();
                Ok(None)
            }
        }
    }

    /// Begin a move now if idle, otherwise queue it behind the current one.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn queue_move(
        &mut self,
        id: CharacterId,
        request: MoveRequest,
    ) -> Result<Result<QueueOutcome, MoveRefusal>, CharacterError> {
        let character = self.roster.require_mut(id)?;
        if character.is_moving() {
            character.queue.push_back(request);
            return Ok(Ok(QueueOutcome::Queued(character.queue.len())));
        }
        Ok(self.begin_move(id, request)?.map(QueueOutcome::Started))
    }

    /// Stop moving and drop the queue.
    ///
    /// Blocking effects can prevent a voluntary stop; `force` overrides
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn stop(
        &mut self,
        id: CharacterId,
        force: bool,
    ) -> Result<Result<StopReport, StopRefusal>, CharacterError> {
        let character = self.roster.require_mut(id)?;
        if !character.is_moving() && character.queue.is_empty() {
            return Ok(Err(StopRefusal::NotMoving));
        }
        if !force && let Some(reason) = character.effects.blocking("stop") {
            return Ok(Err(StopRefusal::Blocked(reason)));
        }
        let cleared = character.queue.len();
        character.queue.clear();
        let cancelled = character.movement.take().is_some();
        let (room, text) = (character.room, format!("{} stops.", character.name));
        self.echo(room, id, text);
        Ok(Ok(StopReport { cancelled, cleared }))
    }

    /// Cancel movement without any echo, for teardown paths.
    ///
    /// Returns whether a movement was in progress.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::CharacterNotFound`] for an unknown id.
    pub fn cancel_for_mover_only(&mut self, id: CharacterId) -> Result<bool, CharacterError> {
        let character = self.roster.require_mut(id)?;
        character.queue.clear();
        Ok(character.movement.take().is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use somatic_world::Item;

    use super::*;
    use crate::body::{LimbBody, LimbKind};
    use crate::character::Character;
    use crate::effects::{Effect, EffectKind};
    use crate::realm::tests::{realm, realm_with, spawn, spawn_winged};
    use crate::skill_check::ScriptedOracle;

    fn arrive(realm: &mut Realm, id: CharacterId) -> ArrivalReport {
        let token = realm.character(id).unwrap().movement.as_ref().unwrap().token;
        realm.complete_move(id, token).unwrap().unwrap()
    }

    #[test]
    fn walking_moves_between_rooms() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let before = realm.character(a).unwrap().stamina().current();
        let report = realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        assert_eq!(report.to, ids.forest_edge);
        assert!(report.duration_ms > 0);
        assert!(realm.character(a).unwrap().stamina().current() < before);
        let arrival = arrive(&mut realm, a);
        assert_eq!(arrival.room, ids.forest_edge);
        assert!(realm.world().room(ids.forest_edge).unwrap().contains(a));
        assert!(!realm.world().room(ids.meadow).unwrap().contains(a));
        assert!(!realm.character(a).unwrap().is_moving());
    }

    #[test]
    fn moving_blocks_a_second_move() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        assert_eq!(
            realm.begin_move(a, MoveRequest::new("west")).unwrap(),
            Err(MoveRefusal::AlreadyMoving)
        );
    }

    #[test]
    fn stale_arrival_is_ignored() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let report = realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        realm.stop(a, false).unwrap().unwrap();
        assert!(realm.complete_move(a, report.token).unwrap().is_none());
        assert_eq!(realm.character(a).unwrap().room, ids.meadow);
    }

    #[test]
    fn mismatched_arrival_leaves_the_pending_move_alone() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let report = realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        let stale = report.token.wrapping_add(1);
        assert!(realm.complete_move(a, stale).unwrap().is_none());
        let movement = realm.character(a).unwrap().movement.clone().unwrap();
        assert_eq!(movement.phase, MovementPhase::OriginalRoom);
        assert_eq!(realm.character(a).unwrap().room, ids.meadow);

        let arrival = realm.complete_move(a, report.token).unwrap().unwrap();
        assert_eq!(arrival.room, ids.forest_edge);
        assert!(realm.character(a).unwrap().movement.is_none());
    }

    #[test]
    fn fly_only_exit_needs_flight() {
        let (mut realm, ids) = realm();
        let mut body = LimbBody::humanoid(100.0);
        body.sever_all(LimbKind::Arm);
        let a = realm
            .login(Character::new("Armless", ids.meadow, Box::new(body)))
            .unwrap();
        let refusal = realm
            .view(a)
            .unwrap()
            .why_cannot_move(&MoveRequest::new("up"))
            .unwrap();
        assert_eq!(refusal, MoveRefusal::MustFly);
        assert!(refusal.to_string().contains("must be able to fly"));
    }

    #[test]
    fn climbable_fly_only_exit_switches_to_climbing() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Climber", ids.meadow);
        let plan = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("up"))
            .unwrap();
        assert_eq!(plan.posture, Some(PositionState::Climbing));
        realm.begin_move(a, MoveRequest::new("up")).unwrap().unwrap();
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Climbing
        );
        let arrival = arrive(&mut realm, a);
        assert_eq!(arrival.room, ids.ledge);
        assert!(arrival.fall.is_none());
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Standing
        );
    }

    #[test]
    fn flyers_must_insist_on_fly_only_exits() {
        let (mut realm, ids) = realm();
        let mut body = LimbBody::winged(100.0);
        body.sever_all(LimbKind::Arm);
        let a = realm
            .login(Character::new("Bird", ids.meadow, Box::new(body)))
            .unwrap();
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("up")),
            Some(MoveRefusal::UnsafeFlight)
        );
        let plan = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("up").insist())
            .unwrap();
        assert_eq!(plan.posture, Some(PositionState::Flying));
    }

    #[test]
    fn swimming_needs_insistence_and_warns_of_drowning() {
        let (mut realm, ids) = realm_with(ScriptedOracle::always_pass().abject());
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let refusal = realm
            .view(a)
            .unwrap()
            .why_cannot_move(&MoveRequest::new("south"))
            .unwrap();
        assert_eq!(refusal, MoveRefusal::UnsafeSwim { drowning: true });
        let text = refusal.to_string();
        assert!(text.contains("Insist"));
        assert!(text.contains("**You are very likely to drown!**"));

        let (mut calm, ids) = crate::realm::tests::realm();
        let b = spawn(&mut calm, "Bo", ids.meadow);
        assert_eq!(
            calm.view(b).unwrap().why_cannot_move(&MoveRequest::new("south")),
            Some(MoveRefusal::UnsafeSwim { drowning: false })
        );
        calm.begin_move(b, MoveRequest::new("south").insist())
            .unwrap()
            .unwrap();
        arrive(&mut calm, b);
        assert_eq!(
            calm.character(b).unwrap().position,
            PositionState::Swimming
        );
    }

    #[test]
    fn leaving_the_water_stands_up() {
        let (mut realm, ids) = realm();
        let a = realm
            .login(
                Character::new("Fish", ids.river, Box::new(LimbBody::humanoid(100.0)))
                    .in_position(PositionState::Swimming),
            )
            .unwrap();
        realm.begin_move(a, MoveRequest::new("north")).unwrap().unwrap();
        arrive(&mut realm, a);
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Standing
        );
    }

    #[test]
    fn sitting_must_stand_first() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm.character_mut(a).unwrap().position = PositionState::Sitting;
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("east")),
            Some(MoveRefusal::Restricted(PositionState::Sitting))
        );
    }

    #[test]
    fn kneeling_drops_prostrate_to_move() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm.character_mut(a).unwrap().position = PositionState::Kneeling;
        realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Prostrate
        );
    }

    #[test]
    fn pinned_kneeler_keeps_kneeling_on_the_move() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let c = realm.character_mut(a).unwrap();
        c.position = PositionState::Kneeling;
        c.effects.add(Effect::new(EffectKind::ForcePosition {
            state: PositionState::Kneeling,
        }));
        let plan = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("east"))
            .unwrap();
        assert_eq!(plan.posture, None);
        realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Kneeling
        );
    }

    #[test]
    fn limbless_floater_drifts_out_without_swimming() {
        let (mut realm, ids) = realm();
        let mut body = LimbBody::humanoid(100.0);
        body.sever_all(LimbKind::Arm);
        body.sever_all(LimbKind::Leg);
        let a = realm
            .login(
                Character::new("Log", ids.river, Box::new(body))
                    .in_position(PositionState::Floating),
            )
            .unwrap();
        assert!(!realm.character(a).unwrap().body.can_swim());

        let plan = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("north"))
            .unwrap();
        assert_eq!(plan.posture, None);
        realm.begin_move(a, MoveRequest::new("north")).unwrap().unwrap();
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Floating
        );
    }

    #[test]
    fn swimmer_afloat_starts_swimming_to_move() {
        let (mut realm, ids) = realm();
        let a = realm
            .login(
                Character::new("Fish", ids.river, Box::new(LimbBody::humanoid(100.0)))
                    .in_position(PositionState::Floating),
            )
            .unwrap();
        realm.begin_move(a, MoveRequest::new("north")).unwrap().unwrap();
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Swimming
        );
    }

    #[test]
    fn blocking_effect_stops_movement_unless_forced() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::Block {
                actions: vec!["move".into()],
                reason: "Your feet are frozen to the ground.".into(),
            }));
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("east")),
            Some(MoveRefusal::Blocked(
                "Your feet are frozen to the ground.".into()
            ))
        );
        assert!(realm
            .view(a)
            .unwrap()
            .can_move(&MoveRequest::new("east").forced()));
    }

    #[test]
    fn too_big_for_the_shrine_door() {
        let (mut realm, ids) = realm();
        let body = LimbBody::humanoid(100.0).with_size(Size::Huge);
        let a = realm
            .login(Character::new("Giant", ids.town, Box::new(body)))
            .unwrap();
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("in")),
            Some(MoveRefusal::TooBig)
        );
    }

    #[test]
    fn exhausted_characters_cannot_move() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm
            .character_mut(a)
            .unwrap()
            .body
            .stamina_mut()
            .spend(100.0, 0);
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("east")),
            Some(MoveRefusal::TooTired)
        );
    }

    #[test]
    fn dragging_costs_more_and_brings_the_load() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let sack = realm
            .world_mut()
            .add_item(
                Item::new("a sack", ids.meadow, RoomLayer::GroundLevel)
                    .with_bulk(30.0, Size::Small),
            )
            .unwrap();
        let walk = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("east"))
            .unwrap();
        let drag = realm
            .view(a)
            .unwrap()
            .plan_move(&MoveRequest::new("east").dragging(Perceivable::Item(sack)))
            .unwrap();
        assert!(drag.cost >= walk.cost * 2.0);
        realm
            .begin_move(a, MoveRequest::new("east").dragging(Perceivable::Item(sack)))
            .unwrap()
            .unwrap();
        arrive(&mut realm, a);
        assert_eq!(realm.world().item(sack).unwrap().room, ids.forest_edge);
    }

    #[test]
    fn dragging_something_absent_is_refused() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bo", ids.river);
        assert_eq!(
            realm
                .view(a)
                .unwrap()
                .why_cannot_move(&MoveRequest::new("east").dragging(Perceivable::Character(b))),
            Some(MoveRefusal::DragTargetNotHere)
        );
    }

    #[test]
    fn stealthy_moves_take_longer_and_stay_quiet() {
        let mut walk_config = crate::config::RulesConfig::default();
        walk_config.movement.tiebreak_ms = 0.0;
        let (world, ids) = somatic_world::create_starting_world().unwrap();
        let mut realm = Realm::new(
            world,
            walk_config,
            Box::new(ScriptedOracle::always_pass()),
            7,
        );
        let a = spawn(&mut realm, "A", ids.meadow);
        let b = spawn(&mut realm, "B", ids.meadow);
        realm.drain_echoes();
        let normal = realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        let sneaky = realm
            .begin_move(b, MoveRequest::new("east").kind(MovementKind::Stealth))
            .unwrap()
            .unwrap();
        assert!(sneaky.duration_ms > normal.duration_ms);
        let echoes = realm.drain_echoes();
        assert_eq!(echoes.len(), 1);
        assert!(echoes.iter().all(|e| e.actor == Some(a)));
    }

    #[test]
    fn queued_moves_chain_on_arrival() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        assert!(matches!(
            realm.queue_move(a, MoveRequest::new("east")).unwrap(),
            Ok(QueueOutcome::Started(_))
        ));
        assert_eq!(
            realm.queue_move(a, MoveRequest::new("north")).unwrap(),
            Ok(QueueOutcome::Queued(1))
        );
        let arrival = arrive(&mut realm, a);
        let next = arrival.next.unwrap();
        assert_eq!(next.to, ids.deep_wood);
        arrive(&mut realm, a);
        assert_eq!(realm.character(a).unwrap().room, ids.deep_wood);
    }

    #[test]
    fn stop_clears_the_queue() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm.queue_move(a, MoveRequest::new("east")).unwrap().unwrap();
        realm.queue_move(a, MoveRequest::new("north")).unwrap().unwrap();
        let report = realm.stop(a, false).unwrap().unwrap();
        assert_eq!(report, StopReport { cancelled: true, cleared: 1 });
        assert_eq!(realm.stop(a, false).unwrap(), Err(StopRefusal::NotMoving));
    }

    #[test]
    fn stop_can_be_blocked() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        realm.begin_move(a, MoveRequest::new("east")).unwrap().unwrap();
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::Block {
                actions: vec!["stop".into()],
                reason: "You are swept along.".into(),
            }));
        assert!(matches!(
            realm.stop(a, false).unwrap(),
            Err(StopRefusal::Blocked(_))
        ));
        assert!(realm.stop(a, true).unwrap().is_ok());
    }

    #[test]
    fn jumping_off_the_ledge_needs_insistence_then_falls() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.ledge);
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("jump")),
            Some(MoveRefusal::UnsafeDrop)
        );
        realm
            .begin_move(a, MoveRequest::new("jump").insist())
            .unwrap()
            .unwrap();
        let arrival = arrive(&mut realm, a);
        assert_eq!(arrival.room, ids.meadow);
        assert!(arrival.fall.is_some());
        assert!(realm.character(a).unwrap().is_falling());
    }

    #[test]
    fn trees_to_trees_needs_climbing() {
        let (mut realm, ids) = realm();
        let mut body = LimbBody::humanoid(100.0);
        body.sever_all(LimbKind::Arm);
        let a = realm
            .login(
                Character::new("Stumpy", ids.forest_edge, Box::new(body))
                    .on_layer(RoomLayer::InTrees),
            )
            .unwrap();
        assert_eq!(
            realm.view(a).unwrap().why_cannot_move(&MoveRequest::new("north")),
            Some(MoveRefusal::MustClimb)
        );
    }

    #[test]
    fn confirmed_slip_between_trees_falls() {
        let oracle = ScriptedOracle::always_pass().then([Outcome::MajorFail, Outcome::MajorFail]);
        let (mut realm, ids) = realm_with(oracle);
        let a = realm
            .login(
                Character::new("Ayla", ids.forest_edge, Box::new(LimbBody::humanoid(100.0)))
                    .on_layer(RoomLayer::InTrees),
            )
            .unwrap();
        realm.begin_move(a, MoveRequest::new("north")).unwrap().unwrap();
        let arrival = arrive(&mut realm, a);
        assert!(arrival.fall.is_some());
        assert_eq!(realm.character(a).unwrap().room, ids.deep_wood);
    }

    #[test]
    fn unconfirmed_slip_holds_on() {
        let oracle = ScriptedOracle::always_pass().then([
            Outcome::Pass,
            Outcome::MajorFail,
            Outcome::Fail,
        ]);
        let (mut realm, ids) = realm_with(oracle);
        let a = realm
            .login(
                Character::new("Ayla", ids.deep_wood, Box::new(LimbBody::humanoid(100.0)))
                    .on_layer(RoomLayer::InTrees),
            )
            .unwrap();
        // The deep wood is dark, so the sight check rolls first.
        realm.begin_move(a, MoveRequest::new("south")).unwrap().unwrap();
        let arrival = arrive(&mut realm, a);
        assert!(arrival.fall.is_none());
        assert_eq!(arrival.room, ids.forest_edge);
        assert_eq!(arrival.layer, RoomLayer::InTrees);
    }

    #[test]
    fn aided_walking_slows_the_one_legged() {
        let mut config = crate::config::RulesConfig::default();
        config.movement.tiebreak_ms = 0.0;
        let (world, ids) = somatic_world::create_starting_world().unwrap();
        let mut realm = Realm::new(world, config, Box::new(ScriptedOracle::new(Outcome::MajorFail)), 1);
        let mut body = LimbBody::humanoid(100.0);
        let leg = body.limb_named("left leg").unwrap();
        body.sever(leg);
        let hobbler = realm
            .login(Character::new("Hob", ids.meadow, Box::new(body)))
            .unwrap();
        let walker = spawn(&mut realm, "Walker", ids.meadow);
        let slow = realm
            .begin_move(hobbler, MoveRequest::new("east"))
            .unwrap()
            .unwrap();
        let fast = realm
            .begin_move(walker, MoveRequest::new("east"))
            .unwrap()
            .unwrap();
        let ratio = f64::from(u32::try_from(slow.duration_ms).unwrap())
            / f64::from(u32::try_from(fast.duration_ms).unwrap());
        assert!((ratio - 2.8).abs() < 0.01);
    }

    #[test]
    fn effective_light_follows_the_outcome() {
        assert_eq!(
            effective_light(Difficulty::Hard, Outcome::MajorPass),
            Difficulty::Trivial
        );
        assert_eq!(
            effective_light(Difficulty::Hard, Outcome::MajorFail),
            Difficulty::ExtremelyHard
        );
        assert_eq!(duration_from_ms(f64::NAN), 1_000_000_000);
        assert_eq!(duration_from_ms(-5.0), 1);
    }

    #[test]
    fn winged_flyer_crosses_without_touching_ground() {
        let (mut realm, ids) = realm();
        let a = spawn_winged(&mut realm, "Bird", ids.meadow);
        realm.character_mut(a).unwrap().position = PositionState::Flying;
        realm.begin_move(a, MoveRequest::new("up")).unwrap().unwrap();
        let arrival = arrive(&mut realm, a);
        assert_eq!(arrival.room, ids.ledge);
        assert_eq!(
            realm.character(a).unwrap().position,
            PositionState::Flying
        );
    }
}
