//! Fly, swim and climb sub-machines, falls, and heartbeat upkeep.
//!
//! Each sub-machine exposes a `can_*`/`why_cannot_*` pair on
//! [`CharacterView`] and a mutator on [`Realm`]. The checks share one
//! shape: general restrictions (awake, not moving, not in melee, not
//! blocked), then layer adjacency within the room's terrain, then a stamina
//! gate. Climbing also rolls a graded check whose disastrous failure is
//! confirmed by a second roll before it becomes a fall.
//!
//! A fall is scheduled like a movement: [`Realm::start_fall`] records a
//! token and a duration, and [`Realm::complete_fall`] lands the body and
//! applies damage.

use rand::seq::IndexedRandom;
use somatic_types::{
    BodypartId, CharacterId, CheckType, Difficulty, Outcome, Perceivable, PositionState, RoomId,
    RoomLayer,
};
use somatic_world::Terrain;
use tracing::{debug, info};

use crate::body::LimbKind;
use crate::character::PendingFall;
use crate::effects::Effect;
use crate::error::CharacterError;
use crate::realm::{CharacterView, Realm};
use crate::refusal::FlightRefusal;
use crate::stamina::skill_cost_multiplier;

/// Grades easier the confirming roll is made at before a disastrous climb
/// failure turns into a fall.
pub const FALL_CONFIRM_EASIER_STEPS: usize = 3;

/// Bodyparts struck on landing for each fall-severity outcome.
pub const fn fall_hits(outcome: Outcome) -> usize {
    match outcome {
        Outcome::MajorFail => 4,
        Outcome::Fail => 3,
        Outcome::MinorFail => 2,
        Outcome::MinorPass | Outcome::Pass => 1,
        Outcome::MajorPass => 0,
    }
}

/// A fall that has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallStart {
    /// Token the scheduled landing must present.
    pub token: u64,
    /// Game milliseconds until the body lands.
    pub duration_ms: u64,
    /// Layer the fall started from.
    pub from_layer: RoomLayer,
}

/// A completed fall.
#[derive(Debug, Clone, PartialEq)]
pub struct FallReport {
    /// Room landed in.
    pub room: RoomId,
    /// Layer landed on.
    pub layer: RoomLayer,
    /// Layers fallen through.
    pub layers: usize,
    /// Bodyparts struck and the damage each took.
    pub hits: Vec<(BodypartId, f64)>,
}

/// Result of a climb attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimbReport {
    /// Reached the new layer.
    Climbed {
        /// The layer reached.
        layer: RoomLayer,
    },
    /// Lost grip but held on; nothing moved.
    Slipped(Outcome),
    /// Fell.
    Fell(FallStart),
}

/// Result of a short heartbeat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpkeepReport {
    /// Stamina regenerated.
    pub regenerated: f64,
    /// A fall that began because the character could no longer stay up.
    pub fall: Option<FallStart>,
    /// A posture the character was forced into.
    pub forced: Option<PositionState>,
}

/// Where a body falling from `from` in `terrain` comes to rest, if
/// anything in the room catches it.
fn resting_layer(terrain: &Terrain, from: RoomLayer, inclusive: bool) -> Option<RoomLayer> {
    let catches = |layer: &RoomLayer| terrain.has_footing(*layer) || terrain.is_water_layer(*layer);
    if inclusive && catches(&from) {
        return Some(from);
    }
    terrain.layers.range(..from).rev().copied().find(|l| catches(l))
}

impl CharacterView<'_> {
    fn general_refusal(&self, action: &str) -> Option<FlightRefusal> {
        let c = self.character;
        if !c.consciousness.can_act() {
            return Some(FlightRefusal::NotAwake(c.consciousness));
        }
        if c.is_moving() {
            return Some(FlightRefusal::Moving);
        }
        if c.melee_range {
            return Some(FlightRefusal::InMelee);
        }
        c.effects.blocking(action).map(FlightRefusal::Blocked)
    }

    fn skill_cost(&self, base: f64, check: CheckType, difficulty: Difficulty) -> f64 {
        let config = &self.realm.config.stamina;
        base * skill_cost_multiplier(config, self.target_number(check, difficulty))
    }

    /// Stamina a heartbeat of flight, or one change of layer aloft, costs.
    pub fn fly_cost(&self) -> f64 {
        let c = self.character;
        self.skill_cost(self.realm.config.stamina.fly_cost, CheckType::Fly, Difficulty::Normal)
            * c.body.speed(PositionState::Flying).stamina_multiplier
    }

    /// Stamina a heartbeat of swimming, or one stroke up or down, costs.
    pub fn swim_cost(&self) -> f64 {
        let c = self.character;
        self.skill_cost(
            self.realm.config.stamina.swim_cost,
            CheckType::Swim,
            self.terrain().stay_afloat_difficulty(),
        ) * c.body.speed(PositionState::Swimming).stamina_multiplier
    }

    /// Stamina a heartbeat of clinging on, or one climb, costs.
    pub fn climb_cost(&self) -> f64 {
        let c = self.character;
        self.skill_cost(
            self.realm.config.stamina.climb_cost,
            CheckType::Climb,
            self.terrain().climb_difficulty,
        ) * c.body.speed(PositionState::Climbing).stamina_multiplier
    }

    fn afford(&self, cost: f64) -> Option<FlightRefusal> {
        (!self.character.stamina().can_spend(cost)).then_some(FlightRefusal::TooTired)
    }

    // ----- fly -----

    /// Whether the character can take to the air.
    pub fn can_fly(&self) -> bool {
        self.why_cannot_fly().is_none()
    }

    /// Why the character cannot take to the air.
    pub fn why_cannot_fly(&self) -> Option<FlightRefusal> {
        let c = self.character;
        if let Some(refusal) = self.general_refusal("fly") {
            return Some(refusal);
        }
        if c.position == PositionState::Flying {
            return Some(FlightRefusal::AlreadyFlying);
        }
        if !c.body.can_fly() {
            return Some(FlightRefusal::Incapable("fly"));
        }
        if self.terrain().is_water_layer(c.layer) {
            return Some(FlightRefusal::Incapable("fly out of the water"));
        }
        self.afford(self.fly_cost())
    }

    /// Where the character would land, or why it cannot.
    fn plan_land(&self) -> Result<(RoomLayer, PositionState), FlightRefusal> {
        let c = self.character;
        if let Some(refusal) = self.general_refusal("land") {
            return Err(refusal);
        }
        if c.position != PositionState::Flying {
            return Err(FlightRefusal::NotFlying);
        }
        let terrain = self.terrain();
        let layer = resting_layer(terrain, c.layer, true).ok_or(FlightRefusal::NoLayerBelow)?;
        if terrain.is_water_layer(layer) {
            if !c.body.can_swim() {
                return Err(FlightRefusal::WouldEnterWater);
            }
            return Ok((layer, PositionState::Swimming));
        }
        let posture = if c.body.can_stand(false) {
            PositionState::Standing
        } else {
            PositionState::Prostrate
        };
        Ok((layer, posture))
    }

    /// Whether the character can land.
    pub fn can_land(&self) -> bool {
        self.plan_land().is_ok()
    }

    /// Why the character cannot land.
    pub fn why_cannot_land(&self) -> Option<FlightRefusal> {
        self.plan_land().err()
    }

    // ----- ascend / dive -----

    fn plan_ascend(&self) -> Result<(RoomLayer, f64), FlightRefusal> {
        let c = self.character;
        if let Some(refusal) = self.general_refusal("ascend") {
            return Err(refusal);
        }
        let terrain = self.terrain();
        let (above, cost) = match c.position {
            PositionState::Flying => (
                terrain.layer_above(c.layer).ok_or(FlightRefusal::NoLayerAbove)?,
                self.fly_cost(),
            ),
            PositionState::Swimming => {
                if !c.layer.is_underwater() {
                    return Err(FlightRefusal::AtSurface);
                }
                (
                    terrain.layer_above(c.layer).ok_or(FlightRefusal::AtSurface)?,
                    self.swim_cost(),
                )
            }
            PositionState::Floating => return Err(FlightRefusal::NotSwimming),
            _ => return Err(FlightRefusal::NotFlying),
        };
        self.afford(cost).map_or(Ok((above, cost)), Err)
    }

    /// Whether the character can rise one layer.
    pub fn can_ascend(&self) -> bool {
        self.plan_ascend().is_ok()
    }

    /// Why the character cannot rise one layer.
    pub fn why_cannot_ascend(&self) -> Option<FlightRefusal> {
        self.plan_ascend().err()
    }

    fn plan_dive(&self) -> Result<(RoomLayer, f64, Option<PositionState>), FlightRefusal> {
        let c = self.character;
        if let Some(refusal) = self.general_refusal("dive") {
            return Err(refusal);
        }
        let terrain = self.terrain();
        let below = terrain
            .layer_below(c.layer)
            .ok_or(FlightRefusal::NoLayerBelow)?;
        let (posture, cost) = match c.position {
            PositionState::Flying if terrain.is_water_layer(below) => {
                if !c.body.can_swim() {
                    return Err(FlightRefusal::WouldEnterWater);
                }
                (Some(PositionState::Swimming), self.fly_cost())
            }
            PositionState::Flying => (None, self.fly_cost()),
            PositionState::Swimming => (None, self.swim_cost()),
            PositionState::Floating => return Err(FlightRefusal::NotSwimming),
            _ => return Err(FlightRefusal::NotFlying),
        };
        self.afford(cost).map_or(Ok((below, cost, posture)), Err)
    }

    /// Whether the character can drop one layer.
    pub fn can_dive(&self) -> bool {
        self.plan_dive().is_ok()
    }

    /// Why the character cannot drop one layer.
    pub fn why_cannot_dive(&self) -> Option<FlightRefusal> {
        self.plan_dive().err()
    }

    // ----- swim -----

    /// Whether the character can start swimming.
    pub fn can_swim(&self) -> bool {
        self.why_cannot_swim().is_none()
    }

    /// Why the character cannot start swimming.
    pub fn why_cannot_swim(&self) -> Option<FlightRefusal> {
        let c = self.character;
        if let Some(refusal) = self.general_refusal("swim") {
            return Some(refusal);
        }
        if c.position == PositionState::Swimming {
            return Some(FlightRefusal::AlreadySwimming);
        }
        if !self.terrain().is_water_layer(c.layer) {
            return Some(FlightRefusal::NotInWater);
        }
        if !c.body.can_swim() {
            return Some(FlightRefusal::Incapable("swim"));
        }
        self.afford(self.swim_cost())
    }

    // ----- climb -----

    fn climb_refusal(&self) -> Option<FlightRefusal> {
        if let Some(refusal) = self.general_refusal("climb") {
            return Some(refusal);
        }
        let body = &self.character.body;
        if !body.can_climb() || !body.is_valid_position(PositionState::Climbing) {
            return Some(FlightRefusal::Incapable("climb"));
        }
        None
    }

    fn plan_climb_up(&self) -> Result<RoomLayer, FlightRefusal> {
        if let Some(refusal) = self.climb_refusal() {
            return Err(refusal);
        }
        let c = self.character;
        let terrain = self.terrain();
        let above = terrain
            .layer_above(c.layer)
            .filter(|l| l.is_climbable() && terrain.has_footing(*l))
            .ok_or(FlightRefusal::NothingToClimb)?;
        if terrain.is_water_layer(c.layer) {
            return Err(FlightRefusal::NothingToClimb);
        }
        self.afford(self.climb_cost()).map_or(Ok(above), Err)
    }

    /// Whether the character can climb one layer up.
    pub fn can_climb_up(&self) -> bool {
        self.plan_climb_up().is_ok()
    }

    /// Why the character cannot climb one layer up.
    pub fn why_cannot_climb_up(&self) -> Option<FlightRefusal> {
        self.plan_climb_up().err()
    }

    fn plan_climb_down(&self) -> Result<RoomLayer, FlightRefusal> {
        if let Some(refusal) = self.climb_refusal() {
            return Err(refusal);
        }
        let c = self.character;
        let terrain = self.terrain();
        if !c.layer.is_climbable() {
            return Err(FlightRefusal::NothingToClimb);
        }
        let below = terrain
            .layer_below(c.layer)
            .filter(|l| terrain.has_footing(*l))
            .ok_or(FlightRefusal::NothingToClimb)?;
        self.afford(self.climb_cost()).map_or(Ok(below), Err)
    }

    /// Whether the character can climb one layer down.
    pub fn can_climb_down(&self) -> bool {
        self.plan_climb_down().is_ok()
    }

    /// Why the character cannot climb one layer down.
    pub fn why_cannot_climb_down(&self) -> Option<FlightRefusal> {
        self.plan_climb_down().err()
    }
}

impl Realm {
    fn spend(&mut self, id: CharacterId, cost: f64) -> Result<(), CharacterError> {
        let now = self.now_ms();
        self.roster
            .require_mut(id)?
            .body
            .stamina_mut()
            .spend(cost, now);
        Ok(())
    }

    fn set_posture(
        &mut self,
        id: CharacterId,
        posture: PositionState,
        text: &str,
    ) -> Result<(), CharacterError> {
        let character = self.roster.require_mut(id)?;
        character.position = posture;
        character.clear_position_target();
        let (room, line) = (character.room, format!("{} {text}.", character.name));
        self.echo(room, id, line);
        Ok(())
    }

    /// Take to the air. Catching oneself mid-fall cancels the fall.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn fly(&mut self, id: CharacterId) -> Result<Result<(), FlightRefusal>, CharacterError> {
        let cost = {
            let view = self.view(id)?;
            if let Some(refusal) = view.why_cannot_fly() {
                return Ok(Err(refusal));
            }
            view.fly_cost()
        };
        self.spend(id, cost)?;
        let caught = self.roster.require_mut(id)?.fall.take().is_some();
        self.set_posture(id, PositionState::Flying, "takes flight")?;
        debug!(character = %id, caught, "took flight");
        Ok(Ok(()))
    }

    /// Land on the nearest footing below, or in water.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn land(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<RoomLayer, FlightRefusal>, CharacterError> {
        let (layer, posture) = match self.view(id)?.plan_land() {
            Ok(plan) => plan,
            Err(refusal) => return Ok(Err(refusal)),
        };
        self.set_layer(id, layer)?;
        let text = if posture == PositionState::Swimming {
            "splashes down into the water"
        } else {
            "lands"
        };
        self.set_posture(id, posture, text)?;
        Ok(Ok(layer))
    }

    /// Rise one layer, in the air or through water.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn ascend(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<RoomLayer, FlightRefusal>, CharacterError> {
        let (layer, cost, flying) = {
            let view = self.view(id)?;
            match view.plan_ascend() {
                Ok((layer, cost)) => (
                    layer,
                    cost,
                    view.character().position == PositionState::Flying,
                ),
                Err(refusal) => return Ok(Err(refusal)),
            }
        };
        self.spend(id, cost)?;
        self.set_layer(id, layer)?;
        let character = self.roster.require(id)?;
        let verb = if flying { "flies higher" } else { "swims upward" };
        let (room, text) = (character.room, format!("{} {verb}.", character.name));
        self.echo(room, id, text);
        Ok(Ok(layer))
    }

    /// Drop one layer, in the air or through water.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn dive(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<RoomLayer, FlightRefusal>, CharacterError> {
        let (layer, cost, posture) = match self.view(id)?.plan_dive() {
            Ok(plan) => plan,
            Err(refusal) => return Ok(Err(refusal)),
        };
        self.spend(id, cost)?;
        self.set_layer(id, layer)?;
        match posture {
            Some(posture) => self.set_posture(id, posture, "dives into the water")?,
            None => {
                let character = self.roster.require(id)?;
                let (room, text) = (character.room, format!("{} dives lower.", character.name));
                self.echo(room, id, text);
            }
        }
        Ok(Ok(layer))
    }

    /// Start swimming.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn swim(&mut self, id: CharacterId) -> Result<Result<(), FlightRefusal>, CharacterError> {
        let cost = {
            let view = self.view(id)?;
            if let Some(refusal) = view.why_cannot_swim() {
                return Ok(Err(refusal));
            }
            view.swim_cost()
        };
        self.spend(id, cost)?;
        self.set_posture(id, PositionState::Swimming, "begins swimming")?;
        Ok(Ok(()))
    }

    /// Roll a climb at `difficulty`, confirming a disastrous failure with a
    /// second roll before it counts as a fall.
    pub(crate) fn climb_roll(
        &mut self,
        id: CharacterId,
        difficulty: Difficulty,
    ) -> Result<(Outcome, bool), CharacterError> {
        let outcome = self.roll(id, CheckType::Climb, difficulty)?.outcome;
        if outcome != Outcome::MajorFail {
            return Ok((outcome, false));
        }
        let confirm = self
            .roll(
                id,
                CheckType::Climb,
                difficulty.easier(FALL_CONFIRM_EASIER_STEPS),
            )?
            .outcome;
        Ok((outcome, confirm == Outcome::MajorFail))
    }

    /// Climb one layer up.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn climb_up(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<ClimbReport, FlightRefusal>, CharacterError> {
        let (layer, cost, difficulty) = {
            let view = self.view(id)?;
            match view.plan_climb_up() {
                Ok(layer) => (layer, view.climb_cost(), view.terrain().climb_difficulty),
                Err(refusal) => return Ok(Err(refusal)),
            }
        };
        self.climb(id, layer, cost, difficulty, "climbs up")
            .map(Ok)
    }

    /// Climb one layer down.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn climb_down(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<ClimbReport, FlightRefusal>, CharacterError> {
        let (layer, cost, difficulty) = {
            let view = self.view(id)?;
            match view.plan_climb_down() {
                Ok(layer) => (layer, view.climb_cost(), view.terrain().climb_difficulty),
                Err(refusal) => return Ok(Err(refusal)),
            }
        };
        self.climb(id, layer, cost, difficulty, "climbs down")
            .map(Ok)
    }

    fn climb(
        &mut self,
        id: CharacterId,
        layer: RoomLayer,
        cost: f64,
        difficulty: Difficulty,
        verb: &str,
    ) -> Result<ClimbReport, CharacterError> {
        self.spend(id, cost)?;
        let (outcome, fell) = self.climb_roll(id, difficulty)?;
        debug!(character = %id, ?outcome, fell, ?layer, "climb attempt");
        if fell {
            let upper = self.roster.require(id)?.layer.max(layer);
            self.set_layer(id, upper)?;
            self.set_posture(id, PositionState::Climbing, "loses their grip")?;
            return self.start_fall(id).map(ClimbReport::Fell);
        }
        if outcome.is_fail() {
            let character = self.roster.require(id)?;
            let (room, text) = (character.room, format!("{} slips and clings on.", character.name));
            self.echo(room, id, text);
            return Ok(ClimbReport::Slipped(outcome));
        }
        self.set_layer(id, layer)?;
        let stands = {
            let body = &self.roster.require(id)?.body;
            body.can_stand(false) && body.is_valid_position(PositionState::Standing)
        };
        let posture = if stands {
            PositionState::Standing
        } else {
            PositionState::Climbing
        };
        self.set_posture(id, posture, verb)?;
        Ok(ClimbReport::Climbed { layer })
    }

    // -------------------------------------------------------------------
    // Falls
    // -------------------------------------------------------------------

    /// Begin a fall from the character's current layer.
    ///
    /// Cancels any movement and knocks loose whatever was positioned
    /// against the character. The landing is resolved by
    /// [`Realm::complete_fall`] once the returned duration elapses.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn start_fall(&mut self, id: CharacterId) -> Result<FallStart, CharacterError> {
        self.cancel_for_mover_only(id)?;
        let (room, layer) = {
            let c = self.roster.require(id)?;
            (c.room, c.layer)
        };
        let terrain = &self.world.require_room(room)?.terrain;
        let landing = resting_layer(terrain, layer, false).unwrap_or_else(|| terrain.lowest_layer());
        let layers = terrain.layers_between(landing, layer).max(1);
        let duration_ms = u64::try_from(layers)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.config.movement.fall_ms_per_layer)
            .max(1);
        let token = self.next_token();

        let character = self.roster.require_mut(id)?;
        character.fall = Some(PendingFall {
            token,
            from_layer: layer,
        });
        character.clear_position_target();
        character.position = PositionState::Sprawled;
        let text = format!("{} falls!", character.name);
        self.release_positioned_against(Perceivable::Character(id), room);
        self.echo(room, id, text);
        info!(character = %id, room = %room, ?layer, layers, "fall started");
        Ok(FallStart {
            token,
            duration_ms,
            from_layer: layer,
        })
    }

    /// Land a fall whose scheduled landing has fired.
    ///
    /// A stale token (the faller caught themselves) is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a broken
    /// occupancy invariant.
    pub fn complete_fall(
        &mut self,
        id: CharacterId,
        token: u64,
    ) -> Result<Option<FallReport>, CharacterError> {
        let Some(pending) = self
            .roster
            .require_mut(id)?
            .fall
            .take_if(|f| f.token == token)
        else {
            debug!(character = %id, token, "stale landing ignored");
            return Ok(None);
        };
        let (room, layer) = {
            let c = self.roster.require(id)?;
            (c.room, c.layer)
        };
        let (dest, landing, layers) = self.fall_destination(room, layer)?;
        if dest == room {
            self.set_layer(id, landing)?;
        } else {
            self.relocate(id, dest, landing)?;
        }
        debug!(character = %id, from = ?pending.from_layer, ?landing, layers, "fall landed");

        let wet = self
            .world
            .require_room(dest)?
            .terrain
            .is_water_layer(landing);
        if wet {
            let swims = self.roster.require(id)?.body.can_swim();
            let posture = if swims {
                PositionState::Swimming
            } else {
                PositionState::Floating
            };
            self.set_posture(id, posture, "plunges into the water")?;
            return Ok(Some(FallReport {
                room: dest,
                layer: landing,
                layers,
                hits: Vec::new(),
            }));
        }

        self.set_posture(id, PositionState::Prostrate, "hits the ground hard")?;
        let hits = self.fall_damage(id, layers)?;
        Ok(Some(FallReport {
            room: dest,
            layer: landing,
            layers,
            hits,
        }))
    }

    /// Room and layer a body falling from `layer` in `room` lands on, and
    /// the number of layers fallen. With nothing below, the body goes over
    /// the edge through a drop or "down" exit if there is one.
    fn fall_destination(
        &self,
        room: RoomId,
        layer: RoomLayer,
    ) -> Result<(RoomId, RoomLayer, usize), CharacterError> {
        let terrain = &self.world.require_room(room)?.terrain;
        if let Some(landing) = resting_layer(terrain, layer, false) {
            return Ok((room, landing, terrain.layers_between(landing, layer).max(1)));
        }
        let over_edge = self
            .world
            .exits_from(room)
            .into_iter()
            .find(|e| e.fall_exit || e.keyword.eq_ignore_ascii_case("down"))
            .map(|e| e.to);
        if let Some(dest) = over_edge {
            let below = &self.world.require_room(dest)?.terrain;
            let top = below.highest_layer();
            if let Some(landing) = resting_layer(below, top, true) {
                let layers = terrain
                    .layers_between(terrain.lowest_layer(), layer)
                    .saturating_add(below.layers_between(landing, top))
                    .saturating_add(1);
                return Ok((dest, landing, layers));
            }
        }
        let lowest = terrain.lowest_layer();
        Ok((room, lowest, terrain.layers_between(lowest, layer).max(1)))
    }

    /// Strike random bodyparts according to the severity of the landing.
    fn fall_damage(
        &mut self,
        id: CharacterId,
        layers: usize,
    ) -> Result<Vec<(BodypartId, f64)>, CharacterError> {
        let results = self.roll_all(id, CheckType::LandFall)?;
        let difficulty = Difficulty::Easy.harder(layers.saturating_sub(1));
        let outcome = results
            .iter()
            .find(|(d, _)| *d == difficulty)
            .map_or(Outcome::MajorFail, |(_, r)| r.outcome);
        let count = fall_hits(outcome);
        let per_hit = self.config.movement.fall_damage_per_layer * f64::from(u32::try_from(layers).unwrap_or(u32::MAX));
        let head_weight = f64::from(u32::try_from(count).unwrap_or(u32::MAX)).max(1.0);

        let candidates: Vec<(BodypartId, f64)> = self
            .roster
            .require(id)?
            .body
            .bodyparts()
            .into_iter()
            .filter(|limb| limb.usable())
            .map(|limb| {
                let weight = if limb.kind == LimbKind::Head {
                    head_weight
                } else {
                    1.0
                };
                (limb.id, weight)
            })
            .collect();

        let mut hits = Vec::with_capacity(count);
        for _ in 0..count {
            let Ok((part, _)) = candidates.choose_weighted(&mut self.rng, |c| c.1) else {
                break;
            };
            let part = *part;
            let taken = self
                .roster
                .require_mut(id)?
                .body
                .apply_damage(part, per_hit);
            hits.push((part, taken));
        }
        debug!(character = %id, ?outcome, hits = hits.len(), "fall damage");
        Ok(hits)
    }

    // -------------------------------------------------------------------
    // Heartbeats
    // -------------------------------------------------------------------

    /// Short heartbeat: exertion, regeneration, staying aloft or afloat,
    /// and the combat consistency pass.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn upkeep_short(&mut self, id: CharacterId) -> Result<UpkeepReport, CharacterError> {
        let now = self.now_ms();
        let (regenerated, position, falling) = {
            let c = self.roster.require_mut(id)?;
            let stamina = c.body.stamina_mut();
            stamina.update_exertion(now, &self.config.stamina);
            let regenerated = stamina.regenerate(&self.config.stamina);
            (regenerated, c.position, c.is_falling())
        };
        let mut report = UpkeepReport {
            regenerated,
            ..UpkeepReport::default()
        };
        if !falling {
            match position {
                PositionState::Flying => self.flight_upkeep(id, &mut report)?,
                PositionState::Swimming | PositionState::Floating => {
                    self.swim_upkeep(id, position, &mut report)?;
                }
                PositionState::Climbing => self.climb_upkeep(id, &mut report)?,
                _ => {}
            }
        }
        self.check_combat_status(id)?;
        Ok(report)
    }

    fn flight_upkeep(
        &mut self,
        id: CharacterId,
        report: &mut UpkeepReport,
    ) -> Result<(), CharacterError> {
        let (cost, able, footing, stands) = {
            let view = self.view(id)?;
            let c = view.character();
            (
                view.fly_cost(),
                c.body.can_fly(),
                view.terrain().has_footing(c.layer),
                c.body.can_stand(false),
            )
        };
        let affordable = self.roster.require(id)?.stamina().can_spend(cost);
        if able && affordable {
            return self.spend(id, cost);
        }
        if footing {
            let posture = if stands {
                PositionState::Standing
            } else {
                PositionState::Prostrate
            };
            self.set_posture(id, posture, "is forced to land")?;
            report.forced = Some(posture);
        } else {
            report.fall = Some(self.start_fall(id)?);
        }
        Ok(())
    }

    fn swim_upkeep(
        &mut self,
        id: CharacterId,
        position: PositionState,
        report: &mut UpkeepReport,
    ) -> Result<(), CharacterError> {
        let (cost, layer, below) = {
            let view = self.view(id)?;
            let layer = view.character().layer;
            let below = view
                .terrain()
                .layer_below(layer)
                .filter(|l| view.terrain().is_water_layer(*l));
            (view.swim_cost(), layer, below)
        };
        if position == PositionState::Swimming {
            if self.roster.require(id)?.stamina().can_spend(cost) {
                return self.spend(id, cost);
            }
            self.set_posture(id, PositionState::Floating, "is too tired to swim")?;
            report.forced = Some(PositionState::Floating);
        }
        if layer.is_underwater()
            && let Some(below) = below
        {
            self.set_layer(id, below)?;
            let character = self.roster.require(id)?;
            let (room, text) = (character.room, format!("{} sinks.", character.name));
            self.echo(room, id, text);
        }
        Ok(())
    }

    fn climb_upkeep(
        &mut self,
        id: CharacterId,
        report: &mut UpkeepReport,
    ) -> Result<(), CharacterError> {
        let (cost, footing) = {
            let view = self.view(id)?;
            (
                view.climb_cost(),
                view.terrain().has_footing(view.character().layer),
            )
        };
        if footing {
            return Ok(());
        }
        if self.roster.require(id)?.stamina().can_spend(cost) {
            return self.spend(id, cost);
        }
        report.fall = Some(self.start_fall(id)?);
        Ok(())
    }

    /// Long heartbeat: long-term exertion and expired effects. Returns the
    /// effects that expired.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn upkeep_long(&mut self, id: CharacterId) -> Result<Vec<Effect>, CharacterError> {
        let now = self.now_ms();
        let character = self.roster.require_mut(id)?;
        let longterm = character.body.stamina_mut().update_longterm();
        let expired = character.effects.prune_expired(now);
        debug!(character = %id, ?longterm, expired = expired.len(), "long upkeep");
        Ok(expired)
    }
}
