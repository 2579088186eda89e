//! The engine: one step of game time at a time.
//!
//! Each step runs in a fixed order:
//!
//! 1. **Commands** -- apply every command issued for this step, in order,
//!    at the current game time.
//! 2. **Clock** -- advance game time by one step.
//! 3. **Events** -- fire every scheduled arrival and landing now due, in
//!    due-time order. Completions can schedule follow-ups (the next queued
//!    move, a fall from a slipped branch), which fire in the same step if
//!    they are also due.
//! 4. **Heartbeats** -- run short and long upkeep for every subscriber of
//!    each heartbeat that came due.
//! 5. **Echoes** -- drain the realm's observable output and log it.
//!
//! Everything runs against one `&mut Realm`; no two events are ever in
//! flight at once.

use core::fmt::Display;

use somatic_character::{
    Character, ClimbReport, FallStart, MoveReport, QueueOutcome, Realm, SkillCheckOracle,
};
use somatic_types::{CharacterId, Consciousness, Echo};
use somatic_world::WorldMap;
use tracing::{debug, info, warn};

use crate::clock::GameClock;
use crate::command::Command;
use crate::config::SimulationConfig;
use crate::error::CoreError;
use crate::heartbeat::{Heartbeat, HeartbeatRegistry};
use crate::scheduler::{ScheduledEvent, Scheduler};

/// What became of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command took effect.
    Done,
    /// The command was refused; the reason is player-facing text.
    Refused(String),
}

impl CommandOutcome {
    /// Whether the command took effect.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Summary of one engine step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSummary {
    /// The step number that just ran.
    pub tick: u64,
    /// Game time at the end of the step.
    pub now_ms: u64,
    /// Commands that took effect.
    pub commands_done: u32,
    /// Commands that were refused.
    pub commands_refused: u32,
    /// Movements that arrived.
    pub arrivals: u32,
    /// Falls that landed.
    pub landings: u32,
    /// Characters given short-heartbeat upkeep.
    pub short_upkeeps: u32,
    /// Characters given long-heartbeat upkeep.
    pub long_upkeeps: u32,
    /// Characters in the world after the step.
    pub characters: u32,
    /// Observable output produced during the step.
    pub echoes: Vec<Echo>,
}

fn refused(id: CharacterId, reason: impl Display) -> CommandOutcome {
    let reason = reason.to_string();
    debug!(character = %id, reason = %reason, "command refused");
    CommandOutcome::Refused(reason)
}

fn settle<T, E: Display>(id: CharacterId, result: Result<T, E>) -> CommandOutcome {
    match result {
        Ok(_) => CommandOutcome::Done,
        Err(reason) => refused(id, reason),
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Drives a [`Realm`] through game time.
#[derive(Debug)]
pub struct Engine {
    realm: Realm,
    clock: GameClock,
    scheduler: Scheduler,
    heartbeats: HeartbeatRegistry,
}

impl Engine {
    /// Create an engine over an existing realm.
    pub fn new(mut realm: Realm, clock: GameClock, heartbeats: HeartbeatRegistry) -> Self {
        realm.set_time(clock.now_ms());
        Self {
            realm,
            clock,
            scheduler: Scheduler::new(),
            heartbeats,
        }
    }

    /// Build the clock, heartbeats and realm from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Clock`] if the timing configuration is invalid.
    pub fn from_config(
        config: &SimulationConfig,
        world: WorldMap,
        oracle: Box<dyn SkillCheckOracle>,
    ) -> Result<Self, CoreError> {
        let clock = GameClock::new(&config.world)?;
        let heartbeats = HeartbeatRegistry::new(&config.time)?;
        let realm = Realm::new(world, config.rules(), oracle, config.world.seed);
        Ok(Self::new(realm, clock, heartbeats))
    }

    /// The realm.
    pub const fn realm(&self) -> &Realm {
        &self.realm
    }

    /// The realm, mutably, for setup and administrative edits.
    pub const fn realm_mut(&mut self) -> &mut Realm {
        &mut self.realm
    }

    /// The game clock.
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// Pending timed events.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Heartbeat subscriptions.
    pub const fn heartbeats(&self) -> &HeartbeatRegistry {
        &self.heartbeats
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Bring a character into the world and subscribe it to both
    /// heartbeats.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Character`] if the character cannot be placed.
    pub fn login(&mut self, character: Character) -> Result<CharacterId, CoreError> {
        let id = self.realm.login(character)?;
        self.heartbeats.subscribe_all(id);
        Ok(id)
    }

    /// Remove a character, its heartbeats and its pending events.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Character`] for an unknown character.
    pub fn logout(&mut self, id: CharacterId) -> Result<Character, CoreError> {
        let character = self.realm.logout(id)?;
        self.heartbeats.unregister_all(id);
        let dropped = self.scheduler.cancel_for(id);
        debug!(character = %id, dropped, "pending events dropped on logout");
        Ok(character)
    }

    /// Kill a character. The body stops receiving upkeep but still falls
    /// if it was aloft.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Character`] for an unknown character.
    pub fn kill(&mut self, id: CharacterId) -> Result<(), CoreError> {
        let report = self.realm.kill(id)?;
        self.heartbeats.unregister_all(id);
        if let Some(fall) = report.fall {
            self.schedule_fall(id, fall);
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------

    fn schedule_move(&mut self, id: CharacterId, report: &MoveReport) {
        let due = self.clock.now_ms().saturating_add(report.duration_ms);
        debug!(character = %id, due, to = %report.to, "arrival scheduled");
        self.scheduler.schedule(
            due,
            ScheduledEvent::Arrival {
                character: id,
                token: report.token,
            },
        );
    }

    fn schedule_fall(&mut self, id: CharacterId, fall: FallStart) {
        let due = self.clock.now_ms().saturating_add(fall.duration_ms);
        debug!(character = %id, due, from = ?fall.from_layer, "landing scheduled");
        self.scheduler.schedule(
            due,
            ScheduledEvent::Landing {
                character: id,
                token: fall.token,
            },
        );
    }

    // -------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------

    /// Apply one command at the current game time.
    ///
    /// Commands for characters no longer in the world are refused rather
    /// than treated as errors; a command source may lag behind a logout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Character`] only for invariant violations.
    pub fn apply(&mut self, id: CharacterId, command: Command) -> Result<CommandOutcome, CoreError> {
        if !self.realm.roster().contains(id) {
            warn!(character = %id, ?command, "command for unknown character");
            return Ok(CommandOutcome::Refused("There is no such character.".to_owned()));
        }
        debug!(character = %id, ?command, "applying command");
        match command {
            c @ (Command::Move(_)
            | Command::QueueMove(_)
            | Command::Position(_)
            | Command::Stop { .. }) => self.apply_movement(id, c),
            c @ (Command::Fly
            | Command::Land
            | Command::Ascend
            | Command::Dive
            | Command::Swim
            | Command::ClimbUp
            | Command::ClimbDown) => self.apply_vertical(id, &c),
            c @ (Command::Engage { .. }
            | Command::AcquireTarget
            | Command::Flee
            | Command::Truce) => self.apply_combat(id, &c),
            Command::Sleep => self.fall_asleep(id),
            Command::Wake => self.wake(id),
            Command::Logout => {
                self.logout(id)?;
                Ok(CommandOutcome::Done)
            }
        }
    }

    fn apply_movement(
        &mut self,
        id: CharacterId,
        command: Command,
    ) -> Result<CommandOutcome, CoreError> {
        let outcome = match command {
            Command::Move(request) => match self.realm.begin_move(id, request)? {
                Ok(report) => {
                    self.schedule_move(id, &report);
                    CommandOutcome::Done
                }
                Err(refusal) => refused(id, refusal),
            },
            Command::QueueMove(request) => match self.realm.queue_move(id, request)? {
                Ok(QueueOutcome::Started(report)) => {
                    self.schedule_move(id, &report);
                    CommandOutcome::Done
                }
                Ok(QueueOutcome::Queued(depth)) => {
                    debug!(character = %id, depth, "move queued");
                    CommandOutcome::Done
                }
                Err(refusal) => refused(id, refusal),
            },
            Command::Position(request) => settle(id, self.realm.move_position(id, request)?),
            Command::Stop { force } => settle(id, self.realm.stop(id, force)?),
            other => refused(id, format!("{other:?} is not a movement command.")),
        };
        Ok(outcome)
    }

    fn apply_vertical(
        &mut self,
        id: CharacterId,
        command: &Command,
    ) -> Result<CommandOutcome, CoreError> {
        let outcome = match command {
            Command::Fly => settle(id, self.realm.fly(id)?),
            Command::Land => settle(id, self.realm.land(id)?),
            Command::Ascend => settle(id, self.realm.ascend(id)?),
            Command::Dive => settle(id, self.realm.dive(id)?),
            Command::Swim => settle(id, self.realm.swim(id)?),
            Command::ClimbUp | Command::ClimbDown => {
                let result = if matches!(command, Command::ClimbUp) {
                    self.realm.climb_up(id)?
                } else {
                    self.realm.climb_down(id)?
                };
                match result {
                    Ok(ClimbReport::Fell(fall)) => {
                        self.schedule_fall(id, fall);
                        CommandOutcome::Done
                    }
                    Ok(report) => {
                        debug!(character = %id, ?report, "climb resolved");
                        CommandOutcome::Done
                    }
                    Err(refusal) => refused(id, refusal),
                }
            }
            other => refused(id, format!("{other:?} is not a vertical command.")),
        };
        Ok(outcome)
    }

    fn apply_combat(
        &mut self,
        id: CharacterId,
        command: &Command,
    ) -> Result<CommandOutcome, CoreError> {
        let outcome = match *command {
            Command::Engage { target, ranged } => match self.realm.engage(id, target, ranged)? {
                Ok(report) => {
                    info!(
                        character = %id,
                        target = %target,
                        combat = %report.combat,
                        melee = report.melee,
                        ambush_bonus = report.ambush_bonus,
                        "engaged"
                    );
                    CommandOutcome::Done
                }
                Err(refusal) => refused(id, refusal),
            },
            Command::AcquireTarget => {
                let target = self.realm.acquire_target(id)?;
                debug!(character = %id, ?target, "target acquired");
                CommandOutcome::Done
            }
            Command::Flee => settle(id, self.realm.flee(id)?),
            Command::Truce => match self.realm.request_truce(id)? {
                Ok(dissolved) => {
                    if dissolved {
                        info!(character = %id, "truce accepted, combat dissolved");
                    }
                    CommandOutcome::Done
                }
                Err(refusal) => refused(id, refusal),
            },
            ref other => refused(id, format!("{other:?} is not a combat command.")),
        };
        Ok(outcome)
    }

    fn fall_asleep(&mut self, id: CharacterId) -> Result<CommandOutcome, CoreError> {
        let state = self.realm.view(id)?.character().consciousness;
        if state != Consciousness::Awake {
            return Ok(refused(id, format!("You are {}.", state.describe())));
        }
        let report = self.realm.set_consciousness(id, Consciousness::Sleeping)?;
        if let Some(fall) = report.fall {
            self.schedule_fall(id, fall);
        }
        Ok(CommandOutcome::Done)
    }

    fn wake(&mut self, id: CharacterId) -> Result<CommandOutcome, CoreError> {
        let state = self.realm.view(id)?.character().consciousness;
        if state != Consciousness::Sleeping {
            return Ok(refused(id, format!("You are {}.", state.describe())));
        }
        self.realm.set_consciousness(id, Consciousness::Awake)?;
        Ok(CommandOutcome::Done)
    }

    // -------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------

    /// Apply this step's commands, then advance one step.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] on an invariant violation or clock overflow.
    pub fn run_step(
        &mut self,
        commands: Vec<(CharacterId, Command)>,
    ) -> Result<StepSummary, CoreError> {
        let (mut done, mut refused_count) = (0_u32, 0_u32);
        for (id, command) in commands {
            if self.apply(id, command)?.is_done() {
                done = done.saturating_add(1);
            } else {
                refused_count = refused_count.saturating_add(1);
            }
        }
        let mut summary = self.step()?;
        summary.commands_done = done;
        summary.commands_refused = refused_count;
        Ok(summary)
    }

    /// Advance one step: fire due events, run due heartbeats, drain echoes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] on an invariant violation or clock overflow.
    pub fn step(&mut self) -> Result<StepSummary, CoreError> {
        let now = self.clock.advance()?;
        self.realm.set_time(now);
        let mut summary = StepSummary {
            tick: self.clock.tick(),
            now_ms: now,
            ..StepSummary::default()
        };

        while let Some((due, event)) = self.scheduler.pop_due(now) {
            debug!(due, ?event, "event fired");
            self.fire(event, &mut summary)?;
        }
        for beat in self.heartbeats.due(now) {
            self.beat(beat, &mut summary)?;
        }

        summary.characters = count(self.realm.roster().len());
        summary.echoes = self.flush_echoes();
        Ok(summary)
    }

    fn fire(&mut self, event: ScheduledEvent, summary: &mut StepSummary) -> Result<(), CoreError> {
        let id = event.character();
        if !self.realm.roster().contains(id) {
            debug!(character = %id, "event for departed character dropped");
            return Ok(());
        }
        match event {
            ScheduledEvent::Arrival { token, .. } => {
                let Some(arrival) = self.realm.complete_move(id, token)? else {
                    return Ok(());
                };
                summary.arrivals = summary.arrivals.saturating_add(1);
                if arrival.fled {
                    info!(character = %id, room = %arrival.room, "fled combat");
                }
                if let Some(fall) = arrival.fall {
                    self.schedule_fall(id, fall);
                }
                if let Some(next) = arrival.next {
                    self.schedule_move(id, &next);
                }
            }
            ScheduledEvent::Landing { token, .. } => {
                let Some(landing) = self.realm.complete_fall(id, token)? else {
                    return Ok(());
                };
                summary.landings = summary.landings.saturating_add(1);
                let damage: f64 = landing.hits.iter().map(|(_, d)| d).sum();
                info!(
                    character = %id,
                    room = %landing.room,
                    layer = ?landing.layer,
                    layers = landing.layers,
                    hits = landing.hits.len(),
                    damage,
                    "fall landed"
                );
            }
        }
        Ok(())
    }

    fn beat(&mut self, beat: Heartbeat, summary: &mut StepSummary) -> Result<(), CoreError> {
        for id in self.heartbeats.subscribers(beat) {
            if !self.realm.roster().contains(id) {
                warn!(character = %id, ?beat, "stale heartbeat subscriber removed");
                self.heartbeats.unregister_all(id);
                continue;
            }
            match beat {
                Heartbeat::Short => {
                    let report = self.realm.upkeep_short(id)?;
                    if let Some(fall) = report.fall {
                        self.schedule_fall(id, fall);
                    }
                    if let Some(posture) = report.forced {
                        debug!(character = %id, ?posture, "upkeep forced posture");
                    }
                    summary.short_upkeeps = summary.short_upkeeps.saturating_add(1);
                }
                Heartbeat::Long => {
                    let expired = self.realm.upkeep_long(id)?;
                    if !expired.is_empty() {
                        debug!(character = %id, expired = expired.len(), "effects expired");
                    }
                    summary.long_upkeeps = summary.long_upkeeps.saturating_add(1);
                }
            }
        }
        Ok(())
    }

    fn flush_echoes(&mut self) -> Vec<Echo> {
        let echoes = self.realm.drain_echoes();
        for echo in &echoes {
            info!(room = %echo.room, text = %echo.text, "echo");
        }
        echoes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use somatic_character::{LimbBody, MoveRequest, PositionRequest, ScriptedOracle};
    use somatic_types::{Outcome, PositionState, RoomLayer};
    use somatic_world::{StartingRoomIds, create_starting_world};

    use super::*;

    fn engine() -> (Engine, StartingRoomIds) {
        let (world, ids) = create_starting_world().unwrap();
        let oracle = Box::new(ScriptedOracle::new(Outcome::Pass));
        let engine = Engine::from_config(&SimulationConfig::default(), world, oracle).unwrap();
        (engine, ids)
    }

    fn humanoid(engine: &mut Engine, name: &str, room: somatic_types::RoomId) -> CharacterId {
        engine
            .login(Character::new(name, room, Box::new(LimbBody::humanoid(100.0))))
            .unwrap()
    }

    fn winged(engine: &mut Engine, name: &str, room: somatic_types::RoomId) -> CharacterId {
        engine
            .login(Character::new(name, room, Box::new(LimbBody::winged(100.0))))
            .unwrap()
    }

    fn run_until_idle(engine: &mut Engine, max: u32) {
        for _ in 0..max {
            engine.step().unwrap();
            if engine.scheduler().is_empty() {
                return;
            }
        }
    }

    #[test]
    fn login_subscribes_heartbeats() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        assert!(engine.heartbeats().is_subscribed(id, Heartbeat::Short));
        assert!(engine.heartbeats().is_subscribed(id, Heartbeat::Long));
    }

    #[test]
    fn move_arrives_after_scheduled_duration() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        let outcome = engine.apply(id, Command::Move(MoveRequest::new("east"))).unwrap();
        assert_eq!(outcome, CommandOutcome::Done);
        assert_eq!(engine.scheduler().len(), 1);

        let summary = engine.step().unwrap();
        assert_eq!(summary.arrivals, 0);
        assert!(engine.realm().character(id).unwrap().is_moving());

        run_until_idle(&mut engine, 20);
        let c = engine.realm().character(id).unwrap();
        assert_eq!(c.room, ids.forest_edge);
        assert!(!c.is_moving());
    }

    #[test]
    fn queued_moves_chain_through_scheduler() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        engine.apply(id, Command::QueueMove(MoveRequest::new("east"))).unwrap();
        engine.apply(id, Command::QueueMove(MoveRequest::new("north"))).unwrap();
        run_until_idle(&mut engine, 40);
        assert_eq!(engine.realm().character(id).unwrap().room, ids.deep_wood);
    }

    #[test]
    fn stopped_move_never_arrives() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        engine.apply(id, Command::Move(MoveRequest::new("east"))).unwrap();
        let stop = engine.apply(id, Command::Stop { force: false }).unwrap();
        assert!(stop.is_done());
        run_until_idle(&mut engine, 20);
        assert_eq!(engine.realm().character(id).unwrap().room, ids.meadow);
    }

    #[test]
    fn refusals_are_reported_not_raised() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        let outcome = engine.apply(id, Command::Move(MoveRequest::new("nowhere"))).unwrap();
        assert!(matches!(outcome, CommandOutcome::Refused(_)));
        let outcome = engine.apply(id, Command::Fly).unwrap();
        assert!(matches!(outcome, CommandOutcome::Refused(_)));
    }

    #[test]
    fn unknown_character_is_refused() {
        let (mut engine, _ids) = engine();
        let outcome = engine.apply(CharacterId::new(), Command::Fly).unwrap();
        assert!(matches!(outcome, CommandOutcome::Refused(_)));
    }

    #[test]
    fn sleeping_character_falls_out_of_the_sky() {
        let (mut engine, ids) = engine();
        let id = winged(&mut engine, "Kestrel", ids.meadow);
        assert!(engine.apply(id, Command::Fly).unwrap().is_done());
        assert!(engine.apply(id, Command::Ascend).unwrap().is_done());
        assert_eq!(engine.realm().character(id).unwrap().layer, RoomLayer::InAir);

        assert!(engine.apply(id, Command::Sleep).unwrap().is_done());
        assert_eq!(engine.scheduler().len(), 1);
        run_until_idle(&mut engine, 10);

        let c = engine.realm().character(id).unwrap();
        assert_eq!(c.layer, RoomLayer::GroundLevel);
        assert!(!c.is_falling());
        assert_eq!(c.position, PositionState::Prostrate);
    }

    #[test]
    fn wake_requires_sleep() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        assert!(!engine.apply(id, Command::Wake).unwrap().is_done());
        assert!(engine.apply(id, Command::Sleep).unwrap().is_done());
        assert!(!engine.apply(id, Command::Sleep).unwrap().is_done());
        assert!(engine.apply(id, Command::Wake).unwrap().is_done());
    }

    #[test]
    fn dead_cannot_wake() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        engine.kill(id).unwrap();
        assert!(!engine.heartbeats().is_subscribed(id, Heartbeat::Short));
        assert!(!engine.apply(id, Command::Wake).unwrap().is_done());
    }

    #[test]
    fn logout_command_tears_down() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        engine.apply(id, Command::Move(MoveRequest::new("east"))).unwrap();
        assert!(engine.apply(id, Command::Logout).unwrap().is_done());
        assert!(engine.scheduler().is_empty());
        assert!(!engine.heartbeats().is_subscribed(id, Heartbeat::Long));
        assert!(engine.realm().character(id).is_none());
        assert!(engine.step().is_ok());
    }

    #[test]
    fn heartbeats_run_upkeep_on_period() {
        let (mut engine, ids) = engine();
        let _a = humanoid(&mut engine, "Ayla", ids.meadow);
        let _b = humanoid(&mut engine, "Brann", ids.town);
        let mut short: u32 = 0;
        let mut long: u32 = 0;
        for _ in 0..60 {
            let summary = engine.step().unwrap();
            short = summary.short_upkeeps.saturating_add(short);
            long = summary.long_upkeeps.saturating_add(long);
        }
        // 60 one-second steps: six short beats and one long beat.
        assert_eq!(short, 12);
        assert_eq!(long, 2);
    }

    #[test]
    fn run_step_counts_outcomes_and_echoes() {
        let (mut engine, ids) = engine();
        let id = humanoid(&mut engine, "Ayla", ids.meadow);
        engine.realm_mut().drain_echoes();
        let summary = engine
            .run_step(vec![
                (id, Command::Position(PositionRequest::new(PositionState::Sitting))),
                (id, Command::Fly),
            ])
            .unwrap();
        assert_eq!(summary.commands_done, 1);
        assert_eq!(summary.commands_refused, 1);
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.characters, 1);
        assert!(!summary.echoes.is_empty());
    }
}
