//! Character physical state and engagement rules for the Somatic engine.
//!
//! This crate is the rules layer: posture, movement between rooms and
//! layers, the stamina ledger, falls, and combat engagement. It sits between
//! `somatic-types`/`somatic-world` (data) and `somatic-core` (scheduling).
//! Nothing here performs I/O or reads a clock; the engine passes game time
//! in and schedules the durations handed back.
//!
//! Every `can_*` predicate on [`CharacterView`] is pure and paired with a
//! `why_cannot_*` returning a typed refusal. Mutators on [`Realm`] return
//! `Result<Result<Report, Refusal>, CharacterError>`: the outer error is an
//! invariant violation, the inner one an ordinary "you can't do that".
//!
//! # Modules
//!
//! - [`body`] -- The [`Body`] capability trait and [`LimbBody`]
//! - [`character`] -- [`Character`] state, movement and fall records
//! - [`combat`] -- Combat aggregates and their registry
//! - [`config`] -- Tunable stamina, movement and combat parameters ([`RulesConfig`])
//! - [`effects`] -- Effect registry queried by capability bits
//! - [`engagement`] -- Engage, acquire target, flee, truce, facing
//! - [`error`] -- Invariant violations ([`CharacterError`])
//! - [`flight`] -- Fly, swim and climb sub-machines, falls, heartbeat upkeep
//! - [`movement`] -- Exit traversal, queued moves, stop
//! - [`position`] -- The posture state machine and rider cascade
//! - [`realm`] -- [`Realm`] owner and [`CharacterView`]
//! - [`refusal`] -- Player-facing refusal reasons
//! - [`roster`] -- Character storage and reverse lookups
//! - [`skill_check`] -- The [`SkillCheckOracle`] seam and stock oracles
//! - [`stamina`] -- The stamina and exertion ledger

pub mod body;
pub mod character;
pub mod combat;
pub mod config;
pub mod effects;
pub mod engagement;
pub mod error;
pub mod flight;
pub mod movement;
pub mod position;
pub mod realm;
pub mod refusal;
pub mod roster;
pub mod skill_check;
pub mod stamina;

// Re-export primary types at crate root for convenience.
pub use body::{Body, Limb, LimbBody, LimbKind, MoveSpeed};
pub use character::{Character, CombatSettings, MoveRequest, Movement, PendingFall};
pub use combat::{Combat, CombatAggregate, CombatRegistry};
pub use config::{CombatConfig, ExertionThresholds, MovementConfig, RulesConfig, StaminaConfig};
pub use effects::{Capabilities, Effect, EffectKind, EffectRegistry};
pub use engagement::{CombatCheck, EngageReport};
pub use error::CharacterError;
pub use flight::{ClimbReport, FALL_CONFIRM_EASIER_STEPS, FallReport, FallStart, UpkeepReport};
pub use movement::{ArrivalReport, MovePlan, MoveReport, QueueOutcome, StopReport};
pub use position::{PositionReport, PositionRequest};
pub use realm::{CharacterView, ConsciousnessReport, Realm};
pub use refusal::{EngageRefusal, FlightRefusal, MoveRefusal, PositionRefusal, StopRefusal};
pub use roster::Roster;
pub use skill_check::{RollUnderOracle, ScriptedOracle, SkillCheckOracle};
pub use stamina::Stamina;
