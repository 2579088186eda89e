//! Shared type definitions for the Somatic physical-state engine.
//!
//! Every crate in the workspace speaks in these types. Nothing here carries
//! behaviour beyond fixed attribute tables; the rules that combine them live
//! in `somatic-character`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for characters, rooms, exits and items
//! - [`position`] -- Postures, posture modifiers and their attribute tables
//! - [`layer`] -- Vertical room layers
//! - [`check`] -- Skill-check difficulties and graded outcomes
//! - [`enums`] -- Remaining enumerations (size, movement, exertion, combat)
//! - [`echo`] -- Observable output records

pub mod check;
pub mod echo;
pub mod enums;
pub mod ids;
pub mod layer;
pub mod position;

// Re-export all public types at crate root for convenience.
pub use check::{CheckResult, CheckType, Difficulty, Outcome};
pub use echo::Echo;
pub use enums::{
    CombatStatus, Consciousness, ExertionLevel, Facing, MovementKind, MovementPhase, Size,
    TransitionType,
};
pub use ids::{BodypartId, CharacterId, CombatId, EffectId, ExitId, ItemId, Perceivable, RoomId};
pub use layer::RoomLayer;
pub use position::{
    MoveRestriction, PositionModifier, PositionState, PostureClass, PostureDirection,
};
