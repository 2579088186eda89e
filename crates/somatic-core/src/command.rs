//! Command source trait and scripted implementation.
//!
//! Each engine step begins by asking a [`CommandSource`] what characters
//! want to do. The trait abstracts where commands come from: a network
//! session, an AI, or a fixed script for demos and tests.

use std::collections::BTreeMap;

use somatic_character::{MoveRequest, PositionRequest};
use somatic_types::CharacterId;

/// Errors that can occur while collecting commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// An internal error in the command source.
    #[error("command source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// Something a character asks to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Cross an exit now.
    Move(MoveRequest),
    /// Cross an exit after the current move, or now if idle.
    QueueMove(MoveRequest),
    /// Change posture.
    Position(PositionRequest),
    /// Stop moving and drop queued moves.
    Stop {
        /// Override blocking effects.
        force: bool,
    },
    /// Take to the air.
    Fly,
    /// Land on the nearest footing below.
    Land,
    /// Rise one layer.
    Ascend,
    /// Sink one layer.
    Dive,
    /// Start swimming.
    Swim,
    /// Climb one layer up.
    ClimbUp,
    /// Climb one layer down.
    ClimbDown,
    /// Attack a character.
    Engage {
        /// Who to attack.
        target: CharacterId,
        /// Open at range.
        ranged: bool,
    },
    /// Turn to face the nearest attacker.
    AcquireTarget,
    /// Try to get away from combat.
    Flee,
    /// Ask for the fight to end.
    Truce,
    /// Fall asleep.
    Sleep,
    /// Wake up.
    Wake,
    /// Leave the world.
    Logout,
}

/// A source of character commands.
pub trait CommandSource {
    /// Commands to apply at the start of `tick`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the source fails entirely.
    fn commands_for(&mut self, tick: u64) -> Result<Vec<(CharacterId, Command)>, CommandError>;
}

/// A source that never issues anything.
#[derive(Debug, Clone, Default)]
pub struct StubCommandSource;

impl StubCommandSource {
    /// Create a new stub command source.
    pub const fn new() -> Self {
        Self
    }
}

impl CommandSource for StubCommandSource {
    fn commands_for(&mut self, _tick: u64) -> Result<Vec<(CharacterId, Command)>, CommandError> {
        Ok(Vec::new())
    }
}

/// A fixed script of commands keyed by tick.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommands {
    script: BTreeMap<u64, Vec<(CharacterId, Command)>>,
}

impl ScriptedCommands {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `command` for `character` at `tick`.
    #[must_use]
    pub fn at(mut self, tick: u64, character: CharacterId, command: Command) -> Self {
        self.push(tick, character, command);
        self
    }

    /// Issue `command` for `character` at `tick`.
    pub fn push(&mut self, tick: u64, character: CharacterId, command: Command) {
        self.script.entry(tick).or_default().push((character, command));
    }

    /// The last tick with anything scripted.
    pub fn last_tick(&self) -> Option<u64> {
        self.script.keys().next_back().copied()
    }

    /// Number of commands not yet handed out.
    pub fn remaining(&self) -> usize {
        self.script.values().map(Vec::len).sum()
    }
}

impl CommandSource for ScriptedCommands {
    fn commands_for(&mut self, tick: u64) -> Result<Vec<(CharacterId, Command)>, CommandError> {
        Ok(self.script.remove(&tick).unwrap_or_default())
    }
}
