//! Effects attached to characters and the capability queries over them.
//!
//! Each [`EffectKind`] reports a fixed [`Capabilities`] mask. Rules query
//! the registry by capability ("does anything block movement?") instead of
//! matching on effect types, and blocking effects name the actions they
//! block so a rule can ask "is `move` blocked?" without knowing who blocks
//! it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use somatic_types::{CharacterId, EffectId, Facing, PositionState};

bitflags! {
    /// Capability bits an effect can carry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        /// Vetoes named actions.
        const BLOCKS         = 1 << 0;
        /// The character will not start fights.
        const PACIFISM       = 1 << 1;
        /// Violence is forbidden around the character.
        const PEACEFUL       = 1 << 2;
        /// Only a sparring partner may be engaged.
        const FRIENDLY_BOUT  = 1 << 3;
        /// Pins the character in a posture.
        const FORCES_POSITION = 1 << 4;
        /// Movement ignores every rule (administrative passage).
        const IGNORES_MOVEMENT = 1 << 5;
        /// Recently rescued from an attacker.
        const RESCUED        = 1 << 6;
        /// Fixes the facing presented to an opponent.
        const FIXED_FACING   = 1 << 7;
        /// Scales movement time.
        const SPEED          = 1 << 8;
        /// Locks opponents in a clinch when entering melee.
        const GRAPPLER       = 1 << 9;
        /// Held in a clinch.
        const CLINCHED       = 1 << 10;
        /// Fighting on the move, exposing the flank.
        const SKIRMISHING    = 1 << 11;
    }
}

/// What an effect does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Blocks the named actions (`"move"`, `"position"`, `"fly"`, `"engage"`,
    /// `"stop"`, ...).
    Block {
        /// Action names blocked.
        actions: Vec<String>,
        /// Player-facing reason.
        reason: String,
    },
    /// Refuses to start fights.
    Pacifism,
    /// Nobody may start a fight with or around this character.
    Sanctuary,
    /// Sparring with one opponent only.
    FriendlyBout {
        /// The sparring partner.
        opponent: CharacterId,
    },
    /// Held in a posture.
    ForcePosition {
        /// The posture.
        state: PositionState,
    },
    /// Moves without any checks.
    IgnoreMovement,
    /// Rescued from an attacker.
    RescuedFrom {
        /// The attacker.
        attacker: CharacterId,
    },
    /// Always presents the same facing to an opponent.
    FixedFacing {
        /// The opponent.
        opponent: CharacterId,
        /// The facing presented.
        facing: Facing,
    },
    /// Multiplies movement time.
    SpeedMultiplier(f64),
    /// Grabs melee opponents.
    Grappler,
    /// Held in a clinch by an opponent.
    Clinch {
        /// The grappler.
        opponent: CharacterId,
    },
    /// Skirmishing.
    Skirmishing,
}

impl EffectKind {
    /// Capability mask of this kind.
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Self::Block { .. } => Capabilities::BLOCKS,
            Self::Pacifism => Capabilities::PACIFISM,
            Self::Sanctuary => Capabilities::PEACEFUL,
            Self::FriendlyBout { .. } => Capabilities::FRIENDLY_BOUT,
            Self::ForcePosition { .. } => Capabilities::FORCES_POSITION,
            Self::IgnoreMovement => Capabilities::IGNORES_MOVEMENT,
            Self::RescuedFrom { .. } => Capabilities::RESCUED,
            Self::FixedFacing { .. } => Capabilities::FIXED_FACING,
            Self::SpeedMultiplier(_) => Capabilities::SPEED,
            Self::Grappler => Capabilities::GRAPPLER,
            Self::Clinch { .. } => Capabilities::CLINCHED.union(Capabilities::BLOCKS),
            Self::Skirmishing => Capabilities::SKIRMISHING,
        }
    }
}

/// An effect instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Unique identifier.
    pub id: EffectId,
    /// What it does.
    pub kind: EffectKind,
    /// Game time at which it lapses, if ever.
    pub expires_at: Option<u64>,
}

impl Effect {
    /// A permanent effect.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            id: EffectId::new(),
            kind,
            expires_at: None,
        }
    }

    /// An effect lapsing at `expires_at`.
    pub fn until(kind: EffectKind, expires_at: u64) -> Self {
        Self {
            id: EffectId::new(),
            kind,
            expires_at: Some(expires_at),
        }
    }
}

/// The effects on one character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectRegistry {
    effects: Vec<Effect>,
}

impl EffectRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Attach an effect, returning its id.
    pub fn add(&mut self, effect: Effect) -> EffectId {
        let id = effect.id;
        self.effects.push(effect);
        id
    }

    /// Detach an effect by id.
    pub fn remove(&mut self, id: EffectId) -> Option<Effect> {
        let index = self.effects.iter().position(|effect| effect.id == id)?;
        Some(self.effects.remove(index))
    }

    /// Detach every effect matching `predicate`, returning how many went.
    pub fn remove_where(&mut self, predicate: impl Fn(&EffectKind) -> bool) -> usize {
        let before = self.effects.len();
        self.effects.retain(|effect| !predicate(&effect.kind));
        before.saturating_sub(self.effects.len())
    }

    /// Iterate over every effect.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Whether any effect carries `capability`.
    pub fn has(&self, capability: Capabilities) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.kind.capabilities().intersects(capability))
    }

    /// The reason `action` is blocked, if it is.
    pub fn blocking(&self, action: &str) -> Option<String> {
        self.effects.iter().find_map(|effect| match &effect.kind {
            EffectKind::Block { actions, reason } if actions.iter().any(|a| a == action) => {
                Some(reason.clone())
            }
            EffectKind::Clinch { .. } if action == "move" => {
                Some(String::from("You are held fast in a clinch."))
            }
            _ => None,
        })
    }

    /// The posture an effect pins the character in.
    pub fn forced_position(&self) -> Option<PositionState> {
        self.effects.iter().find_map(|effect| match effect.kind {
            EffectKind::ForcePosition { state } => Some(state),
            _ => None,
        })
    }

    /// Whether movement bypasses every check.
    pub fn ignores_movement(&self) -> bool {
        self.has(Capabilities::IGNORES_MOVEMENT)
    }

    /// Product of every speed multiplier.
    pub fn speed_multiplier(&self) -> f64 {
        self.effects
            .iter()
            .filter_map(|effect| match effect.kind {
                EffectKind::SpeedMultiplier(m) if m.is_finite() && m > 0.0 => Some(m),
                _ => None,
            })
            .product()
    }

    /// The facing fixed against `opponent`, if any.
    pub fn fixed_facing_for(&self, opponent: CharacterId) -> Option<Facing> {
        self.effects.iter().find_map(|effect| match effect.kind {
            EffectKind::FixedFacing {
                opponent: o,
                facing,
            } if o == opponent => Some(facing),
            _ => None,
        })
    }

    /// Whether the character was recently rescued from `attacker`.
    pub fn rescued_from(&self, attacker: CharacterId) -> bool {
        self.effects.iter().any(
            |effect| matches!(effect.kind, EffectKind::RescuedFrom { attacker: a } if a == attacker),
        )
    }

    /// The sparring partner, if in a friendly bout.
    pub fn friendly_bout_opponent(&self) -> Option<CharacterId> {
        self.effects.iter().find_map(|effect| match effect.kind {
            EffectKind::FriendlyBout { opponent } => Some(opponent),
            _ => None,
        })
    }

    /// Remove effects that lapsed at or before `now_ms`, returning them.
    pub fn prune_expired(&mut self, now_ms: u64) -> Vec<Effect> {
        let (expired, kept) = core::mem::take(&mut self.effects)
            .into_iter()
            .partition(|effect| effect.expires_at.is_some_and(|at| at <= now_ms));
        self.effects = kept;
        expired
    }
}
