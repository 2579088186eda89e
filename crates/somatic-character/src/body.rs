//! Body capability: what a physical form can do given its injuries.
//!
//! The rules engine never inspects limbs directly. It asks a [`Body`]
//! whether it can stand, kneel, sit up, fly, swim or climb, how fast it moves
//! in a given posture, and how encumbered it is. The body also owns the
//! character's stamina ledger.
//!
//! [`LimbBody`] is the stock implementation: a set of named limbs, each of
//! which is usable until severed or damaged to its limit.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use somatic_types::{BodypartId, PositionState, Size};

use crate::stamina::Stamina;

/// Broad category of a bodypart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LimbKind {
    /// Head.
    Head,
    /// Torso.
    Torso,
    /// Arm.
    Arm,
    /// Leg.
    Leg,
    /// Wing.
    Wing,
    /// Tail.
    Tail,
    /// Fin.
    Fin,
}

/// A single bodypart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limb {
    /// Stable identifier.
    pub id: BodypartId,
    /// Display name ("left leg").
    pub name: String,
    /// Category.
    pub kind: LimbKind,
    /// Accumulated damage.
    pub damage: f64,
    /// Damage at which the limb stops working.
    pub max_hp: f64,
    /// Whether the limb has been lost.
    pub severed: bool,
}

impl Limb {
    /// Create an undamaged limb.
    pub fn new(name: impl Into<String>, kind: LimbKind, max_hp: f64) -> Self {
        Self {
            id: BodypartId::new(),
            name: name.into(),
            kind,
            damage: 0.0,
            max_hp,
            severed: false,
        }
    }

    /// Whether the limb still works.
    pub fn usable(&self) -> bool {
        !self.severed && self.damage < self.max_hp
    }
}

/// Speed entry for one posture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveSpeed {
    /// Multiplier on movement time.
    pub multiplier: f64,
    /// Multiplier on movement stamina cost.
    pub stamina_multiplier: f64,
}

impl MoveSpeed {
    /// Unmodified speed and cost.
    pub const NORMAL: Self = Self {
        multiplier: 1.0,
        stamina_multiplier: 1.0,
    };
}

impl Default for MoveSpeed {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Physical capabilities consulted by every posture and movement rule.
pub trait Body: core::fmt::Debug + Send {
    /// Whether the body can stand, optionally with an aid such as a crutch.
    fn can_stand(&self, unaided: bool) -> bool;

    /// Whether the body can kneel.
    fn can_kneel(&self) -> bool;

    /// Whether the body can hold itself sitting up.
    fn can_sit_up(&self) -> bool;

    /// Whether a specific bodypart is usable.
    fn can_use_limb(&self, part: BodypartId) -> bool;

    /// Every bodypart.
    fn bodyparts(&self) -> Vec<&Limb>;

    /// Whether the body can fly right now.
    fn can_fly(&self) -> bool;

    /// Whether the body can swim right now.
    fn can_swim(&self) -> bool;

    /// Whether the body can climb right now.
    fn can_climb(&self) -> bool;

    /// Speed and cost multipliers for moving in `state`.
    fn speed(&self, state: PositionState) -> MoveSpeed;

    /// Postures this kind of body has at all.
    fn valid_positions(&self) -> &BTreeSet<PositionState>;

    /// Whether `state` is one of the body's postures.
    fn is_valid_position(&self, state: PositionState) -> bool {
        self.valid_positions().contains(&state)
    }

    /// Size class.
    fn size(&self) -> Size;

    /// Own weight.
    fn weight(&self) -> f64;

    /// How much weight the body can carry or drag.
    fn carrying_capacity(&self) -> f64;

    /// Encumbrance as a fraction of carrying capacity (0.0 when unladen).
    fn encumbrance(&self) -> f64;

    /// Total wound damage across all bodyparts.
    fn wound_total(&self) -> f64;

    /// Apply damage to a bodypart, returning the damage actually taken.
    fn apply_damage(&mut self, part: BodypartId, amount: f64) -> f64;

    /// The stamina ledger.
    fn stamina(&self) -> &Stamina;

    /// The stamina ledger, mutably.
    fn stamina_mut(&mut self) -> &mut Stamina;
}

/// A body made of discrete limbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbBody {
    /// Bodyparts by id.
    limbs: BTreeMap<BodypartId, Limb>,
    /// Postures this body has.
    positions: BTreeSet<PositionState>,
    /// Per-posture speed overrides.
    speeds: BTreeMap<PositionState, MoveSpeed>,
    /// Size class.
    size: Size,
    /// Own weight.
    weight: f64,
    /// Weight currently carried.
    carried: f64,
    /// Maximum carry weight.
    capacity: f64,
    /// Stamina ledger.
    stamina: Stamina,
}

impl LimbBody {
    /// A two-armed, two-legged walker.
    pub fn humanoid(max_stamina: f64) -> Self {
        let limbs = [
            Limb::new("head", LimbKind::Head, 40.0),
            Limb::new("torso", LimbKind::Torso, 80.0),
            Limb::new("left arm", LimbKind::Arm, 40.0),
            Limb::new("right arm", LimbKind::Arm, 40.0),
            Limb::new("left leg", LimbKind::Leg, 50.0),
            Limb::new("right leg", LimbKind::Leg, 50.0),
        ];
        let positions = PositionState::ALL
            .iter()
            .copied()
            .filter(|state| *state != PositionState::Flying)
            .collect();
        Self {
            limbs: limbs.into_iter().map(|limb| (limb.id, limb)).collect(),
            positions,
            speeds: default_speeds(),
            size: Size::Normal,
            weight: 70.0,
            carried: 0.0,
            capacity: 60.0,
            stamina: Stamina::new(max_stamina),
        }
    }

    /// A humanoid with a pair of wings.
    pub fn winged(max_stamina: f64) -> Self {
        let mut body = Self::humanoid(max_stamina);
        for name in ["left wing", "right wing"] {
            let wing = Limb::new(name, LimbKind::Wing, 30.0);
            body.limbs.insert(wing.id, wing);
        }
        body.positions.insert(PositionState::Flying);
        body
    }

    /// Override the size class.
    #[must_use]
    pub const fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Set carried weight and carrying capacity.
    #[must_use]
    pub const fn with_load(mut self, carried: f64, capacity: f64) -> Self {
        self.carried = carried;
        self.capacity = capacity;
        self
    }

    /// Find a bodypart by name.
    pub fn limb_named(&self, name: &str) -> Option<BodypartId> {
        self.limbs
            .values()
            .find(|limb| limb.name == name)
            .map(|limb| limb.id)
    }

    /// Lose a bodypart. Returns whether it existed.
    pub fn sever(&mut self, part: BodypartId) -> bool {
        match self.limbs.get_mut(&part) {
            Some(limb) => {
                limb.severed = true;
                true
            }
            None => false,
        }
    }

    /// Lose every bodypart of `kind`.
    pub fn sever_all(&mut self, kind: LimbKind) {
        for limb in self.limbs.values_mut().filter(|limb| limb.kind == kind) {
            limb.severed = true;
        }
    }

    fn usable(&self, kind: LimbKind) -> usize {
        self.limbs
            .values()
            .filter(|limb| limb.kind == kind && limb.usable())
            .count()
    }
}

fn default_speeds() -> BTreeMap<PositionState, MoveSpeed> {
    let entry = |state, multiplier, stamina_multiplier| {
        (
            state,
            MoveSpeed {
                multiplier,
                stamina_multiplier,
            },
        )
    };
    BTreeMap::from([
        entry(PositionState::Prostrate, 3.0, 1.5),
        entry(PositionState::Prone, 3.0, 1.5),
        entry(PositionState::Climbing, 2.0, 2.0),
        entry(PositionState::Swimming, 1.5, 2.0),
        entry(PositionState::Floating, 2.0, 1.0),
        entry(PositionState::Flying, 0.5, 1.5),
    ])
}

impl Body for LimbBody {
    fn can_stand(&self, unaided: bool) -> bool {
        let legs = self.usable(LimbKind::Leg);
        if unaided { legs >= 2 } else { legs >= 1 }
    }

    fn can_kneel(&self) -> bool {
        let legs = self.usable(LimbKind::Leg);
        legs >= 2 || (legs >= 1 && self.usable(LimbKind::Arm) >= 1)
    }

    fn can_sit_up(&self) -> bool {
        self.usable(LimbKind::Torso) >= 1
    }

    fn can_use_limb(&self, part: BodypartId) -> bool {
        self.limbs.get(&part).is_some_and(Limb::usable)
    }

    fn bodyparts(&self) -> Vec<&Limb> {
        self.limbs.values().collect()
    }

    fn can_fly(&self) -> bool {
        self.positions.contains(&PositionState::Flying) && self.usable(LimbKind::Wing) >= 2
    }

    fn can_swim(&self) -> bool {
        self.limbs.values().any(|limb| {
            limb.usable()
                && matches!(
                    limb.kind,
                    LimbKind::Arm | LimbKind::Leg | LimbKind::Fin | LimbKind::Tail
                )
        })
    }

    fn can_climb(&self) -> bool {
        let arms = self.usable(LimbKind::Arm);
        arms >= 2 || (arms >= 1 && self.usable(LimbKind::Leg) >= 1)
    }

    fn speed(&self, state: PositionState) -> MoveSpeed {
        self.speeds.get(&state).copied().unwrap_or_default()
    }

    fn valid_positions(&self) -> &BTreeSet<PositionState> {
        &self.positions
    }

    fn size(&self) -> Size {
        self.size
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn carrying_capacity(&self) -> f64 {
        self.capacity
    }

    fn encumbrance(&self) -> f64 {
        if self.capacity > 0.0 {
            (self.carried / self.capacity).max(0.0)
        } else {
            1.0
        }
    }

    fn wound_total(&self) -> f64 {
        self.limbs.values().map(|limb| limb.damage).sum()
    }

    fn apply_damage(&mut self, part: BodypartId, amount: f64) -> f64 {
        let Some(limb) = self.limbs.get_mut(&part) else {
            return 0.0;
        };
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.min(limb.max_hp - limb.damage).max(0.0);
        limb.damage += taken;
        taken
    }

    fn stamina(&self) -> &Stamina {
        &self.stamina
    }

    fn stamina_mut(&mut self) -> &mut Stamina {
        &mut self.stamina
    }
}
