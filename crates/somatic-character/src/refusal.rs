//! Gameplay refusals: the reasons an action is not allowed.
//!
//! A refusal is an expected outcome, not an error. Every `can_*` predicate
//! has a `why_cannot_*` twin returning one of these, and every mutator
//! returns `Ok(Err(refusal))` when it declines to act. The `Display` text is
//! written for the acting player.

use somatic_types::{Consciousness, PositionState};

/// Why a posture change was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionRefusal {
    /// The character is not awake.
    #[error("You cannot do that while {}.", .0.describe())]
    NotAwake(Consciousness),

    /// Nothing would change.
    #[error("You are already in that position.")]
    AlreadyThere,

    /// The body has no such posture at all.
    #[error("Your body is not capable of {}.", .0.describe())]
    InvalidForBody(PositionState),

    /// The current posture must be left before re-positioning.
    #[error("You must get up from {} first.", .0.describe())]
    Restricted(PositionState),

    /// A modifier was given without anything to apply it to.
    #[error("You need something to position yourself against.")]
    MissingTarget,

    /// The target is the character itself.
    #[error("You cannot position yourself against yourself.")]
    SelfTarget,

    /// The target is not here.
    #[error("You do not see that here.")]
    TargetNotHere,

    /// The target does not allow that kind of positioning.
    #[error("You cannot be {state} {preposition} that.")]
    TargetRefuses {
        /// The requested posture.
        state: PositionState,
        /// The requested modifier's preposition.
        preposition: &'static str,
    },

    /// The character is in the middle of a move.
    #[error("You cannot change position while you are moving.")]
    Moving,

    /// An effect pins the character in another posture.
    #[error("You are being held {}.", .0.describe())]
    Forced(PositionState),

    /// Injuries prevent the posture.
    #[error("Your injuries prevent you from {}.", .0.describe())]
    Incapable(PositionState),

    /// The layer has nothing to rest on.
    #[error("There is nothing here to support you {}.", .0.describe())]
    NoFooting(PositionState),

    /// Swimming postures need water.
    #[error("You need to be in water to be {}.", .0.describe())]
    NeedsWater(PositionState),

    /// Not enough stamina.
    #[error("You are too exhausted to do that.")]
    TooTired,
}

/// Why a move through an exit was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveRefusal {
    /// The character is not awake.
    #[error("You cannot do that while {}.", .0.describe())]
    NotAwake(Consciousness),

    /// There is no such exit from here.
    #[error("You cannot go that way.")]
    NoSuchExit,

    /// A movement is already in progress.
    #[error("You are already moving.")]
    AlreadyMoving,

    /// The character is plunging through the air.
    #[error("You are falling!")]
    Falling,

    /// Locked in melee without trying to flee.
    #[error("You cannot simply walk away from melee; you must flee.")]
    InMelee,

    /// An effect blocks movement.
    #[error("{0}")]
    Blocked(String),

    /// The posture does not allow movement.
    #[error("You must stand up from {} before you can move.", .0.describe())]
    Restricted(PositionState),

    /// The character must first get out of or off something.
    #[error("You must get {0} that first.")]
    Enclosed(&'static str),

    /// Not enough stamina.
    #[error("You are too exhausted to move.")]
    TooTired,

    /// The character is too big for the exit.
    #[error("You are too big to fit through there.")]
    TooBig,

    /// The thing being dragged is too big for the exit.
    #[error("What you are dragging will not fit through there.")]
    DragTooBig,

    /// The thing to drag is not here.
    #[error("You do not see that here to drag.")]
    DragTargetNotHere,

    /// The exit can only be flown through.
    #[error("You must be able to fly to go that way.")]
    MustFly,

    /// The exit can only be swum through.
    #[error("You must be able to swim to go that way.")]
    MustSwim,

    /// Branch-to-branch travel needs climbing.
    #[error("You must be able to climb to travel through the branches.")]
    MustClimb,

    /// Going that way means flying; the override flag is required.
    #[error("You would have to fly to go that way. Take to the air first, or insist.")]
    UnsafeFlight,

    /// Going that way means swimming; the override flag is required.
    #[error(
        "You would have to swim to go that way. Insist if you really want to.{}",
        .drowning.then_some(" **You are very likely to drown!**").unwrap_or_default()
    )]
    UnsafeSwim {
        /// Whether the stay-afloat check would be an abject failure.
        drowning: bool,
    },

    /// The exit is a drop; the override flag is required.
    #[error("That way is a sheer drop. Insist if you really want to jump.")]
    UnsafeDrop,
}

/// Why a fly, swim or climb action was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlightRefusal {
    /// The character is not awake.
    #[error("You cannot do that while {}.", .0.describe())]
    NotAwake(Consciousness),

    /// A movement is in progress.
    #[error("You cannot do that while you are moving.")]
    Moving,

    /// Locked in melee.
    #[error("You cannot do that while locked in melee.")]
    InMelee,

    /// An effect blocks the action.
    #[error("{0}")]
    Blocked(String),

    /// The body cannot do this at all.
    #[error("You are not able to {0}.")]
    Incapable(&'static str),

    /// Already flying.
    #[error("You are already flying.")]
    AlreadyFlying,

    /// Not flying.
    #[error("You are not flying.")]
    NotFlying,

    /// Already swimming.
    #[error("You are already swimming.")]
    AlreadySwimming,

    /// Not swimming.
    #[error("You are not swimming.")]
    NotSwimming,

    /// Not in water.
    #[error("You are not in water.")]
    NotInWater,

    /// Already at the surface.
    #[error("You are already at the surface.")]
    AtSurface,

    /// No higher layer here.
    #[error("You cannot go any higher here.")]
    NoLayerAbove,

    /// No lower layer here.
    #[error("You cannot go any lower here.")]
    NoLayerBelow,

    /// Nothing to climb.
    #[error("There is nothing here to climb.")]
    NothingToClimb,

    /// Cannot fly down into water without swimming.
    #[error("You would plunge into the water.")]
    WouldEnterWater,

    /// Not enough stamina.
    #[error("You are too exhausted to do that.")]
    TooTired,
}

/// Why an engagement, flee or truce was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngageRefusal {
    /// The character is not awake.
    #[error("You cannot do that while {}.", .0.describe())]
    NotAwake(Consciousness),

    /// Self-targeting.
    #[error("You cannot attack yourself.")]
    SelfTarget,

    /// Already fighting that target.
    #[error("You are already fighting them.")]
    AlreadyTargeting,

    /// The target is not here or not in sight.
    #[error("You cannot see them from here.")]
    OutOfRange,

    /// The target is dead.
    #[error("They are already dead.")]
    TargetDead,

    /// The target is helpless and settings forbid attacking them.
    #[error("They are helpless, and you will not attack the helpless.")]
    TargetHelpless,

    /// The room forbids violence.
    #[error("This is a place of peace.")]
    PeacefulLocation,

    /// The character is a pacifist.
    #[error("You cannot bring yourself to fight.")]
    Pacifist,

    /// In a friendly bout with somebody else.
    #[error("You are in a friendly bout with someone else.")]
    FriendlyBout,

    /// An effect blocks engagement.
    #[error("{0}")]
    Blocked(String),

    /// Mid-fall.
    #[error("You cannot fight while falling!")]
    Falling,

    /// Recently rescued from this target.
    #[error("You were just rescued from them; give it a moment.")]
    RecentlyRescued,

    /// Not in combat at all.
    #[error("You are not fighting anyone.")]
    NotInCombat,

    /// Already fleeing.
    #[error("You are already trying to flee.")]
    AlreadyFleeing,

    /// Already asked for a truce.
    #[error("You have already asked for a truce.")]
    AlreadyRequestedTruce,
}

/// Why a stop was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopRefusal {
    /// Nothing to stop.
    #[error("You are not moving.")]
    NotMoving,

    /// An effect prevents stopping.
    #[error("{0}")]
    Blocked(String),
}
