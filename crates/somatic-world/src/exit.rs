//! Directed exits between rooms and the transition they impose.

use serde::{Deserialize, Serialize};
use somatic_types::{Difficulty, ExitId, RoomId, RoomLayer, Size, TransitionType};

use crate::terrain::Terrain;

/// A one-way passage from one room to another.
///
/// Two-way passages are two exits. Flags describe how the passage may be
/// crossed; terrain on either side decides the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    /// Unique identifier.
    pub id: ExitId,
    /// Room the exit leaves from.
    pub from: RoomId,
    /// Room the exit leads to.
    pub to: RoomId,
    /// Keyword a player types to use it ("north", "up").
    pub keyword: String,
    /// Only passable in flight.
    pub fly_only: bool,
    /// Only passable by swimming.
    pub swim_only: bool,
    /// Can be climbed instead of flown (a cliff face).
    pub climbable: bool,
    /// Crossing drops the traveller to a lower layer.
    pub fall_exit: bool,
    /// Largest size that fits through.
    pub max_size: Size,
    /// Multiplier on the time it takes to cross.
    pub time_multiplier: f64,
    /// Difficulty of climbing the exit when it is climbable.
    pub climb_difficulty: Difficulty,
}

impl Exit {
    /// Create a plain exit with no flags.
    pub fn new(from: RoomId, to: RoomId, keyword: impl Into<String>) -> Self {
        Self {
            id: ExitId::new(),
            from,
            to,
            keyword: keyword.into(),
            fly_only: false,
            swim_only: false,
            climbable: false,
            fall_exit: false,
            max_size: Size::Enormous,
            time_multiplier: 1.0,
            climb_difficulty: Difficulty::Normal,
        }
    }

    /// Mark the exit as passable only in flight.
    #[must_use]
    pub const fn fly_only(mut self) -> Self {
        self.fly_only = true;
        self
    }

    /// Mark the exit as passable only by swimming.
    #[must_use]
    pub const fn swim_only(mut self) -> Self {
        self.swim_only = true;
        self
    }

    /// Mark the exit as climbable at the given difficulty.
    #[must_use]
    pub const fn climbable(mut self, difficulty: Difficulty) -> Self {
        self.climbable = true;
        self.climb_difficulty = difficulty;
        self
    }

    /// Mark the exit as dropping its traveller.
    #[must_use]
    pub const fn fall_exit(mut self) -> Self {
        self.fall_exit = true;
        self
    }

    /// Limit the size of what can pass.
    #[must_use]
    pub const fn max_size(mut self, size: Size) -> Self {
        self.max_size = size;
        self
    }

    /// Scale the crossing time.
    #[must_use]
    pub const fn time_multiplier(mut self, multiplier: f64) -> Self {
        self.time_multiplier = multiplier;
        self
    }

    /// Whether something of `size` fits through.
    pub fn admits(&self, size: Size) -> bool {
        size <= self.max_size
    }

    /// The layer a traveller on `layer` arrives at on the far side.
    ///
    /// Fall exits drop the traveller in at the top of the destination; the
    /// fall itself is resolved on arrival.
    pub fn arrival_layer(&self, destination: &Terrain, layer: RoomLayer) -> RoomLayer {
        if self.fall_exit {
            destination.highest_layer()
        } else {
            destination.nearest_layer(layer)
        }
    }

    /// Classify the crossing of this exit for a traveller on `layer`.
    ///
    /// Exit flags win over terrain. Without flags, the terrain on each side
    /// decides: branches to branches, water to dry land, and dry land into
    /// water or open air each count as special transitions.
    pub fn transition_type(
        &self,
        origin: &Terrain,
        destination: &Terrain,
        layer: RoomLayer,
    ) -> TransitionType {
        if self.fall_exit {
            return TransitionType::FallExit;
        }
        if self.fly_only {
            return TransitionType::FlyOnly;
        }
        if self.swim_only {
            return TransitionType::SwimOnly;
        }
        let arrival = destination.nearest_layer(layer);
        if layer.is_tree_layer() && arrival.is_tree_layer() {
            return TransitionType::TreesToTrees;
        }
        let wet_origin = origin.is_water_layer(layer);
        let wet_arrival = destination.is_water_layer(arrival);
        if wet_origin && !wet_arrival {
            return TransitionType::SwimToLand;
        }
        if !wet_origin && wet_arrival {
            return TransitionType::SwimOnly;
        }
        if arrival.is_air() {
            return TransitionType::FlyOnly;
        }
        TransitionType::Normal
    }
}
