//! Terrain: which vertical layers a room has and how hard it is to cross.
//!
//! A terrain is a value type shared by every room built from it. It answers
//! the layer questions the movement engine asks: does this layer exist here,
//! does it have footing, is it water, what is the nearest layer that does
//! exist, and where does a falling body come to rest.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use somatic_types::{Difficulty, RoomLayer};

use crate::error::WorldError;

/// Density of fresh water. Fluids at or above this keep a body afloat
/// at `Normal` difficulty.
pub const FRESH_WATER_DENSITY: f64 = 1.0;

/// Density of sea water.
pub const SEA_WATER_DENSITY: f64 = 1.025;

/// Physical properties of a room's ground (or lack of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Display name ("forest", "river").
    pub name: String,
    /// The layers that exist in rooms with this terrain.
    pub layers: BTreeSet<RoomLayer>,
    /// Multiplier applied to movement time through the room.
    pub movement_rate: f64,
    /// Difficulty of staying hidden here.
    pub hide_difficulty: Difficulty,
    /// Difficulty of climbing into the climbable layers.
    pub climb_difficulty: Difficulty,
    /// Density of the fluid at ground level; zero for dry land.
    pub fluid_density: f64,
}

impl Terrain {
    /// Build a dry terrain with the given layers.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyTerrain`] if `layers` is empty.
    pub fn new(
        name: impl Into<String>,
        layers: impl IntoIterator<Item = RoomLayer>,
    ) -> Result<Self, WorldError> {
        let name = name.into();
        let layers: BTreeSet<RoomLayer> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(WorldError::EmptyTerrain(name));
        }
        Ok(Self {
            name,
            layers,
            movement_rate: 1.0,
            hide_difficulty: Difficulty::Normal,
            climb_difficulty: Difficulty::Normal,
            fluid_density: 0.0,
        })
    }

    /// Set the movement-rate multiplier.
    #[must_use]
    pub const fn with_movement_rate(mut self, rate: f64) -> Self {
        self.movement_rate = rate;
        self
    }

    /// Set the hiding difficulty.
    #[must_use]
    pub const fn with_hide_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.hide_difficulty = difficulty;
        self
    }

    /// Set the climbing difficulty.
    #[must_use]
    pub const fn with_climb_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.climb_difficulty = difficulty;
        self
    }

    /// Flood ground level with a fluid of the given density.
    #[must_use]
    pub const fn with_fluid(mut self, density: f64) -> Self {
        self.fluid_density = density;
        self
    }

    // -------------------------------------------------------------------
    // Layer queries
    // -------------------------------------------------------------------

    /// Whether rooms with this terrain have the given layer.
    pub fn supports(&self, layer: RoomLayer) -> bool {
        self.layers.contains(&layer)
    }

    /// Whether ground level is a water surface.
    pub fn is_aquatic(&self) -> bool {
        self.fluid_density > 0.0
    }

    /// Whether a body in `layer` is in water.
    pub fn is_water_layer(&self, layer: RoomLayer) -> bool {
        layer.is_underwater() || (layer == RoomLayer::GroundLevel && self.is_aquatic())
    }

    /// Whether `layer` offers something to stand, sit or lie on.
    pub fn has_footing(&self, layer: RoomLayer) -> bool {
        self.supports(layer) && !layer.is_air() && !self.is_water_layer(layer)
    }

    /// Lowest layer present.
    pub fn lowest_layer(&self) -> RoomLayer {
        self.layers
            .iter()
            .next()
            .copied()
            .unwrap_or(RoomLayer::GroundLevel)
    }

    /// Highest layer present.
    pub fn highest_layer(&self) -> RoomLayer {
        self.layers
            .iter()
            .next_back()
            .copied()
            .unwrap_or(RoomLayer::GroundLevel)
    }

    /// The nearest supported layer to `layer`.
    ///
    /// Returns `layer` itself when supported. Otherwise the supported layer
    /// with the smallest height difference wins, with ties going to the
    /// lower layer.
    pub fn nearest_layer(&self, layer: RoomLayer) -> RoomLayer {
        if self.supports(layer) {
            return layer;
        }
        self.layers
            .iter()
            .copied()
            .min_by_key(|candidate| {
                let distance = (i16::from(candidate.height()) - i16::from(layer.height())).abs();
                (distance, *candidate)
            })
            .unwrap_or(RoomLayer::GroundLevel)
    }

    /// The next supported layer above `layer`, if any.
    pub fn layer_above(&self, layer: RoomLayer) -> Option<RoomLayer> {
        self.layers
            .range((
                core::ops::Bound::Excluded(layer),
                core::ops::Bound::Unbounded,
            ))
            .next()
            .copied()
    }

    /// The next supported layer below `layer`, if any.
    pub fn layer_below(&self, layer: RoomLayer) -> Option<RoomLayer> {
        self.layers.range(..layer).next_back().copied()
    }

    /// Where a body falling from `layer` comes to rest: the highest layer
    /// below it that has footing or is water. Falls through every layer to
    /// the lowest if nothing catches it.
    pub fn landing_layer(&self, layer: RoomLayer) -> RoomLayer {
        self.layers
            .range(..layer)
            .rev()
            .copied()
            .find(|candidate| self.has_footing(*candidate) || self.is_water_layer(*candidate))
            .unwrap_or_else(|| self.lowest_layer())
    }

    /// Number of layers between `from` and `to` (exclusive of `to`), used to
    /// scale fall damage.
    pub fn layers_between(&self, from: RoomLayer, to: RoomLayer) -> usize {
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        self.layers.range(low..high).count()
    }

    /// Difficulty of keeping one's head above water here.
    ///
    /// Denser fluids are more buoyant.
    pub fn stay_afloat_difficulty(&self) -> Difficulty {
        if self.fluid_density >= 1.2 {
            Difficulty::VeryEasy
        } else if self.fluid_density >= SEA_WATER_DENSITY {
            Difficulty::Easy
        } else if self.fluid_density >= FRESH_WATER_DENSITY {
            Difficulty::Normal
        } else {
            Difficulty::Hard
        }
    }
}

// ---------------------------------------------------------------------------
// Stock terrains
// ---------------------------------------------------------------------------

/// Stock terrain definitions used by the starting world and tests.
pub mod stock {
    use somatic_types::{Difficulty, RoomLayer};

    use super::{FRESH_WATER_DENSITY, Terrain};
    use crate::error::WorldError;

    /// Open grassland: ground and sky.
    ///
    /// # Errors
    ///
    /// Never in practice; propagates [`Terrain::new`].
    pub fn plains() -> Result<Terrain, WorldError> {
        Ok(Terrain::new(
            "plains",
            [RoomLayer::GroundLevel, RoomLayer::InAir, RoomLayer::HighInAir],
        )?
        .with_hide_difficulty(Difficulty::Hard))
    }

    /// Woodland with two tiers of branches.
    ///
    /// # Errors
    ///
    /// Never in practice; propagates [`Terrain::new`].
    pub fn forest() -> Result<Terrain, WorldError> {
        Ok(Terrain::new(
            "forest",
            [
                RoomLayer::GroundLevel,
                RoomLayer::InTrees,
                RoomLayer::HighInTrees,
                RoomLayer::InAir,
            ],
        )?
        .with_movement_rate(1.5)
        .with_hide_difficulty(Difficulty::Easy)
        .with_climb_difficulty(Difficulty::Easy))
    }

    /// A deep river.
    ///
    /// # Errors
    ///
    /// Never in practice; propagates [`Terrain::new`].
    pub fn river() -> Result<Terrain, WorldError> {
        Ok(Terrain::new(
            "river",
            [
                RoomLayer::DeepUnderwater,
                RoomLayer::Underwater,
                RoomLayer::GroundLevel,
                RoomLayer::InAir,
            ],
        )?
        .with_movement_rate(2.0)
        .with_fluid(FRESH_WATER_DENSITY))
    }

    /// Streets with climbable rooftops.
    ///
    /// # Errors
    ///
    /// Never in practice; propagates [`Terrain::new`].
    pub fn town() -> Result<Terrain, WorldError> {
        Ok(Terrain::new(
            "town",
            [
                RoomLayer::GroundLevel,
                RoomLayer::OnRooftops,
                RoomLayer::InAir,
            ],
        )?
        .with_movement_rate(0.8)
        .with_climb_difficulty(Difficulty::Hard))
    }

    /// Open sky with nothing underneath for a long way.
    ///
    /// # Errors
    ///
    /// Never in practice; propagates [`Terrain::new`].
    pub fn open_sky() -> Result<Terrain, WorldError> {
        Ok(Terrain::new("open sky", [RoomLayer::InAir, RoomLayer::HighInAir])?
            .with_hide_difficulty(Difficulty::Impossible))
    }
}
