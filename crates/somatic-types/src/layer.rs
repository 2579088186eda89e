//! Vertical layers within a room.
//!
//! A room is not a single plane. Characters may be on the ground, up in the
//! trees, on the rooftops, in the air above, or at some depth under water.
//! Which layers exist in a given room is decided by its terrain.

use serde::{Deserialize, Serialize};

/// A vertical stratum of a room.
///
/// Variants are declared bottom to top, so the derived ordering matches
/// physical height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomLayer {
    /// The crushing depths.
    VeryDeepUnderwater,
    /// Well below the surface.
    DeepUnderwater,
    /// Just below the surface.
    Underwater,
    /// Ground level, or the water's surface.
    GroundLevel,
    /// In the lower branches of trees.
    InTrees,
    /// On the roofs of buildings.
    OnRooftops,
    /// In the high canopy.
    HighInTrees,
    /// In the open air.
    InAir,
    /// High in the sky.
    HighInAir,
}

impl RoomLayer {
    /// Every layer from lowest to highest.
    pub const ALL: [Self; 9] = [
        Self::VeryDeepUnderwater,
        Self::DeepUnderwater,
        Self::Underwater,
        Self::GroundLevel,
        Self::InTrees,
        Self::OnRooftops,
        Self::HighInTrees,
        Self::InAir,
        Self::HighInAir,
    ];

    /// Signed height of the layer relative to ground level.
    pub const fn height(self) -> i8 {
        match self {
            Self::VeryDeepUnderwater => -3,
            Self::DeepUnderwater => -2,
            Self::Underwater => -1,
            Self::GroundLevel => 0,
            Self::InTrees | Self::OnRooftops => 1,
            Self::HighInTrees => 2,
            Self::InAir => 3,
            Self::HighInAir => 4,
        }
    }

    /// Whether the layer is beneath the water's surface.
    pub const fn is_underwater(self) -> bool {
        matches!(
            self,
            Self::Underwater | Self::DeepUnderwater | Self::VeryDeepUnderwater
        )
    }

    /// Whether the layer is open sky with nothing to stand on.
    pub const fn is_air(self) -> bool {
        matches!(self, Self::InAir | Self::HighInAir)
    }

    /// Whether the layer is reached by climbing.
    pub const fn is_climbable(self) -> bool {
        matches!(self, Self::InTrees | Self::HighInTrees | Self::OnRooftops)
    }

    /// Whether the layer is among the branches.
    pub const fn is_tree_layer(self) -> bool {
        matches!(self, Self::InTrees | Self::HighInTrees)
    }

    /// Whether the layer lies above ground level.
    pub const fn is_elevated(self) -> bool {
        self.height() > 0
    }

    /// Short description used in echoes ("in the trees").
    pub const fn describe(self) -> &'static str {
        match self {
            Self::VeryDeepUnderwater => "in the crushing depths",
            Self::DeepUnderwater => "deep underwater",
            Self::Underwater => "underwater",
            Self::GroundLevel => "at ground level",
            Self::InTrees => "in the trees",
            Self::OnRooftops => "on the rooftops",
            Self::HighInTrees => "high in the trees",
            Self::InAir => "in the air",
            Self::HighInAir => "high in the air",
        }
    }
}

impl core::fmt::Display for RoomLayer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.describe())
    }
}
