//! Rooms, terrain layers and exits for the Somatic physical-state engine.
//!
//! This crate models the physical world a character moves through: rooms
//! as nodes of a directed graph, each with a terrain that decides which
//! vertical layers exist, and exits that carry size limits and crossing
//! flags (fly-only, swim-only, climbable, fall).
//!
//! # Modules
//!
//! - [`error`] -- Error types for world-graph operations.
//! - [`terrain`] -- [`Terrain`] layer queries, buoyancy and stock terrains.
//! - [`room`] -- [`Room`] with per-layer occupancy and items.
//! - [`exit`] -- [`Exit`] flags and transition classification.
//! - [`item`] -- [`Item`] positioning rules.
//! - [`world_map`] -- The world graph with adjacency and relocation.
//! - [`starting_world`] -- Seven-room demo world.

pub mod error;
pub mod exit;
pub mod item;
pub mod room;
pub mod starting_world;
pub mod terrain;
pub mod world_map;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use exit::Exit;
pub use item::Item;
pub use room::Room;
pub use starting_world::{StartingRoomIds, create_starting_world};
pub use terrain::Terrain;
pub use world_map::WorldMap;
