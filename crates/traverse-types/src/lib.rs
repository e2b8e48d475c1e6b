//! Shared type definitions for the Traverse rover bot.
//!
//! This crate is the single source of truth for the grid model and the
//! values exchanged with the remote arbiter. Everything here is plain data:
//! no I/O, no locking, no async.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for teams
//! - [`grid`] -- Locations, terrain cells, packed cell keys, low-resolution tiles
//! - [`enums`] -- Orientations, drive directions, heuristics, session states
//! - [`grants`] -- Values returned by the arbiter for joins and moves

pub mod enums;
pub mod grants;
pub mod grid;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Direction, GameStatus, Heuristic, MissionState, Orientation, ScoutStrategy, UnknownVariant,
};
pub use grants::{AerialMove, GroundMove, JoinGrant};
pub use grid::{Board, Cell, Location, LowResTile, pack_key};
pub use ids::TeamId;
