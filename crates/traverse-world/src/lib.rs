//! Terrain knowledge and planning for the Traverse rover bot.
//!
//! Everything in this crate is synchronous and free of I/O except the
//! terrain cache. The vehicles and the orchestrator in `traverse-core` call
//! into it from their async loops.
//!
//! # Modules
//!
//! - [`error`] -- Error types for cache operations.
//! - [`knowledge`] -- [`KnowledgeBase`], the shared append-only terrain map.
//! - [`line`] -- Straight-line waypoint sampling for scout flights.
//! - [`pathfinder`] -- Windowed A* over the knowledge base.
//! - [`route_planner`] -- Target ordering (exhaustive TSP with a heuristic
//!   fallback for large target sets).
//! - [`terrain_cache`] -- CSV snapshots of discovered terrain keyed by the
//!   board's low-resolution summary.

pub mod error;
pub mod knowledge;
pub mod line;
pub mod pathfinder;
pub mod route_planner;
pub mod terrain_cache;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use knowledge::KnowledgeBase;
pub use pathfinder::{PathPlan, PathQuery, Submap, find_path, find_path_widening};
pub use route_planner::{PlannedRoute, best_route, plan_route, shortest_route};
