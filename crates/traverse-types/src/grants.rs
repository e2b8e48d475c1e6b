//! Values the arbiter hands back for joins and moves.
//!
//! These are the decoded, wire-format-independent shapes. The HTTP client
//! maps its JSON payloads onto them; the simulated arbiter builds them
//! directly.

use serde::{Deserialize, Serialize};

use crate::enums::Orientation;
use crate::grid::{Cell, Location, LowResTile};

/// Everything a team learns when it joins a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGrant {
    /// Session token used on every subsequent request for this team.
    pub token: String,
    /// Where both vehicles start.
    pub start: Location,
    /// Initial rover heading.
    pub orientation: Orientation,
    /// Initial rover battery.
    pub battery: u32,
    /// Cells already visible from the start location.
    pub terrain: Vec<Cell>,
    /// Coarse map of the whole board.
    pub tiles: Vec<LowResTile>,
    /// Targets to visit, in the arbiter's order.
    pub targets: Vec<Location>,
}

/// Result of one rover command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundMove {
    /// Rover location after the command.
    pub location: Location,
    /// Rover heading after the command.
    pub orientation: Orientation,
    /// Battery remaining after the command.
    pub battery: u32,
    /// Cells revealed around the new location.
    pub terrain: Vec<Cell>,
    /// Free-form status message from the arbiter.
    pub message: String,
}

/// Result of one scout flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AerialMove {
    /// Scout location after the flight.
    pub location: Location,
    /// Scout battery as reported (informational only).
    pub battery: u32,
    /// Cells revealed around the new location.
    pub terrain: Vec<Cell>,
    /// Free-form status message from the arbiter.
    pub message: String,
}
