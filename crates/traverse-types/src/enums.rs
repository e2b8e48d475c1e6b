//! Enumeration types for vehicles, search heuristics, and session states.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grid::Location;

/// Error returned when a configuration string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// What was being parsed (e.g. `heuristic`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Compass heading of the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Facing `+y`.
    North,
    /// Facing `+x`.
    East,
    /// Facing `-y`.
    South,
    /// Facing `-x`.
    West,
}

impl Orientation {
    /// Unit step `(dx, dy)` for moving forward along this heading.
    pub const fn unit_vector(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Heading after a quarter turn clockwise.
    pub const fn turned_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Heading after a quarter turn counter-clockwise.
    pub const fn turned_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
        }
    }

    /// Whether the heading moves along the `y` axis.
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::North | Self::South)
    }

    /// The heading of a single orthogonal step from `from` to `to`, if the
    /// two locations are adjacent.
    pub fn between(from: Location, to: Location) -> Option<Self> {
        match (to.x.checked_sub(from.x)?, to.y.checked_sub(from.y)?) {
            (0, 1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, -1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }
}

impl FromStr for Orientation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Self::North),
            "east" | "e" => Ok(Self::East),
            "south" | "s" => Ok(Self::South),
            "west" | "w" => Ok(Self::West),
            _ => Err(UnknownVariant {
                kind: "orientation",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A single ground-move command for the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// One cell along the current heading.
    Forward,
    /// One cell against the current heading.
    Reverse,
    /// Quarter turn counter-clockwise in place.
    Left,
    /// Quarter turn clockwise in place.
    Right,
}

impl Direction {
    /// Wire name of the command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "Forward",
            Self::Reverse => "Reverse",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }

    /// Whether the command rotates the rover instead of moving it.
    pub const fn is_turn(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Heuristic
// ---------------------------------------------------------------------------

/// A* distance estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// Sum of axis distances. Admissible for 4-directional ground movement
    /// when every cell costs at least 1.
    #[default]
    Manhattan,
    /// Straight-line distance, rounded down.
    Euclidean,
}

impl Heuristic {
    /// Estimated cost from `from` to `to`.
    pub fn estimate(self, from: Location, to: Location) -> u32 {
        match self {
            Self::Manhattan => from.manhattan_distance(to),
            Self::Euclidean => {
                let d = from.euclidean_distance(to).floor();
                // Bounded by the Manhattan distance, which fits in u32.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    d as u32
                }
            }
        }
    }
}

impl FromStr for Heuristic {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manhattan" => Ok(Self::Manhattan),
            "euclidean" => Ok(Self::Euclidean),
            _ => Err(UnknownVariant {
                kind: "heuristic",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Scouting strategy
// ---------------------------------------------------------------------------

/// How scouts are used during a mission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoutStrategy {
    /// Each team's scout flies ahead of its own rover while the rover drives.
    #[default]
    Escort,
    /// Scouts sweep every low-resolution tile before any rover departs.
    FullRecon,
    /// No scouting; rovers plan over the low-resolution estimate only.
    None,
}

impl FromStr for ScoutStrategy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "escort" => Ok(Self::Escort),
            "full_recon" | "recon" => Ok(Self::FullRecon),
            "none" | "quick" => Ok(Self::None),
            _ => Err(UnknownVariant {
                kind: "scout strategy",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Session states
// ---------------------------------------------------------------------------

/// Game status as reported by the arbiter's status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Players are still joining; moves are not accepted yet.
    Joining,
    /// The game is running.
    Playing,
    /// Unknown token or finished game.
    Invalid,
}

/// Lifecycle of one mission (one game session driven by this bot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionState {
    /// Teams are joining and the game has not started.
    Joining,
    /// Rovers are driving.
    Playing,
    /// At least one rover visited every target.
    Won,
    /// The game never started, became invalid, or every rover failed.
    Abandoned,
    /// No rover won and at least one ran out of path-finding attempts.
    Stalled,
}

impl MissionState {
    /// Whether the state is final.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Abandoned | Self::Stalled)
    }
}
