//! Grid model: locations, terrain cells, and low-resolution tiles.
//!
//! Coordinates are plain `i32` pairs. `+y` is North and `+x` is East; the
//! arbiter reports locations in the same frame so no conversion happens
//! anywhere in the bot.
//!
//! # Cell keys
//!
//! Every [`Cell`] is addressed by a packed `u64` ([`pack_key`]): the bit
//! pattern of `x` in the high 32 bits and the bit pattern of `y` in the low
//! 32 bits. Negative coordinates pack without collisions because the raw
//! two's-complement bits are kept.

use serde::{Deserialize, Serialize};

use crate::enums::Orientation;
use crate::grants::JoinGrant;

/// Pack an `(x, y)` coordinate into a single `u64` key.
pub const fn pack_key(x: i32, y: i32) -> u64 {
    let high = u32::from_ne_bytes(x.to_ne_bytes()) as u64;
    let low = u32::from_ne_bytes(y.to_ne_bytes()) as u64;
    (high << 32) | low
}

/// A point on the game board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Column (grows East).
    pub x: i32,
    /// Row (grows North).
    pub y: i32,
}

impl Location {
    /// Create a location from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Packed key of this location (see [`pack_key`]).
    pub const fn key(self) -> u64 {
        pack_key(self.x, self.y)
    }

    /// Grid distance "as the rover drives".
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    /// Straight-line distance "as the scout flies".
    pub fn euclidean_distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    /// The location offset by `(dx, dy)`, or `None` on coordinate overflow.
    pub const fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }

    /// The adjacent location one step along `heading`.
    pub const fn step(self, heading: Orientation) -> Option<Self> {
        let (dx, dy) = heading.unit_vector();
        self.offset(dx, dy)
    }

    /// The four orthogonal neighbours in N, S, E, W order.
    ///
    /// Neighbours that would overflow the coordinate range are omitted.
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = (Orientation, Self)> {
        [
            Orientation::North,
            Orientation::South,
            Orientation::East,
            Orientation::West,
        ]
        .into_iter()
        .filter_map(move |heading| self.step(heading).map(|next| (heading, next)))
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A discovered terrain cell: location plus the cost to enter it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Battery cost for the rover to enter this cell.
    pub difficulty: u32,
}

impl Cell {
    /// Create a cell.
    pub const fn new(x: i32, y: i32, difficulty: u32) -> Self {
        Self { x, y, difficulty }
    }

    /// Packed key of this cell.
    pub const fn key(&self) -> u64 {
        pack_key(self.x, self.y)
    }

    /// The cell's coordinates.
    pub const fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }
}

/// A coarse terrain summary: an inclusive rectangle with its mean difficulty.
///
/// The arbiter hands these out on join before any real terrain is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowResTile {
    /// Western edge (inclusive).
    pub lower_left_x: i32,
    /// Southern edge (inclusive).
    pub lower_left_y: i32,
    /// Eastern edge (inclusive).
    pub upper_right_x: i32,
    /// Northern edge (inclusive).
    pub upper_right_y: i32,
    /// Mean difficulty of the cells inside the tile.
    pub average_difficulty: u32,
}

impl LowResTile {
    /// Whether `location` lies inside the tile.
    pub const fn contains(&self, location: Location) -> bool {
        location.x >= self.lower_left_x
            && location.x <= self.upper_right_x
            && location.y >= self.lower_left_y
            && location.y <= self.upper_right_y
    }

    /// The (rounded-down) centre of the tile.
    pub const fn center(&self) -> Location {
        Location::new(
            midpoint(self.lower_left_x, self.upper_right_x),
            midpoint(self.lower_left_y, self.upper_right_y),
        )
    }

    /// Every location covered by the tile, row by row.
    pub fn locations(&self) -> impl Iterator<Item = Location> + use<> {
        let (x0, x1) = (self.lower_left_x, self.upper_right_x);
        (self.lower_left_y..=self.upper_right_y)
            .flat_map(move |y| (x0..=x1).map(move |x| Location::new(x, y)))
    }

    /// Every cell of the tile, each carrying the tile's average difficulty.
    pub fn default_cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let difficulty = self.average_difficulty;
        self.locations()
            .map(move |loc| Cell::new(loc.x, loc.y, difficulty))
    }
}

/// Overflow-free floor midpoint of two coordinates.
const fn midpoint(a: i32, b: i32) -> i32 {
    // (a & b) + ((a ^ b) >> 1) never overflows and rounds toward -inf.
    (a & b).wrapping_add((a ^ b) >> 1)
}

/// Board geometry and objectives shared by every team in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Number of columns (`x` ranges over `0..width`).
    pub width: u32,
    /// Number of rows (`y` ranges over `0..height`).
    pub height: u32,
    /// Coarse terrain summary.
    pub tiles: Vec<LowResTile>,
    /// Targets every rover must visit.
    pub targets: Vec<Location>,
}

impl Board {
    /// Derive the board from the first successful join.
    ///
    /// The board extent is the union of the low-resolution tiles; tile
    /// corners are inclusive so the width is one more than the largest
    /// eastern edge.
    pub fn from_grant(grant: &JoinGrant) -> Self {
        let max_x = grant.tiles.iter().map(|t| t.upper_right_x).max().unwrap_or(-1);
        let max_y = grant.tiles.iter().map(|t| t.upper_right_y).max().unwrap_or(-1);
        Self {
            width: extent(max_x),
            height: extent(max_y),
            tiles: grant.tiles.clone(),
            targets: grant.targets.clone(),
        }
    }

    /// The tile covering `location`, if any.
    pub fn tile_at(&self, location: Location) -> Option<&LowResTile> {
        self.tiles.iter().find(|t| t.contains(location))
    }
}

/// Convert the largest inclusive coordinate into a count.
fn extent(max_coordinate: i32) -> u32 {
    u32::try_from(max_coordinate).map_or(0, |m| m.saturating_add(1))
}
