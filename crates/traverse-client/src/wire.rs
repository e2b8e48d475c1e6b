//! JSON shapes of the game server's responses.
//!
//! Field names follow the server (`camelCase`, with capitalised `X`/`Y` on
//! some endpoints). Conversions into the shared grant types live here so
//! the rest of the bot never sees wire names.

use serde::Deserialize;
use traverse_types::{AerialMove, Cell, GameStatus, GroundMove, JoinGrant, Location, LowResTile};

use crate::error::ClientError;

/// A revealed terrain cell.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NeighborDto {
    /// Column.
    #[serde(alias = "X")]
    pub x: i32,
    /// Row.
    #[serde(alias = "Y")]
    pub y: i32,
    /// Cost of entering the cell.
    #[serde(alias = "Difficulty")]
    pub difficulty: u32,
}

impl From<NeighborDto> for Cell {
    fn from(dto: NeighborDto) -> Self {
        Self::new(dto.x, dto.y, dto.difficulty)
    }
}

/// A target location.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationDto {
    /// Column.
    #[serde(alias = "X")]
    pub x: i32,
    /// Row.
    #[serde(alias = "Y")]
    pub y: i32,
}

/// One low-resolution tile.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowResolutionDto {
    /// Western edge (inclusive).
    pub lower_left_x: i32,
    /// Southern edge (inclusive).
    pub lower_left_y: i32,
    /// Eastern edge (inclusive).
    pub upper_right_x: i32,
    /// Northern edge (inclusive).
    pub upper_right_y: i32,
    /// Mean difficulty of the tile.
    pub average_difficulty: u32,
}

impl From<LowResolutionDto> for LowResTile {
    fn from(dto: LowResolutionDto) -> Self {
        Self {
            lower_left_x: dto.lower_left_x,
            lower_left_y: dto.lower_left_y,
            upper_right_x: dto.upper_right_x,
            upper_right_y: dto.upper_right_y,
            average_difficulty: dto.average_difficulty,
        }
    }
}

/// Body of `/Game/Join`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// Session token.
    pub token: String,
    /// Start column.
    pub starting_x: i32,
    /// Start row.
    pub starting_y: i32,
    /// Initial rover heading.
    pub orientation: String,
    /// Initial battery, when the server reports it.
    #[serde(default)]
    pub battery_level: Option<u32>,
    /// Cells visible from the start.
    #[serde(default)]
    pub neighbors: Vec<NeighborDto>,
    /// Coarse map of the whole board.
    #[serde(default)]
    pub low_resolution_map: Vec<LowResolutionDto>,
    /// Targets to visit.
    #[serde(default)]
    pub targets: Vec<LocationDto>,
}

impl JoinResponse {
    /// Convert into a [`JoinGrant`].
    pub fn into_grant(self) -> Result<JoinGrant, ClientError> {
        Ok(JoinGrant {
            token: self.token,
            start: Location::new(self.starting_x, self.starting_y),
            orientation: self.orientation.parse()?,
            battery: self.battery_level.unwrap_or(0),
            terrain: self.neighbors.into_iter().map(Cell::from).collect(),
            tiles: self
                .low_resolution_map
                .into_iter()
                .map(LowResTile::from)
                .collect(),
            targets: self
                .targets
                .into_iter()
                .map(|t| Location::new(t.x, t.y))
                .collect(),
        })
    }
}

/// Body of both move endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    /// New column.
    #[serde(alias = "X")]
    pub x: i32,
    /// New row.
    #[serde(alias = "Y")]
    pub y: i32,
    /// Remaining battery.
    pub battery_level: u32,
    /// Newly visible cells.
    #[serde(default)]
    pub neighbors: Vec<NeighborDto>,
    /// Free-form note from the server.
    #[serde(default)]
    pub message: Option<String>,
    /// Rover heading (absent for the scout).
    #[serde(default)]
    pub orientation: Option<String>,
}

impl MoveResponse {
    fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }

    /// Convert a rover move; the heading is required.
    pub fn into_ground(self) -> Result<GroundMove, ClientError> {
        let orientation = self.orientation.as_deref().unwrap_or_default().parse()?;
        Ok(GroundMove {
            location: self.location(),
            orientation,
            battery: self.battery_level,
            terrain: self.neighbors.into_iter().map(Cell::from).collect(),
            message: self.message.unwrap_or_default(),
        })
    }

    /// Convert a scout move.
    pub fn into_aerial(self) -> AerialMove {
        AerialMove {
            location: self.location(),
            battery: self.battery_level,
            terrain: self.neighbors.into_iter().map(Cell::from).collect(),
            message: self.message.unwrap_or_default(),
        }
    }
}

/// RFC 7807 problem detail returned with error statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemDetail {
    /// Short summary.
    #[serde(default)]
    pub title: Option<String>,
    /// Explanation specific to this request.
    #[serde(default)]
    pub detail: Option<String>,
}

impl ProblemDetail {
    /// The most specific text available, or the raw body.
    pub fn describe(body: &str) -> String {
        let problem: Self = serde_json::from_str(body).unwrap_or_default();
        problem
            .detail
            .or(problem.title)
            .unwrap_or_else(|| body.trim().to_owned())
    }
}

/// Read the status endpoint's body, which names the state in plain text.
pub fn parse_status(body: &str) -> GameStatus {
    if body.contains("Playing") {
        GameStatus::Playing
    } else if body.contains("Joining") {
        GameStatus::Joining
    } else {
        GameStatus::Invalid
    }
}
