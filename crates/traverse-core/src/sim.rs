//! An in-process arbiter over a fully known terrain grid.
//!
//! [`SimArbiter`] implements the same rules the bot relies on from the
//! real server, closely enough to drive whole missions in tests and in the
//! runner's offline mode:
//!
//! - joins hand out a token, the start location, the low-resolution
//!   tiles, and the targets;
//! - a rover move into a cell costs that cell's difficulty in battery, a
//!   turn costs 1, and a move the battery cannot pay for leaves the rover
//!   where it is;
//! - every move reveals the cells within `visibility` (Chebyshev) of the
//!   vehicle's new position;
//! - optional fault injection: a rate limit on every n-th call, and a
//!   maximum scout hop answered with "cannot fly that far".

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use traverse_types::{
    AerialMove, Cell, Direction, GameStatus, GroundMove, JoinGrant, Location, LowResTile,
    Orientation,
};

use crate::arbiter::{Arbiter, ArbiterError};

/// Message returned for a flight longer than the configured limit.
pub const TOO_FAR_MESSAGE: &str = "cannot fly that far";

/// A rectangular terrain grid, origin at `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimGrid {
    width: u32,
    height: u32,
    /// Row-major difficulties, row `y` at `y * width`.
    difficulties: Vec<u32>,
}

impl SimGrid {
    /// A grid where every cell has the same difficulty.
    pub fn uniform(width: u32, height: u32, difficulty: u32) -> Self {
        Self::from_fn(width, height, |_| difficulty)
    }

    /// A grid whose difficulties come from `f(location)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(Location) -> u32) -> Self {
        let mut difficulties = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let location = Location::new(
                    i32::try_from(x).unwrap_or(i32::MAX),
                    i32::try_from(y).unwrap_or(i32::MAX),
                );
                difficulties.push(f(location));
            }
        }
        Self {
            width,
            height,
            difficulties,
        }
    }

    /// A reproducible random grid with difficulties in `1..=max_difficulty`.
    pub fn random(width: u32, height: u32, max_difficulty: u32, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let top = max_difficulty.max(1);
        Self::from_fn(width, height, |_| rng.random_range(1..=top))
    }

    /// Number of columns.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Difficulty at `location`, or `None` off the board.
    pub fn difficulty(&self, location: Location) -> Option<u32> {
        let x = u32::try_from(location.x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(location.y).ok().filter(|y| *y < self.height)?;
        let index = usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()?;
        self.difficulties.get(index).copied()
    }

    /// Every cell of the grid.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.difficulties.len());
        for y in 0..self.height {
            for x in 0..self.width {
                let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                    continue;
                };
                if let Some(d) = self.difficulty(Location::new(x, y)) {
                    cells.push(Cell::new(x, y, d));
                }
            }
        }
        cells
    }

    /// Split the grid into `tile_size` squares with their mean difficulty.
    pub fn low_res_tiles(&self, tile_size: u32) -> Vec<LowResTile> {
        let size = tile_size.max(1);
        let mut tiles = Vec::new();
        let mut y0 = 0_u32;
        while y0 < self.height {
            let y1 = y0.saturating_add(size).min(self.height).saturating_sub(1);
            let mut x0 = 0_u32;
            while x0 < self.width {
                let x1 = x0.saturating_add(size).min(self.width).saturating_sub(1);
                if let Some(tile) = self.tile(x0, y0, x1, y1) {
                    tiles.push(tile);
                }
                x0 = x0.saturating_add(size);
            }
            y0 = y0.saturating_add(size);
        }
        tiles
    }

    fn tile(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Option<LowResTile> {
        let mut tile = LowResTile {
            lower_left_x: i32::try_from(x0).ok()?,
            lower_left_y: i32::try_from(y0).ok()?,
            upper_right_x: i32::try_from(x1).ok()?,
            upper_right_y: i32::try_from(y1).ok()?,
            average_difficulty: 0,
        };
        let (sum, count) = tile
            .locations()
            .filter_map(|loc| self.difficulty(loc))
            .fold((0_u64, 0_u64), |(s, c), d| {
                (s.saturating_add(u64::from(d)), c.saturating_add(1))
            });
        tile.average_difficulty = u32::try_from(sum.checked_div(count).unwrap_or(0)).ok()?;
        Some(tile)
    }

    /// Cells within `radius` (Chebyshev) of `center`.
    fn reveal(&self, center: Location, radius: u32) -> Vec<Cell> {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let mut cells = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let Some(loc) = center.offset(dx, dy) else {
                    continue;
                };
                if let Some(d) = self.difficulty(loc) {
                    cells.push(Cell::new(loc.x, loc.y, d));
                }
            }
        }
        cells
    }
}

/// Knobs for a simulated game.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Where every team starts.
    pub start: Location,
    /// Initial rover heading.
    pub orientation: Orientation,
    /// Initial rover battery.
    pub battery: u32,
    /// Targets in the order the arbiter lists them.
    pub targets: Vec<Location>,
    /// Side length of the low-resolution tiles.
    pub tile_size: u32,
    /// Reveal radius around a vehicle after each move.
    pub visibility: u32,
    /// Longest allowed scout hop (Euclidean); `None` for no limit.
    pub max_flight: Option<u32>,
    /// Answer every n-th call with a rate limit.
    pub rate_limit_every: Option<u64>,
    /// Status polls per token answered with `Joining` before `Playing`.
    pub polls_until_playing: u32,
    /// Simulated round-trip time per call.
    pub latency: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: Location::new(0, 0),
            orientation: Orientation::North,
            battery: 10_000,
            targets: Vec::new(),
            tile_size: 5,
            visibility: 2,
            max_flight: None,
            rate_limit_every: None,
            polls_until_playing: 0,
            latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct SimTeam {
    rover: Location,
    orientation: Orientation,
    battery: u32,
    scout: Location,
    polls: u32,
}

#[derive(Debug, Default)]
struct SimState {
    teams: HashMap<String, SimTeam>,
    names: Vec<String>,
    calls: u64,
    ground_moves: u64,
    aerial_moves: u64,
    rate_limited: u64,
}

/// Counters of what the bot asked the simulated arbiter to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Every call, including rate-limited ones.
    pub calls: u64,
    /// Accepted rover commands.
    pub ground_moves: u64,
    /// Accepted scout flights.
    pub aerial_moves: u64,
    /// Calls answered with a rate limit.
    pub rate_limited: u64,
}

/// The simulated game server.
#[derive(Debug)]
pub struct SimArbiter {
    grid: SimGrid,
    tiles: Vec<LowResTile>,
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimArbiter {
    /// A game on `grid` with the given rules.
    pub fn new(grid: SimGrid, config: SimConfig) -> Self {
        let tiles = grid.low_res_tiles(config.tile_size);
        Self {
            grid,
            tiles,
            config,
            state: Mutex::new(SimState::default()),
        }
    }

    /// The terrain grid.
    pub const fn grid(&self) -> &SimGrid {
        &self.grid
    }

    /// The low-resolution tiles handed out on join.
    pub fn tiles(&self) -> &[LowResTile] {
        &self.tiles
    }

    /// Call counters so far.
    pub fn stats(&self) -> SimStats {
        let state = self.state.lock();
        SimStats {
            calls: state.calls,
            ground_moves: state.ground_moves,
            aerial_moves: state.aerial_moves,
            rate_limited: state.rate_limited,
        }
    }

    /// Current rover location and battery for `token`.
    pub fn rover(&self, token: &str) -> Option<(Location, Orientation, u32)> {
        let state = self.state.lock();
        state
            .teams
            .get(token)
            .map(|t| (t.rover, t.orientation, t.battery))
    }

    /// Current scout location for `token`.
    pub fn scout(&self, token: &str) -> Option<Location> {
        self.state.lock().teams.get(token).map(|t| t.scout)
    }

    /// Names of every team that joined, in join order.
    pub fn team_names(&self) -> Vec<String> {
        self.state.lock().names.clone()
    }

    async fn round_trip(&self) -> Result<(), ArbiterError> {
        if self.config.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.latency).await;
        }
        let mut state = self.state.lock();
        state.calls = state.calls.saturating_add(1);
        let limited = self
            .config
            .rate_limit_every
            .filter(|n| *n > 0)
            .is_some_and(|n| state.calls % n == 0);
        if limited {
            state.rate_limited = state.rate_limited.saturating_add(1);
            return Err(ArbiterError::RateLimited);
        }
        Ok(())
    }

    fn ground(&self, token: &str, direction: Direction) -> Result<GroundMove, ArbiterError> {
        let mut state = self.state.lock();
        let Some(team) = state.teams.get_mut(token) else {
            return Err(unknown_token());
        };
        let mut message = String::new();
        match direction {
            Direction::Left | Direction::Right => {
                if team.battery >= 1 {
                    team.battery = team.battery.saturating_sub(1);
                    team.orientation = if direction == Direction::Left {
                        team.orientation.turned_left()
                    } else {
                        team.orientation.turned_right()
                    };
                } else {
                    message.push_str("Insufficient battery");
                }
            }
            Direction::Forward | Direction::Reverse => {
                let heading = if direction == Direction::Forward {
                    team.orientation
                } else {
                    team.orientation.turned_right().turned_right()
                };
                let target = team
                    .rover
                    .step(heading)
                    .ok_or_else(|| rejected("coordinate overflow"))?;
                let Some(cost) = self.grid.difficulty(target) else {
                    return Err(rejected("cannot move off the board"));
                };
                if team.battery >= cost {
                    team.battery = team.battery.saturating_sub(cost);
                    team.rover = target;
                } else {
                    message.push_str("Insufficient battery");
                }
            }
        }
        let reply = GroundMove {
            location: team.rover,
            orientation: team.orientation,
            battery: team.battery,
            terrain: self.grid.reveal(team.rover, self.config.visibility),
            message,
        };
        state.ground_moves = state.ground_moves.saturating_add(1);
        Ok(reply)
    }

    fn aerial(&self, token: &str, destination: Location) -> Result<AerialMove, ArbiterError> {
        let mut state = self.state.lock();
        let Some(team) = state.teams.get_mut(token) else {
            return Err(unknown_token());
        };
        if self.grid.difficulty(destination).is_none() {
            return Err(rejected("cannot fly off the board"));
        }
        if let Some(limit) = self.config.max_flight {
            if team.scout.euclidean_distance(destination) > f64::from(limit) {
                return Err(ArbiterError::TooFar {
                    message: TOO_FAR_MESSAGE.to_owned(),
                });
            }
        }
        team.scout = destination;
        let reply = AerialMove {
            location: destination,
            battery: team.battery,
            terrain: self.grid.reveal(destination, self.config.visibility),
            message: String::new(),
        };
        state.aerial_moves = state.aerial_moves.saturating_add(1);
        Ok(reply)
    }
}

impl Arbiter for SimArbiter {
    async fn join_game(&self, game_id: &str, name: &str) -> Result<JoinGrant, ArbiterError> {
        self.round_trip().await?;
        let mut state = self.state.lock();
        if state.names.iter().any(|n| n == name) {
            return Err(rejected("name already taken"));
        }
        let token = format!("sim-{}", state.names.len().saturating_add(1));
        state.names.push(name.to_owned());
        state.teams.insert(
            token.clone(),
            SimTeam {
                rover: self.config.start,
                orientation: self.config.orientation,
                battery: self.config.battery,
                scout: self.config.start,
                polls: 0,
            },
        );
        debug!(game_id, name, token = %token, "simulated join");
        Ok(JoinGrant {
            token,
            start: self.config.start,
            orientation: self.config.orientation,
            battery: self.config.battery,
            terrain: self.grid.reveal(self.config.start, self.config.visibility),
            tiles: self.tiles.clone(),
            targets: self.config.targets.clone(),
        })
    }

    async fn move_ground(
        &self,
        token: &str,
        direction: Direction,
    ) -> Result<GroundMove, ArbiterError> {
        self.round_trip().await?;
        self.ground(token, direction)
    }

    async fn move_aerial(
        &self,
        token: &str,
        destination: Location,
    ) -> Result<AerialMove, ArbiterError> {
        self.round_trip().await?;
        self.aerial(token, destination)
    }

    async fn status(&self, token: &str) -> Result<GameStatus, ArbiterError> {
        self.round_trip().await?;
        let mut state = self.state.lock();
        let Some(team) = state.teams.get_mut(token) else {
            return Ok(GameStatus::Invalid);
        };
        if team.polls < self.config.polls_until_playing {
            team.polls = team.polls.saturating_add(1);
            return Ok(GameStatus::Joining);
        }
        Ok(GameStatus::Playing)
    }
}

fn rejected(message: &str) -> ArbiterError {
    ArbiterError::Rejected {
        message: message.to_owned(),
    }
}

fn unknown_token() -> ArbiterError {
    rejected("unrecognized token")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sim(config: SimConfig) -> SimArbiter {
        SimArbiter::new(SimGrid::uniform(10, 10, 1), config)
    }

    #[test]
    fn tiles_cover_the_grid_with_averages() {
        let grid = SimGrid::from_fn(4, 3, |loc| if loc.x < 2 { 2 } else { 6 });
        let tiles = grid.low_res_tiles(2);
        assert_eq!(tiles.len(), 4);
        let covered: usize = tiles.iter().map(|t| t.locations().count()).sum();
        assert_eq!(covered, 12);
        assert_eq!(tiles.first().map(|t| t.average_difficulty), Some(2));
        assert_eq!(tiles.get(1).map(|t| t.average_difficulty), Some(6));
    }

    #[tokio::test]
    async fn join_reveals_start_and_rejects_duplicate_names() {
        let arbiter = sim(SimConfig::default());
        let grant = arbiter.join_game("g", "alpha").await.unwrap();
        assert_eq!(grant.start, Location::new(0, 0));
        // Radius 2 around a corner: 3 x 3 cells.
        assert_eq!(grant.terrain.len(), 9);
        assert!(matches!(
            arbiter.join_game("g", "alpha").await,
            Err(ArbiterError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn rover_pays_difficulty_and_turns() {
        let arbiter = SimArbiter::new(
            SimGrid::from_fn(5, 5, |loc| if loc.y == 1 { 4 } else { 1 }),
            SimConfig {
                battery: 6,
                ..SimConfig::default()
            },
        );
        let token = arbiter.join_game("g", "a").await.unwrap().token;
        let moved = arbiter.move_ground(&token, Direction::Forward).await.unwrap();
        assert_eq!(moved.location, Location::new(0, 1));
        assert_eq!(moved.battery, 2);
        let turned = arbiter.move_ground(&token, Direction::Right).await.unwrap();
        assert_eq!(turned.orientation, Orientation::East);
        assert_eq!(turned.battery, 1);
        // Entering (1, 1) costs 4; not enough battery, so the rover stays.
        let stuck = arbiter.move_ground(&token, Direction::Forward).await.unwrap();
        assert_eq!(stuck.location, Location::new(0, 1));
        assert!(!stuck.message.is_empty());
    }

    #[tokio::test]
    async fn rover_cannot_leave_the_board() {
        let arbiter = sim(SimConfig::default());
        let token = arbiter.join_game("g", "a").await.unwrap().token;
        assert!(matches!(
            arbiter.move_ground(&token, Direction::Reverse).await,
            Err(ArbiterError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn long_flights_are_too_far() {
        let arbiter = sim(SimConfig {
            max_flight: Some(3),
            ..SimConfig::default()
        });
        let token = arbiter.join_game("g", "a").await.unwrap().token;
        assert!(matches!(
            arbiter.move_aerial(&token, Location::new(8, 8)).await,
            Err(ArbiterError::TooFar { .. })
        ));
        let hop = arbiter.move_aerial(&token, Location::new(2, 2)).await.unwrap();
        assert_eq!(hop.location, Location::new(2, 2));
        assert_eq!(arbiter.scout(&token), Some(Location::new(2, 2)));
    }

    #[tokio::test]
    async fn status_waits_then_plays() {
        let arbiter = sim(SimConfig {
            polls_until_playing: 2,
            ..SimConfig::default()
        });
        let token = arbiter.join_game("g", "a").await.unwrap().token;
        assert_eq!(arbiter.status(&token).await, Ok(GameStatus::Joining));
        assert_eq!(arbiter.status(&token).await, Ok(GameStatus::Joining));
        assert_eq!(arbiter.status(&token).await, Ok(GameStatus::Playing));
        assert_eq!(arbiter.status("nope").await, Ok(GameStatus::Invalid));
    }

    #[tokio::test]
    async fn every_nth_call_is_rate_limited() {
        let arbiter = sim(SimConfig {
            rate_limit_every: Some(2),
            ..SimConfig::default()
        });
        let token = arbiter.join_game("g", "a").await.unwrap().token;
        assert_eq!(
            arbiter.status(&token).await,
            Err(ArbiterError::RateLimited)
        );
        assert_eq!(arbiter.status(&token).await, Ok(GameStatus::Playing));
        assert_eq!(arbiter.stats().rate_limited, 1);
    }
}
