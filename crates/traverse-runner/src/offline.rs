//! A reproducible simulated game for running without a server.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use traverse_core::sim::{SimArbiter, SimConfig, SimGrid};
use traverse_types::Location;

/// Side length of the offline board.
const BOARD_SIZE: i32 = 50;

/// Targets placed on the offline board.
const TARGETS: usize = 4;

/// Hardest offline terrain.
const MAX_DIFFICULTY: u32 = 9;

/// Tile size of the offline low-resolution map.
const TILE_SIZE: u32 = 10;

/// A simulated arbiter whose board, start, and targets depend only on
/// `seed`.
pub fn offline_arbiter(seed: u64) -> SimArbiter {
    let size = BOARD_SIZE.unsigned_abs();
    let grid = SimGrid::random(size, size, MAX_DIFFICULTY, seed);
    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let mut random_location =
        || Location::new(rng.random_range(0..BOARD_SIZE), rng.random_range(0..BOARD_SIZE));
    let start = random_location();
    let targets = (0..TARGETS).map(|_| random_location()).collect();
    SimArbiter::new(
        grid,
        SimConfig {
            start,
            targets,
            tile_size: TILE_SIZE,
            ..SimConfig::default()
        },
    )
}
