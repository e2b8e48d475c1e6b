//! The shared terrain knowledge base.
//!
//! One [`KnowledgeBase`] exists per game session and is shared (`Arc`) by
//! every scout and rover of every team. It only ever grows: the first value
//! recorded for a cell wins and later reports for the same cell are
//! ignored. Because merges commute, concurrent writers need no ordering.
//!
//! Readers take a single read lock per query, so one pathfinding call sees
//! a consistent point-in-time view (see [`KnowledgeBase::window`]).

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use traverse_types::{Cell, Location, LowResTile, pack_key};

/// Concurrent, append-only map of discovered terrain difficulty.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    /// Cells keyed by [`pack_key`].
    cells: RwLock<HashMap<u64, Cell>>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a knowledge base pre-populated with `cells` (first wins).
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let kb = Self::new();
        {
            let mut guard = kb.cells.write();
            for cell in cells {
                guard.entry(cell.key()).or_insert(cell);
            }
        }
        kb
    }

    /// Create a knowledge base where every cell of every tile carries the
    /// tile's average difficulty.
    ///
    /// Used when scouting is skipped: the rovers plan over the coarse
    /// estimate and, since the seed values win, real discoveries never
    /// replace them.
    pub fn seeded(tiles: &[LowResTile]) -> Self {
        Self::from_cells(tiles.iter().flat_map(LowResTile::default_cells))
    }

    /// Look up the cell at `(x, y)`.
    pub fn try_get(&self, x: i32, y: i32) -> Option<Cell> {
        self.cells.read().get(&pack_key(x, y)).copied()
    }

    /// Look up the cell at `location`.
    pub fn get(&self, location: Location) -> Option<Cell> {
        self.try_get(location.x, location.y)
    }

    /// Whether the cell at `location` has been discovered.
    pub fn contains(&self, location: Location) -> bool {
        self.cells.read().contains_key(&location.key())
    }

    /// Insert every cell not already known. Returns how many were new.
    ///
    /// Already-known cells keep their first recorded difficulty, so merging
    /// the same report twice is a no-op.
    pub fn merge(&self, cells: &[Cell]) -> usize {
        if cells.is_empty() {
            return 0;
        }
        let mut guard = self.cells.write();
        let mut inserted: usize = 0;
        for cell in cells {
            if let Entry::Vacant(slot) = guard.entry(cell.key()) {
                slot.insert(*cell);
                inserted = inserted.saturating_add(1);
            }
        }
        inserted
    }

    /// Number of discovered cells.
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Whether nothing has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Copy every known cell out, sorted by `(y, x)`.
    pub fn snapshot(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.cells.read().values().copied().collect();
        cells.sort_unstable_by_key(|c| (c.y, c.x));
        cells
    }

    /// Difficulties of every known cell inside the inclusive rectangle
    /// `min..=max`, read under one lock.
    ///
    /// Looks up the rectangle cell by cell when it is smaller than the map and
    /// scans the map otherwise, so a huge window over a sparse map stays
    /// cheap.
    pub fn window(&self, min: Location, max: Location) -> HashMap<Location, u32> {
        let guard = self.cells.read();
        let mut out = HashMap::new();
        if min.x > max.x || min.y > max.y {
            return out;
        }
        let width = u64::from(max.x.abs_diff(min.x)).saturating_add(1);
        let height = u64::from(max.y.abs_diff(min.y)).saturating_add(1);
        let area = width.saturating_mul(height);
        let known = u64::try_from(guard.len()).unwrap_or(u64::MAX);

        if area <= known {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    if let Some(cell) = guard.get(&pack_key(x, y)) {
                        out.insert(cell.location(), cell.difficulty);
                    }
                }
            }
        } else {
            for cell in guard.values() {
                if cell.x >= min.x && cell.x <= max.x && cell.y >= min.y && cell.y <= max.y {
                    out.insert(cell.location(), cell.difficulty);
                }
            }
        }
        out
    }

    /// Fraction (`0.0..=1.0`) of the cells within `buffer` of the bounding
    /// box of `from`/`to` that have been discovered.
    ///
    /// Scouts use this to decide whether a corridor still needs flying.
    pub fn coverage(&self, from: Location, to: Location, buffer: u32) -> f64 {
        let (min, max) = window_bounds(from, to, buffer);
        let width = f64::from(max.x) - f64::from(min.x) + 1.0;
        let height = f64::from(max.y) - f64::from(min.y) + 1.0;
        let area = width * height;
        if area <= 0.0 {
            return 1.0;
        }
        let known = self.window(min, max).len();
        let known = u32::try_from(known).map_or(f64::from(u32::MAX), f64::from);
        (known / area).min(1.0)
    }
}

/// Corners of the bounding box of `a`/`b` expanded by `buffer` on every
/// side, clamped to the coordinate range.
pub fn window_bounds(a: Location, b: Location, buffer: u32) -> (Location, Location) {
    let pad = i32::try_from(buffer).unwrap_or(i32::MAX);
    let min = Location::new(
        a.x.min(b.x).saturating_sub(pad),
        a.y.min(b.y).saturating_sub(pad),
    );
    let max = Location::new(
        a.x.max(b.x).saturating_add(pad),
        a.y.max(b.y).saturating_add(pad),
    );
    (min, max)
}
