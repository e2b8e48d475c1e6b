//! Windowed A* over the terrain knowledge base.
//!
//! A search never looks at the whole map. [`Submap::extract`] copies the
//! discovered cells inside the bounding box of start and goal, expanded by
//! `buffer` on every side, and the search runs on that copy only. This keeps
//! the cost of a call bounded as the knowledge base grows; the price is that
//! a path is only optimal within its window.
//!
//! # Search rules
//!
//! - 4-directional expansion, N/S/E/W in that order.
//! - Entering a cell costs its difficulty. The start cell is free.
//! - With a non-zero `straight_penalty`, every step whose heading differs
//!   from the previous step's heading costs that much extra.
//! - A coordinate is closed the first time it is popped and never reopened.
//!   With an inconsistent heuristic (e.g. Manhattan over zero-cost cells)
//!   the result may be suboptimal but is still a valid path.
//! - Ties on `cost + heuristic` pop in insertion order, so identical inputs
//!   always produce identical paths.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;
use traverse_types::{Heuristic, Location, Orientation};

use crate::knowledge::{KnowledgeBase, window_bounds};

/// Default window padding around the start/goal bounding box.
pub const DEFAULT_BUFFER: u32 = 20;

/// A found path: every cell from start to goal inclusive, and its cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlan {
    /// Cells from start to goal, both included.
    pub path: Vec<Location>,
    /// Sum of entered-cell difficulties plus any direction-change penalties.
    pub cost: u32,
}

impl PathPlan {
    /// Number of moves (cells entered) along the path.
    pub const fn steps(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Parameters of one pathfinding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    /// Where the search starts.
    pub start: Location,
    /// Where the search ends.
    pub goal: Location,
    /// Distance estimate used to order the frontier.
    pub heuristic: Heuristic,
    /// Window padding around the start/goal bounding box.
    pub buffer: u32,
    /// Extra cost per change of heading (0 disables it).
    pub straight_penalty: u32,
}

impl PathQuery {
    /// A query with the default heuristic, buffer, and no straight penalty.
    pub const fn new(start: Location, goal: Location) -> Self {
        Self {
            start,
            goal,
            heuristic: Heuristic::Manhattan,
            buffer: DEFAULT_BUFFER,
            straight_penalty: 0,
        }
    }

    /// Use `heuristic` to order the frontier.
    #[must_use]
    pub const fn heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Pad the search window by `buffer` cells.
    #[must_use]
    pub const fn buffer(mut self, buffer: u32) -> Self {
        self.buffer = buffer;
        self
    }

    /// Charge `penalty` per change of heading.
    #[must_use]
    pub const fn straight_penalty(mut self, penalty: u32) -> Self {
        self.straight_penalty = penalty;
        self
    }
}

// ---------------------------------------------------------------------------
// Submap
// ---------------------------------------------------------------------------

/// The bounded slice of the knowledge base one search runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submap {
    cells: HashMap<Location, u32>,
}

impl Submap {
    /// Copy the known cells within `buffer` of the start/goal bounding box.
    pub fn extract(kb: &KnowledgeBase, start: Location, goal: Location, buffer: u32) -> Self {
        let (min, max) = window_bounds(start, goal, buffer);
        Self {
            cells: kb.window(min, max),
        }
    }

    /// Build a submap directly from known difficulties.
    pub const fn from_cells(cells: HashMap<Location, u32>) -> Self {
        Self { cells }
    }

    /// Difficulty of `location`, if it is inside the window and known.
    pub fn difficulty(&self, location: Location) -> Option<u32> {
        self.cells.get(&location).copied()
    }

    /// Whether `location` is inside the window and known.
    pub fn contains(&self, location: Location) -> bool {
        self.cells.contains_key(&location)
    }

    /// Number of cells in the window.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the window holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over the cells of the window.
    pub fn iter(&self) -> impl Iterator<Item = (Location, u32)> + '_ {
        self.cells.iter().map(|(loc, d)| (*loc, *d))
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// A frontier entry. Ordered so the max-heap pops the lowest priority first,
/// then the earliest insertion.
#[derive(Debug, PartialEq, Eq)]
struct Frontier {
    priority: u32,
    seq: u64,
    cost: u32,
    at: Location,
    /// The cell we came from and the heading used to enter `at`.
    entered_from: Option<(Location, Orientation)>,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path through the knowledge base.
///
/// Returns `None` if start or goal is unknown, or if no path exists inside
/// the window.
pub fn find_path(kb: &KnowledgeBase, query: &PathQuery) -> Option<PathPlan> {
    if !kb.contains(query.start) || !kb.contains(query.goal) {
        debug!(start = %query.start, goal = %query.goal, "endpoint not yet discovered");
        return None;
    }
    let submap = Submap::extract(kb, query.start, query.goal, query.buffer);
    let plan = search(&submap, query);
    if plan.is_none() {
        debug!(
            start = %query.start,
            goal = %query.goal,
            buffer = query.buffer,
            window_cells = submap.len(),
            "no path inside window"
        );
    }
    plan
}

/// Like [`find_path`], but doubles the buffer after each miss until
/// `max_buffer` has been tried.
pub fn find_path_widening(
    kb: &KnowledgeBase,
    query: &PathQuery,
    max_buffer: u32,
) -> Option<PathPlan> {
    let mut attempt = *query;
    loop {
        if let Some(plan) = find_path(kb, &attempt) {
            return Some(plan);
        }
        if attempt.buffer >= max_buffer {
            return None;
        }
        attempt.buffer = attempt.buffer.saturating_mul(2).max(1).min(max_buffer);
    }
}

/// Run A* on an already extracted submap.
pub fn search(submap: &Submap, query: &PathQuery) -> Option<PathPlan> {
    let (start, goal) = (query.start, query.goal);
    if !submap.contains(start) || !submap.contains(goal) {
        return None;
    }

    let mut heap = BinaryHeap::new();
    let mut seq: u64 = 0;
    // Closed set: location -> predecessor.
    let mut closed: HashMap<Location, Option<Location>> = HashMap::new();

    heap.push(Frontier {
        priority: query.heuristic.estimate(start, goal),
        seq,
        cost: 0,
        at: start,
        entered_from: None,
    });

    while let Some(node) = heap.pop() {
        if closed.contains_key(&node.at) {
            continue;
        }
        closed.insert(node.at, node.entered_from.map(|(prev, _)| prev));

        if node.at == goal {
            return Some(PathPlan {
                path: reconstruct(&closed, goal),
                cost: node.cost,
            });
        }

        let previous_heading = node.entered_from.map(|(_, heading)| heading);
        for (heading, next) in node.at.orthogonal_neighbors() {
            if closed.contains_key(&next) {
                continue;
            }
            let Some(difficulty) = submap.difficulty(next) else {
                continue;
            };
            let turn_cost = match previous_heading {
                Some(prev) if prev != heading => query.straight_penalty,
                _ => 0,
            };
            let cost = node
                .cost
                .saturating_add(difficulty)
                .saturating_add(turn_cost);
            seq = seq.saturating_add(1);
            heap.push(Frontier {
                priority: cost.saturating_add(query.heuristic.estimate(next, goal)),
                seq,
                cost,
                at: next,
                entered_from: Some((node.at, heading)),
            });
        }
    }

    None
}

/// Walk predecessors back from `goal` to the start.
fn reconstruct(closed: &HashMap<Location, Option<Location>>, goal: Location) -> Vec<Location> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(Some(prev)) = closed.get(&current) {
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}
