//! Target ordering: which order should the rovers visit the targets in?
//!
//! Legs are measured in straight-line (Euclidean) distance, untruncated.
//! Up to [`MAX_EXHAUSTIVE_TARGETS`] targets every visiting order is tried;
//! larger sets fall back to nearest-neighbour construction improved by
//! 2-opt.
//!
//! # Enumeration order
//!
//! Orders are enumerated by picking the first element in input order and
//! recursing on the rest, and a candidate replaces the best so far only if
//! it is strictly shorter. Among equally short orders the first one
//! enumerated wins, so the result depends only on the input order.
//!
//! # Edge anchoring
//!
//! [`best_route`] additionally assumes the route starts from the board edge:
//! for every target it takes the nearest boundary point as a candidate
//! starting anchor and keeps the (anchor, order) pair with the shortest
//! total. The anchor is reported separately and is not a target.

use tracing::debug;
use traverse_types::Location;

/// Largest target set solved by exhaustive enumeration.
pub const MAX_EXHAUSTIVE_TARGETS: usize = 9;

/// Upper bound on full 2-opt sweeps for one starting tour.
const MAX_TWO_OPT_PASSES: usize = 64;

/// Improvements smaller than this are rounding noise.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// An ordered set of targets and the length of the route through them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannedRoute {
    /// Boundary point the route starts from, if edge-anchored.
    pub anchor: Option<Location>,
    /// Targets in visiting order.
    pub targets: Vec<Location>,
    /// Total leg length, including the anchor leg if there is one.
    pub distance: f64,
}

/// Total length of the polyline through `points`.
pub fn route_length(points: &[Location]) -> f64 {
    points
        .windows(2)
        .map(|pair| match pair {
            [a, b] => a.euclidean_distance(*b),
            _ => 0.0,
        })
        .sum()
}

/// The shortest visiting order of `targets`, with no starting point.
pub fn shortest_route(targets: &[Location]) -> PlannedRoute {
    if targets.len() <= 1 {
        return PlannedRoute {
            anchor: None,
            targets: targets.to_vec(),
            distance: 0.0,
        };
    }
    let legs = Legs::new(targets, &[]);
    let order = if targets.len() <= MAX_EXHAUSTIVE_TARGETS {
        Exhaustive::solve(&legs, None)
    } else {
        heuristic_order(&legs, None)
    };
    order.into_route(targets, None)
}

/// The shortest visiting order of `targets` starting from the nearest board
/// edge, on a `width` x `height` board.
///
/// Falls back to [`shortest_route`] when the board has no cells.
pub fn best_route(targets: &[Location], width: u32, height: u32) -> PlannedRoute {
    if targets.is_empty() || width == 0 || height == 0 {
        return shortest_route(targets);
    }
    let anchors: Vec<Location> = targets
        .iter()
        .filter_map(|target| nearest_edge_point(*target, width, height))
        .collect();
    let legs = Legs::new(targets, &anchors);

    let mut best: Option<(usize, Order)> = None;
    for (offset, anchor) in anchors.iter().enumerate() {
        let anchor_index = targets.len().saturating_add(offset);
        let order = if targets.len() <= MAX_EXHAUSTIVE_TARGETS {
            Exhaustive::solve(&legs, Some(anchor_index))
        } else {
            heuristic_order(&legs, Some(anchor_index))
        };
        let better = best
            .as_ref()
            .is_none_or(|(_, current)| order.distance < current.distance);
        if better {
            debug!(anchor = %anchor, distance = order.distance, "new best anchored route");
            best = Some((offset, order));
        }
    }

    match best {
        Some((offset, order)) => order.into_route(targets, anchors.get(offset).copied()),
        None => shortest_route(targets),
    }
}

/// Pick the planner for `targets`: edge-anchored when the board size is
/// known, plain otherwise.
pub fn plan_route(targets: &[Location], board: Option<(u32, u32)>) -> PlannedRoute {
    let route = match board {
        Some((width, height)) => best_route(targets, width, height),
        None => shortest_route(targets),
    };
    debug!(
        targets = route.targets.len(),
        distance = route.distance,
        exhaustive = targets.len() <= MAX_EXHAUSTIVE_TARGETS,
        "route planned"
    );
    route
}

/// The boundary cell closest to `target`.
///
/// Scans the bottom and top rows first, then the left and right columns; a
/// later candidate replaces an earlier one only if strictly closer.
pub fn nearest_edge_point(target: Location, width: u32, height: u32) -> Option<Location> {
    let max_x = i32::try_from(width).ok()?.checked_sub(1)?;
    let max_y = i32::try_from(height).ok()?.checked_sub(1)?;
    if max_x < 0 || max_y < 0 {
        return None;
    }
    let rows = (0..=max_x).flat_map(|x| [Location::new(x, 0), Location::new(x, max_y)]);
    let columns = (0..=max_y).flat_map(|y| [Location::new(0, y), Location::new(max_x, y)]);

    let mut best: Option<(f64, Location)> = None;
    for candidate in rows.chain(columns) {
        let distance = target.euclidean_distance(candidate);
        if best.is_none_or(|(closest, _)| distance < closest) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, point)| point)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Pairwise leg lengths. Indices `0..targets` are targets, anchors follow.
struct Legs {
    matrix: Vec<Vec<f64>>,
    targets: usize,
}

impl Legs {
    fn new(targets: &[Location], anchors: &[Location]) -> Self {
        let points: Vec<Location> = targets.iter().chain(anchors).copied().collect();
        let matrix = points
            .iter()
            .map(|a| points.iter().map(|b| a.euclidean_distance(*b)).collect())
            .collect();
        Self {
            matrix,
            targets: targets.len(),
        }
    }

    fn between(&self, from: usize, to: usize) -> f64 {
        self.matrix
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    /// Length of `order`, starting from `anchor` if given, summed left to right.
    fn length(&self, anchor: Option<usize>, order: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut previous = anchor;
        for &next in order {
            if let Some(from) = previous {
                total += self.between(from, next);
            }
            previous = Some(next);
        }
        total
    }
}

/// A visiting order over target indices and its length.
struct Order {
    indices: Vec<usize>,
    distance: f64,
}

impl Order {
    fn into_route(self, targets: &[Location], anchor: Option<Location>) -> PlannedRoute {
        PlannedRoute {
            anchor,
            targets: self
                .indices
                .iter()
                .filter_map(|&i| targets.get(i).copied())
                .collect(),
            distance: self.distance,
        }
    }
}

/// Depth-first enumeration of every order, pruned once a prefix is no
/// shorter than the best complete order (it could never be strictly less).
struct Exhaustive<'a> {
    legs: &'a Legs,
    prefix: Vec<usize>,
    best: Option<Order>,
}

impl<'a> Exhaustive<'a> {
    fn solve(legs: &'a Legs, anchor: Option<usize>) -> Order {
        let mut search = Self {
            legs,
            prefix: Vec::with_capacity(legs.targets),
            best: None,
        };
        let mut remaining: Vec<usize> = (0..legs.targets).collect();
        search.visit(&mut remaining, anchor, 0.0);
        search.best.unwrap_or(Order {
            indices: Vec::new(),
            distance: 0.0,
        })
    }

    fn visit(&mut self, remaining: &mut Vec<usize>, last: Option<usize>, so_far: f64) {
        let best = self.best.as_ref().map_or(f64::INFINITY, |order| order.distance);
        if remaining.is_empty() {
            if so_far < best {
                self.best = Some(Order {
                    indices: self.prefix.clone(),
                    distance: so_far,
                });
            }
            return;
        }
        if so_far >= best {
            return;
        }
        for i in 0..remaining.len() {
            let next = remaining.remove(i);
            let leg = last.map_or(0.0, |from| self.legs.between(from, next));
            self.prefix.push(next);
            self.visit(remaining, Some(next), so_far + leg);
            self.prefix.pop();
            remaining.insert(i, next);
        }
    }
}

/// Nearest-neighbour tours from every possible start, each improved by
/// 2-opt; the shortest wins.
fn heuristic_order(legs: &Legs, anchor: Option<usize>) -> Order {
    let starts: Vec<Option<usize>> = match anchor {
        Some(_) => vec![None],
        None => (0..legs.targets).map(Some).collect(),
    };
    let mut best: Option<Order> = None;
    for first in starts {
        let mut tour = nearest_neighbour(legs, anchor, first);
        two_opt(legs, anchor, &mut tour);
        let distance = legs.length(anchor, &tour);
        if best.as_ref().is_none_or(|b| distance < b.distance) {
            best = Some(Order {
                indices: tour,
                distance,
            });
        }
    }
    best.unwrap_or(Order {
        indices: Vec::new(),
        distance: 0.0,
    })
}

/// Greedy tour: from the anchor (or `first`), always go to the closest
/// unvisited target.
fn nearest_neighbour(legs: &Legs, anchor: Option<usize>, first: Option<usize>) -> Vec<usize> {
    let mut unvisited: Vec<usize> = (0..legs.targets).collect();
    let mut tour = Vec::with_capacity(legs.targets);
    let mut current = anchor;
    if let Some(start) = first {
        unvisited.retain(|&i| i != start);
        tour.push(start);
        current = Some(start);
    }
    while !unvisited.is_empty() {
        let mut pick = 0;
        let mut pick_distance = f64::INFINITY;
        for (slot, &candidate) in unvisited.iter().enumerate() {
            let d = current.map_or(0.0, |from| legs.between(from, candidate));
            if d < pick_distance {
                pick = slot;
                pick_distance = d;
            }
        }
        let next = unvisited.remove(pick);
        tour.push(next);
        current = Some(next);
    }
    tour
}

/// Reverse tour segments while doing so shortens the open path.
fn two_opt(legs: &Legs, anchor: Option<usize>, tour: &mut [usize]) {
    let len = tour.len();
    for _ in 0..MAX_TWO_OPT_PASSES {
        let mut improved = false;
        for i in 0..len {
            for j in i.saturating_add(1)..len {
                let before = if i == 0 {
                    anchor
                } else {
                    tour.get(i.saturating_sub(1)).copied()
                };
                let after = tour.get(j.saturating_add(1)).copied();
                let (Some(&first), Some(&last)) = (tour.get(i), tour.get(j)) else {
                    continue;
                };
                let old = before.map_or(0.0, |b| legs.between(b, first))
                    + after.map_or(0.0, |a| legs.between(last, a));
                let new = before.map_or(0.0, |b| legs.between(b, last))
                    + after.map_or(0.0, |a| legs.between(first, a));
                if new + IMPROVEMENT_EPSILON < old {
                    if let Some(segment) = tour.get_mut(i..=j) {
                        segment.reverse();
                    }
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(points: &[(i32, i32)]) -> Vec<Location> {
        points.iter().map(|&(x, y)| Location::new(x, y)).collect()
    }

    /// Shortest length over every order, via Heap's algorithm.
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
    fn brute_force_length(targets: &[Location]) -> f64 {
        let mut items = targets.to_vec();
        let n = items.len();
        let mut counters = vec![0_usize; n];
        let mut best = route_length(&items);
        let mut i = 0;
        while i < n {
            if counters[i] < i {
                if i % 2 == 0 {
                    items.swap(0, i);
                } else {
                    items.swap(counters[i], i);
                }
                best = best.min(route_length(&items));
                counters[i] += 1;
                i = 0;
            } else {
                counters[i] = 0;
                i += 1;
            }
        }
        best
    }

    #[test]
    fn route_length_of_short_routes() {
        assert!(route_length(&[]).abs() < 1e-9);
        assert!(route_length(&locs(&[(0, 0)])).abs() < 1e-9);
        assert!((route_length(&locs(&[(0, 0), (0, 10)])) - 10.0).abs() < 1e-9);
        assert!((route_length(&locs(&[(0, 0), (3, 4)])) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn base_cases() {
        let empty = shortest_route(&[]);
        assert!(empty.targets.is_empty());
        assert!(empty.distance.abs() < 1e-9);
        assert_eq!(empty.anchor, None);

        let single = shortest_route(&locs(&[(100, 200)]));
        assert_eq!(single.targets, locs(&[(100, 200)]));
        assert!(single.distance.abs() < 1e-9);
    }

    #[test]
    fn orders_targets_given_out_of_order() {
        let route = shortest_route(&locs(&[(2, 2), (0, 0), (5, 5)]));
        assert_eq!(route.targets, locs(&[(0, 0), (2, 2), (5, 5)]));

        let in_order = shortest_route(&locs(&[(0, 0), (2, 2), (5, 5)]));
        assert_eq!(in_order.targets, locs(&[(0, 0), (2, 2), (5, 5)]));
    }

    #[test]
    fn three_clumps() {
        let route = shortest_route(&locs(&[(0, 1), (0, 0), (10, 10), (20, 1)]));
        assert_eq!(route.targets, locs(&[(0, 0), (0, 1), (10, 10), (20, 1)]));
    }

    #[test]
    fn matches_brute_force_on_small_sets() {
        let sets = [
            locs(&[(3, 7), (9, 1), (0, 0), (5, 5)]),
            locs(&[(12, 3), (1, 14), (7, 7), (2, 2), (15, 15)]),
            locs(&[(0, 0), (10, 0), (0, 10), (10, 10), (5, 5)]),
            locs(&[(4, 4), (4, 4), (1, 9)]),
        ];
        for targets in &sets {
            let route = shortest_route(targets);
            assert_eq!(route.targets.len(), targets.len());
            assert!((route.distance - brute_force_length(targets)).abs() < 1e-9);
            assert!((route.distance - route_length(&route.targets)).abs() < 1e-9);
        }
    }

    #[test]
    fn anchored_route_starts_at_nearest_edge() {
        let route = best_route(&locs(&[(5, 1), (5, 8)]), 10, 10);
        assert_eq!(route.anchor, Some(Location::new(5, 0)));
        assert_eq!(route.targets, locs(&[(5, 1), (5, 8)]));
        assert!((route.distance - 8.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_edge_prefers_rows_on_ties() {
        // (1, 1) is 1 away from both (1, 0) and (0, 1); rows are scanned first.
        assert_eq!(
            nearest_edge_point(Location::new(1, 1), 5, 5),
            Some(Location::new(1, 0))
        );
        assert_eq!(
            nearest_edge_point(Location::new(8, 4), 10, 10),
            Some(Location::new(9, 4))
        );
        assert_eq!(nearest_edge_point(Location::new(0, 0), 0, 4), None);
    }

    #[test]
    fn large_sets_use_heuristic() {
        let mut targets: Vec<Location> = (0..12).map(|x| Location::new(x, 0)).collect();
        targets.swap(0, 7);
        targets.swap(3, 11);
        let route = shortest_route(&targets);
        assert_eq!(route.targets.len(), 12);
        assert!((route.distance - 11.0).abs() < 1e-9);
    }

    #[test]
    fn plan_route_dispatches_on_board() {
        let targets = locs(&[(5, 1), (5, 8)]);
        assert!(plan_route(&targets, None).anchor.is_none());
        assert!(plan_route(&targets, Some((10, 10))).anchor.is_some());
    }
}
