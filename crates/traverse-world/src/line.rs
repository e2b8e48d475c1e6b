//! Straight-line waypoint sampling for scout flights.
//!
//! A flight from `a` to `b` is cut into `round(|ab|)` equal parts. The
//! sample points are the start of each part, rounded to the nearest cell,
//! so the start is included and the destination is not. Halves round to
//! the even neighbour.

use traverse_types::Location;

/// Sample the segment `from -> to` at one point per unit of distance.
///
/// Returns an empty list when the rounded distance is zero.
pub fn sample_line(from: Location, to: Location) -> Vec<Location> {
    let distance = from.euclidean_distance(to).round_ties_even();
    // Board coordinates are i32, so the rounded length fits in u32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let parts = distance as u32;
    if parts == 0 {
        return Vec::new();
    }
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let total = f64::from(parts);
    (0..parts)
        .map(|step| {
            let t = f64::from(step) / total;
            Location::new(round_coord(dx.mul_add(t, x0)), round_coord(dy.mul_add(t, y0)))
        })
        .collect()
}

/// The (rounded) midpoint of `from` and `to`.
pub fn midpoint(from: Location, to: Location) -> Location {
    let x = (f64::from(from.x) + f64::from(to.x)) / 2.0;
    let y = (f64::from(from.y) + f64::from(to.y)) / 2.0;
    Location::new(round_coord(x), round_coord(y))
}

/// Round an interpolated coordinate back onto the grid.
fn round_coord(value: f64) -> i32 {
    // Interpolates between two i32 values, so it stays in range.
    #[allow(clippy::cast_possible_truncation)]
    {
        value.round_ties_even() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_line_has_one_point_per_cell() {
        let points = sample_line(Location::new(0, 0), Location::new(4, 0));
        let expected: Vec<Location> = (0..4).map(|x| Location::new(x, 0)).collect();
        assert_eq!(points, expected);
    }

    #[test]
    fn diagonal_line_rounds_to_cells() {
        let points = sample_line(Location::new(0, 0), Location::new(3, 3));
        // |ab| = 4.24 -> 4 parts of 0.75 each.
        assert_eq!(
            points,
            vec![
                Location::new(0, 0),
                Location::new(1, 1),
                Location::new(2, 2),
                Location::new(2, 2),
            ]
        );
    }

    #[test]
    fn degenerate_line_is_empty() {
        assert!(sample_line(Location::new(5, 5), Location::new(5, 5)).is_empty());
    }

    #[test]
    fn reversed_line_starts_at_its_own_origin() {
        let points = sample_line(Location::new(10, 2), Location::new(4, 2));
        assert_eq!(points.first(), Some(&Location::new(10, 2)));
        assert_eq!(points.len(), 6);
        assert!(!points.contains(&Location::new(4, 2)));
    }

    #[test]
    fn half_samples_round_to_even() {
        // |ab| = 2.24 -> 2 parts; the second sample is (0.5, 1).
        assert_eq!(
            sample_line(Location::new(0, 0), Location::new(1, 2)),
            vec![Location::new(0, 0), Location::new(0, 1)]
        );
    }

    #[test]
    fn midpoint_rounds_halves_to_even() {
        assert_eq!(midpoint(Location::new(0, 0), Location::new(10, 4)), Location::new(5, 2));
        assert_eq!(midpoint(Location::new(0, 0), Location::new(3, 0)), Location::new(2, 0));
        assert_eq!(midpoint(Location::new(0, 0), Location::new(5, 0)), Location::new(2, 0));
        assert_eq!(midpoint(Location::new(0, 0), Location::new(7, 1)), Location::new(4, 0));
        assert_eq!(midpoint(Location::new(-5, 0), Location::new(0, 0)), Location::new(-2, 0));
    }
}
