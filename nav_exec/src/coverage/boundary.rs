//! Classification of implement segments against boundary rings.
//!
//! A segment is cut at every point where it crosses a ring edge. Between two cuts the segment is
//! entirely inside or entirely outside, so classifying the midpoint of each piece gives the exact
//! inside fraction for polygonal rings.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nav_if::out::BoundaryResult;

use crate::field::Field;
use crate::geom::{self, Point, LENGTH_EPSILON_M};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Classify `p0 -> p1` against the area inside `outer` and outside every ring in `holes`.
pub fn classify_segment(p0: &Point, p1: &Point, outer: &[Point], holes: &[&[Point]]) -> BoundaryResult {
    let inside = |p: &Point| {
        geom::point_in_ring(p, outer) && !holes.iter().any(|h| geom::point_in_ring(p, h))
    };

    let mut rings: Vec<&[Point]> = Vec::with_capacity(holes.len() + 1);
    rings.push(outer);
    rings.extend_from_slice(holes);

    BoundaryResult::from_inside_pct(inside_fraction(p0, p1, &rings, inside))
}

/// Classify `p0 -> p1` against a field's workable area.
pub fn classify_in_field(p0: &Point, p1: &Point, field: &Field) -> BoundaryResult {
    let holes: Vec<&[Point]> = field.islands.iter().map(|i| i.points()).collect();
    classify_segment(p0, p1, field.outer.points(), &holes)
}

/// Fraction of `p0 -> p1` for which `inside` holds, where `inside` may only change value where
/// the segment crosses an edge of one of `rings`.
pub fn inside_fraction<F>(p0: &Point, p1: &Point, rings: &[&[Point]], inside: F) -> f64
where
    F: Fn(&Point) -> bool,
{
    if (p1 - p0).norm() < LENGTH_EPSILON_M {
        return if inside(p0) { 1.0 } else { 0.0 };
    }

    let cuts = crossing_params(p0, p1, rings);

    cuts.windows(2)
        .filter(|w| w[1] - w[0] > 0.0)
        .filter(|w| inside(&lerp(p0, p1, 0.5 * (w[0] + w[1]))))
        .map(|w| w[1] - w[0])
        .sum::<f64>()
        .min(1.0)
}

/// Intervals of `[0, 1]` along `p0 -> p1` lying inside `ring`.
pub fn inside_intervals(p0: &Point, p1: &Point, ring: &[Point]) -> Vec<(f64, f64)> {
    let cuts = crossing_params(p0, p1, &[ring]);

    let mut intervals: Vec<(f64, f64)> = Vec::new();

    for w in cuts.windows(2) {
        if w[1] - w[0] <= 0.0 || !geom::point_in_ring(&lerp(p0, p1, 0.5 * (w[0] + w[1])), ring) {
            continue;
        }

        // Join with the previous piece if they touch
        match intervals.last_mut() {
            Some(last) if last.1 >= w[0] => last.1 = w[1],
            _ => intervals.push((w[0], w[1])),
        }
    }

    intervals
}

/// Sorted parameters in `[0, 1]` where `p0 -> p1` crosses any ring edge, including both ends.
fn crossing_params(p0: &Point, p1: &Point, rings: &[&[Point]]) -> Vec<f64> {
    let mut cuts = vec![0.0, 1.0];

    for ring in rings {
        let n = ring.len();
        for i in 0..n {
            if let Some(t) = geom::segment_crossing_param(p0, p1, &ring[i], &ring[(i + 1) % n]) {
                cuts.push(t);
            }
        }
    }

    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    cuts.dedup();

    cuts
}

fn lerp(p0: &Point, p1: &Point, t: f64) -> Point {
    p0 + (p1 - p0) * t
}
