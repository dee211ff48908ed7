//! # Planar geometry primitives
//!
//! All geometry lives in the local plane with `x` pointing east and `y` pointing north, in
//! metres. Headings are measured clockwise from north in radians, so the unit vector of heading
//! `h` is `(sin h, cos h)`.
//!
//! Rings are stored without a repeated closing point and are implicitly closed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lengths below this are treated as zero.
pub const LENGTH_EPSILON_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point in the local plane.
pub type Point = Vector2<f64>;

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Bounds {
    /// Bounds of a set of points, `None` if there are no points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;

        Some(points.iter().fold(
            Self { min: *first, max: *first },
            |b, p| Self { min: b.min.inf(p), max: b.max.sup(p) }
        ))
    }

    /// Returns `true` if the segment `p0 -> p1` could touch these bounds.
    pub fn overlaps_segment(&self, p0: &Point, p1: &Point) -> bool {
        p0.x.max(p1.x) >= self.min.x
            && p0.x.min(p1.x) <= self.max.x
            && p0.y.max(p1.y) >= self.min.y
            && p0.y.min(p1.y) <= self.max.y
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Unit vector in the direction of `heading_rad`.
pub fn heading_to_unit(heading_rad: f64) -> Point {
    Point::new(heading_rad.sin(), heading_rad.cos())
}

/// Unit vector perpendicular to `heading_rad`, pointing to the right of travel.
pub fn right_perp(heading_rad: f64) -> Point {
    Point::new(heading_rad.cos(), -heading_rad.sin())
}

/// Heading of the vector from `from` to `to`, in [0, 2pi).
///
/// Coincident points give a heading of zero.
pub fn heading_between(from: &Point, to: &Point) -> f64 {
    heading_of(&(to - from))
}

/// Heading of a direction vector, in [0, 2pi).
pub fn heading_of(dir: &Point) -> f64 {
    wrap_2pi(dir.x.atan2(dir.y))
}

/// 2D cross product `a x b`, positive when `b` is anticlockwise (to the left) of `a`.
pub fn cross(a: &Point, b: &Point) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed area of a ring by the shoelace formula, positive for anticlockwise winding.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = &ring[i];
        let b = &ring[(i + 1) % ring.len()];
        sum += cross(a, b);
    }

    0.5 * sum
}

/// Perimeter of a closed ring.
pub fn perimeter(ring: &[Point]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }

    (0..ring.len())
        .map(|i| (ring[(i + 1) % ring.len()] - ring[i]).norm())
        .sum()
}

/// Length of an open polyline.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Insert points so that no edge is longer than `max_spacing_m`.
///
/// Original points are kept. If `closed` the edge from the last point back to the first is also
/// densified.
pub fn densify(points: &[Point], max_spacing_m: f64, closed: bool) -> Vec<Point> {
    if points.len() < 2 || !(max_spacing_m > 0.0) {
        return points.to_vec();
    }

    let num_edges = if closed { points.len() } else { points.len() - 1 };
    let mut out = Vec::with_capacity(points.len());

    for i in 0..num_edges {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let len = (b - a).norm();

        out.push(a);

        let num_steps = (len / max_spacing_m).ceil() as usize;
        for step in 1..num_steps {
            let t = step as f64 / num_steps as f64;
            out.push(a + (b - a) * t);
        }
    }

    if !closed {
        if let Some(last) = points.last() {
            out.push(*last);
        }
    }

    out
}

/// Closest point to `p` on the segment `a -> b`, and its parameter along the segment in [0, 1].
pub fn closest_point_on_segment(p: &Point, a: &Point, b: &Point) -> (Point, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq < LENGTH_EPSILON_M * LENGTH_EPSILON_M {
        return (*a, 0.0);
    }

    let t = ((p - a).dot(&ab) / len_sq).max(0.0).min(1.0);
    (a + ab * t, t)
}

/// Distance from `p` to the segment `a -> b`.
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    (p - closest_point_on_segment(p, a, b).0).norm()
}

/// Nearest point to `p` on an open polyline.
///
/// Returns the point, the index of the segment it lies on, the parameter along that segment and
/// the distance, or `None` for fewer than two points.
pub fn nearest_on_polyline(p: &Point, points: &[Point]) -> Option<(Point, usize, f64, f64)> {
    let mut best: Option<(Point, usize, f64, f64)> = None;

    for (i, w) in points.windows(2).enumerate() {
        let (q, t) = closest_point_on_segment(p, &w[0], &w[1]);
        let d = (p - q).norm();

        if best.map_or(true, |b| d < b.3) {
            best = Some((q, i, t, d));
        }
    }

    best
}

/// Nearest point to `p` on a closed ring and its distance, or `None` for fewer than two points.
pub fn nearest_on_ring(p: &Point, ring: &[Point]) -> Option<(Point, f64)> {
    if ring.len() < 2 {
        return None;
    }

    let mut best: Option<(Point, f64)> = None;

    for i in 0..ring.len() {
        let (q, _) = closest_point_on_segment(p, &ring[i], &ring[(i + 1) % ring.len()]);
        let d = (p - q).norm();

        if best.map_or(true, |b| d < b.1) {
            best = Some((q, d));
        }
    }

    best
}

/// Even-odd point in ring test by ray crossing.
///
/// Points on an edge or vertex are inside, whatever the winding.
pub fn point_in_ring(p: &Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let a = &ring[i];
        let b = &ring[j];

        if distance_to_segment(p, a, b) <= LENGTH_EPSILON_M {
            return true;
        }

        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Parameter along `p0 -> p1` where it properly crosses the segment `a -> b`.
///
/// Parallel or non-crossing segments return `None`. Touching at an end counts as crossing.
pub fn segment_crossing_param(p0: &Point, p1: &Point, a: &Point, b: &Point) -> Option<f64> {
    let r = p1 - p0;
    let s = b - a;
    let denom = cross(&r, &s);

    if denom.abs() < 1e-12 {
        return None;
    }

    let qp = a - p0;
    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Heading of every point of a ring from its previous to its next neighbour, wrapping at the
/// ends.
pub fn ring_headings(ring: &[Point]) -> Vec<f64> {
    let n = ring.len();
    (0..n)
        .map(|i| heading_between(&ring[(i + n - 1) % n], &ring[(i + 1) % n]))
        .collect()
}

/// Heading of every point of an open polyline from its previous to its next neighbour, using
/// the point itself at the ends.
pub fn polyline_headings(points: &[Point]) -> Vec<f64> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = if i == 0 { 0 } else { i - 1 };
            let next = if i + 1 >= n { n - 1 } else { i + 1 };
            heading_between(&points[prev], &points[next])
        })
        .collect()
}
