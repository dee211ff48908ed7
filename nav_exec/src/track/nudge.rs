//! Lateral nudging of tracks.
//!
//! Lines are shifted exactly. Curves are offset point by point along the local perpendicular,
//! which on the inside of a bend makes points bunch up or cross over. Those are removed by a
//! neighbourhood guard and a spacing filter before the result is smoothed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use util::quadtree::QuadTree;

use crate::geom::{self, right_perp, Point};

use super::{with_headings, CurvePoint, TrackParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset points may be this much closer to the original curve than the offset distance.
const GUARD_TOLERANCE_M: f64 = 0.001;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Shift both ends of the line `a -> b` by `offset_m` to the right of its direction.
pub fn nudge_line(a: &Point, b: &Point, offset_m: f64) -> (Point, Point) {
    let shift = right_perp(geom::heading_between(a, b)) * offset_m;
    (a + shift, b + shift)
}

/// Offset a curve by `offset_m` to the right of its direction.
///
/// Returns an empty vector when fewer than two points survive filtering.
pub fn nudge_curve(
    points: &[CurvePoint],
    closed: bool,
    offset_m: f64,
    params: &TrackParams,
) -> Vec<CurvePoint> {
    let positions: Vec<Point> = points.iter().map(|p| p.position_m).collect();

    if positions.len() < 2 {
        return Vec::new();
    }

    if offset_m == 0.0 {
        return points.to_vec();
    }

    let headings = if closed && positions.len() > 2 {
        geom::ring_headings(&positions)
    } else {
        geom::polyline_headings(&positions)
    };

    let guard_m = offset_m.abs() - GUARD_TOLERANCE_M;
    let index = if guard_m > 0.0 {
        QuadTree::from_points(&positions)
    } else {
        None
    };

    let mut kept: Vec<Point> = Vec::with_capacity(positions.len());
    let mut num_guarded = 0;

    for (p, h) in positions.iter().zip(headings.iter()) {
        let candidate = p + right_perp(*h) * offset_m;

        if let Some(ref index) = index {
            if index.any_within(&candidate, guard_m) {
                num_guarded += 1;
                continue;
            }
        }

        if let Some(last) = kept.last() {
            if (candidate - last).norm() < params.nudge_min_spacing_m {
                continue;
            }
        }

        kept.push(candidate);
    }

    if closed && kept.len() > 2 {
        if let (Some(first), Some(last)) = (kept.first(), kept.last()) {
            if (first - last).norm() < params.nudge_min_spacing_m {
                kept.pop();
            }
        }
    }

    debug!(
        "Nudged curve by {:.3} m: {} of {} points kept, {} removed by the guard",
        offset_m,
        kept.len(),
        positions.len(),
        num_guarded
    );

    if kept.len() < 2 {
        return Vec::new();
    }

    let smoothed = smooth(&kept, closed, params.nudge_smoothing_window);

    with_headings(&smoothed, closed)
}

/// Centred moving average over `window` points.
///
/// Open curves keep the points within half a window of each end unchanged, so the ends do not
/// shrink back along the curve. Closed curves average around the wrap.
fn smooth(points: &[Point], closed: bool, window: usize) -> Vec<Point> {
    let n = points.len();
    let half = window / 2;

    if window < 3 || n < window {
        return points.to_vec();
    }

    (0..n)
        .map(|i| {
            if closed {
                let sum = (0..=2 * half)
                    .map(|k| points[(i + n + k - half) % n])
                    .fold(Point::zeros(), |acc, p| acc + p);
                sum / (2 * half + 1) as f64
            } else if i < half || i + half >= n {
                points[i]
            } else {
                let sum = points[i - half..=i + half]
                    .iter()
                    .fold(Point::zeros(), |acc, p| acc + p);
                sum / (2 * half + 1) as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::track::{Track, TrackError};
    use std::f64::consts::TAU;

    fn circle(radius: f64, num: usize) -> Vec<Point> {
        (0..num)
            .map(|i| {
                let a = TAU * i as f64 / num as f64;
                Point::new(radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_nudge_line_right() {
        let (a, b) = nudge_line(&Point::new(0.0, 0.0), &Point::new(0.0, 100.0), 1.5);
        assert!((a - Point::new(1.5, 0.0)).norm() < 1e-12);
        assert!((b - Point::new(1.5, 100.0)).norm() < 1e-12);

        let (a, _) = nudge_line(&Point::new(0.0, 0.0), &Point::new(100.0, 0.0), 1.5);
        assert!((a - Point::new(0.0, -1.5)).norm() < 1e-12);
    }

    #[test]
    fn test_nudge_straight_curve() {
        let params = TrackParams::default();
        let positions: Vec<Point> = (0..=50).map(|i| Point::new(0.0, i as f64)).collect();
        let track = Track::curve(&positions, false).unwrap();

        match track.nudged(2.0, &params).unwrap() {
            Track::Curve { points, .. } => {
                assert_eq!(points.len(), 51);
                for p in points.iter() {
                    assert!((p.position_m.x - 2.0).abs() < 1e-9);
                    assert!(p.heading_rad.abs() < 1e-9);
                }
                assert!((points[50].position_m.y - 50.0).abs() < 1e-9);
            }
            _ => panic!("Expected a curve"),
        }
    }

    #[test]
    fn test_nudge_closed_circle() {
        let params = TrackParams::default();

        // Anticlockwise, so the right hand side is outside
        let track = Track::curve(&circle(20.0, 100), true).unwrap();

        for (offset, radius) in [(5.0, 25.0), (-5.0, 15.0)].iter() {
            match track.nudged(*offset, &params).unwrap() {
                Track::Curve { points, closed } => {
                    assert!(closed);
                    assert!(points.len() > 90);
                    for p in points.iter() {
                        assert!((p.position_m.norm() - radius).abs() < 0.2);
                    }
                }
                _ => panic!("Expected a curve"),
            }
        }
    }

    #[test]
    fn test_nudge_collapse() {
        let params = TrackParams::default();
        let track = Track::curve(&circle(2.0, 40), true).unwrap();

        assert_eq!(track.nudged(-5.0, &params), Err(TrackError::NudgeCollapsed(-5.0)));
    }

    #[test]
    fn test_nudge_sparse_closed_curve() {
        let params = TrackParams::default();

        // Fewer points than the smoothing window, so the corners are not averaged
        let corners = vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 20.0),
        ];
        assert!(corners.len() < params.nudge_smoothing_window);
        let track = Track::curve(&corners, true).unwrap();

        // Anticlockwise, right is outwards along the corner diagonals
        for offset in [2.0, -2.0].iter() {
            match track.nudged(*offset, &params).unwrap() {
                Track::Curve { points, closed } => {
                    assert!(closed);
                    assert_eq!(points.len(), 4);

                    for (p, c) in points.iter().zip(corners.iter()) {
                        assert!(((p.position_m - c).norm() - 2.0).abs() < 1e-9);
                    }

                    let moved: Vec<Point> = points.iter().map(|p| p.position_m).collect();
                    assert_eq!(geom::signed_area(&moved) > 400.0, *offset > 0.0);
                }
                _ => panic!("Expected a curve"),
            }
        }

        // Every inward point lands closer than the offset to a neighbouring corner
        assert_eq!(track.nudged(-15.0, &params), Err(TrackError::NudgeCollapsed(-15.0)));
    }

    #[test]
    fn test_tight_bend_has_no_loops() {
        let params = TrackParams::default();

        // North, then a 1 m radius right hand bend, then east
        let mut positions: Vec<Point> = (0..=20).map(|i| Point::new(0.0, i as f64)).collect();
        for i in 1..4 {
            let a = std::f64::consts::FRAC_PI_2 * i as f64 / 4.0;
            positions.push(Point::new(1.0 - a.cos(), 20.0 + a.sin()));
        }
        positions.extend((1..=21).map(|i| Point::new(i as f64, 21.0)));

        let track = Track::curve(&positions, false).unwrap();

        // Nudging right moves to the inside of the bend by more than its radius
        let nudged = match track.nudged(3.0, &params) {
            Ok(Track::Curve { points, .. }) => points,
            r => panic!("Expected a curve, got {:?}", r),
        };

        assert!(nudged.len() > 20);

        // Without the guard the offset legs would overshoot each other near the bend
        for p in nudged.iter() {
            let (_, _, _, d) = geom::nearest_on_polyline(&p.position_m, &positions).unwrap();
            assert!(d > 2.5, "point {:?} is only {} m from the original", p.position_m, d);
        }
    }
}
