//! Offsetting of boundary rings and open lines.
//!
//! Inward offsets shrink a boundary point by point along the local perpendicular. Corners and
//! narrow necks make offset points land closer to the boundary than the offset distance, those
//! are found with a quadtree over the original points and dropped. Outward offsets and line
//! offsets use polygon buffering from `geo`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cmp::Ordering;
use std::f64::consts::PI;

use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo::{Area, LineString, MultiPolygon, Polygon};
use log::trace;
use nav_if::cmd::JoinStyle;
use ordered_float::OrderedFloat;
use util::quadtree::QuadTree;

use crate::geom::{self, cross, right_perp, Point, LENGTH_EPSILON_M};

use super::HeadlandParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset points may be this much closer to the boundary than the offset distance.
const GUARD_TOLERANCE_M: f64 = 0.001;

/// Offset rings enclosing less than this are collapsed.
const COLLAPSE_AREA_M2: f64 = 1e-3;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Heading at every point of a ring, from its previous to its next neighbour.
pub fn point_headings(ring: &[Point]) -> Vec<f64> {
    geom::ring_headings(ring)
}

/// Shrink a ring by `offset_m`.
///
/// The interior side is found from the ring's winding. Returns `None` when the offset has
/// consumed the ring: fewer than 3 points survive, or the survivors enclose no area or wind the
/// other way. Offsets of zero or less return the ring unchanged.
pub fn inward_offset(ring: &[Point], offset_m: f64, params: &HeadlandParams) -> Option<Vec<Point>> {
    if ring.len() < 3 || !offset_m.is_finite() {
        return None;
    }

    if offset_m <= 0.0 {
        return Some(ring.to_vec());
    }

    let dense = geom::densify(ring, params.densify_spacing_m, true);

    let area = geom::signed_area(&dense);
    if area == 0.0 {
        return None;
    }

    // Anticlockwise rings have their interior on the left
    let side = if area > 0.0 { -1.0 } else { 1.0 };

    let index = QuadTree::from_points(&dense)?;
    let guard_m = offset_m - GUARD_TOLERANCE_M;

    let mut kept: Vec<Point> = Vec::with_capacity(dense.len());

    for (p, h) in dense.iter().zip(point_headings(&dense)) {
        let candidate = p + right_perp(h) * (side * offset_m);

        if index.any_within(&candidate, guard_m) {
            continue;
        }

        if let Some(last) = kept.last() {
            if (candidate - last).norm() < params.min_point_spacing_m {
                continue;
            }
        }

        kept.push(candidate);
    }

    if kept.len() > 2 {
        if let (Some(first), Some(last)) = (kept.first(), kept.last()) {
            if (first - last).norm() < params.min_point_spacing_m {
                kept.pop();
            }
        }
    }

    trace!(
        "Inward offset {:.3} m kept {} of {} points",
        offset_m,
        kept.len(),
        dense.len()
    );

    if kept.len() < 3 {
        return None;
    }

    // Squeezed flat or turned inside out
    let kept_area = geom::signed_area(&kept);
    if kept_area.abs() < COLLAPSE_AREA_M2 || (kept_area > 0.0) != (area > 0.0) {
        trace!("Inward offset {:.3} m left an area of {:.6} m^2", offset_m, kept_area);
        return None;
    }

    Some(kept)
}

/// Grow a ring by `offset_m` using polygon buffering.
///
/// If buffering splits the result the largest polygon is used. The result has the same winding
/// as the input.
pub fn outward_offset(
    ring: &[Point],
    offset_m: f64,
    join: JoinStyle,
    params: &HeadlandParams,
) -> Option<Vec<Point>> {
    if ring.len() < 3 || !offset_m.is_finite() {
        return None;
    }

    if offset_m <= 0.0 {
        return Some(ring.to_vec());
    }

    let anticlockwise = geom::signed_area(ring) > 0.0;

    let mut coords: Vec<(f64, f64)> = ring.iter().map(|p| (p.x, p.y)).collect();
    if !anticlockwise {
        coords.reverse();
    }
    let polygon = Polygon::new(LineString::from(coords), vec![]);

    let style = BufferStyle::new(offset_m).line_join(line_join(join, params));
    let buffered = polygon.buffer_with_style(style);

    let mut points = largest_exterior(&buffered)?;

    if (geom::signed_area(&points) > 0.0) != anticlockwise {
        points.reverse();
    }

    Some(points)
}

/// Repeatedly shrink a ring by `pass_width_m`, returning up to `num_passes` rings.
///
/// Each pass offsets the previous pass's ring. Stops early at the first collapse.
pub fn multi_pass_inward(
    ring: &[Point],
    pass_width_m: f64,
    num_passes: usize,
    params: &HeadlandParams,
) -> Vec<Vec<Point>> {
    multi_pass_inward_until(ring, pass_width_m, num_passes, params, || false).unwrap_or_default()
}

/// As [`multi_pass_inward`], checking `cancelled` before each pass.
///
/// Returns `None` if cancelled.
pub fn multi_pass_inward_until<F: Fn() -> bool>(
    ring: &[Point],
    pass_width_m: f64,
    num_passes: usize,
    params: &HeadlandParams,
    cancelled: F,
) -> Option<Vec<Vec<Point>>> {
    let mut rings: Vec<Vec<Point>> = Vec::with_capacity(num_passes);

    if pass_width_m <= 0.0 {
        return Some(rings);
    }

    for pass in 0..num_passes {
        if cancelled() {
            return None;
        }

        let prev = match rings.last() {
            Some(r) => r.as_slice(),
            None => ring,
        };

        match inward_offset(prev, pass_width_m, params) {
            Some(r) => rings.push(r),
            None => {
                trace!("Headland collapsed at pass {} of {}", pass + 1, num_passes);
                break;
            }
        }
    }

    Some(rings)
}

/// Offset an open polyline sideways by `offset_m`, positive to the left of travel.
///
/// The polyline is buffered with round caps and the buffer points lying at the offset distance on
/// the requested side are kept, ordered along the polyline's overall direction.
pub fn line_offset(
    points: &[Point],
    offset_m: f64,
    join: JoinStyle,
    params: &HeadlandParams,
) -> Vec<Point> {
    if points.len() < 2 || !offset_m.is_finite() || offset_m == 0.0 {
        return points.to_vec();
    }

    let dist_m = offset_m.abs();

    let line = LineString::from(points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>());
    let style = BufferStyle::new(dist_m)
        .line_join(line_join(join, params))
        .line_cap(LineCap::Round(params.round_join_step_deg.to_radians()));
    let buffered = line.buffer_with_style(style);

    let ring = match largest_exterior(&buffered) {
        Some(r) => r,
        None => return Vec::new(),
    };

    let tolerance_m = params.line_offset_tolerance * dist_m;

    let mut kept: Vec<Point> = ring
        .iter()
        .filter(|q| match geom::nearest_on_polyline(q, points) {
            Some((_, seg, _, d)) => {
                let seg_dir = points[seg + 1] - points[seg];
                let side = cross(&seg_dir, &(*q - points[seg]));

                (d - dist_m).abs() <= tolerance_m && side * offset_m > 0.0
            }
            None => false,
        })
        .copied()
        .collect();

    if kept.len() < 2 {
        return ring[..ring.len() / 2 + 1].to_vec();
    }

    let mut dir = points[points.len() - 1] - points[0];
    if dir.norm() < LENGTH_EPSILON_M {
        dir = points[1] - points[0];
    }

    let origin = points[0];
    kept.sort_by_key(|q| OrderedFloat((q - origin).dot(&dir)));

    kept
}

fn line_join(join: JoinStyle, params: &HeadlandParams) -> LineJoin<f64> {
    match join {
        JoinStyle::Round => LineJoin::Round(params.round_join_step_deg.to_radians()),
        JoinStyle::Miter => LineJoin::Miter(miter_min_angle_rad(params.miter_limit)),
        JoinStyle::Square => LineJoin::Bevel,
    }
}

/// Sharpest corner angle still mitred under a miter length limit given in offsets.
///
/// The buffer takes the limit as this angle and cuts back the tips of sharper corners. A limit
/// of 1 or less cuts every corner.
fn miter_min_angle_rad(miter_limit: f64) -> f64 {
    if miter_limit > 1.0 {
        2.0 * (1.0 / miter_limit).asin()
    } else {
        PI
    }
}

/// Exterior ring of the largest polygon without its closing point.
fn largest_exterior(buffered: &MultiPolygon<f64>) -> Option<Vec<Point>> {
    let largest = buffered.0.iter().max_by(|a, b| {
        a.unsigned_area()
            .partial_cmp(&b.unsigned_area())
            .unwrap_or(Ordering::Equal)
    })?;

    let mut points: Vec<Point> = largest
        .exterior()
        .coords()
        .map(|c| Point::new(c.x, c.y))
        .collect();

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() < 3 {
        None
    } else {
        Some(points)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_inward_offset_square() {
        let params = HeadlandParams::default();

        for ring in [square(100.0), square(100.0).into_iter().rev().collect()].iter() {
            let offset = inward_offset(ring, 5.0, &params).unwrap();

            for p in offset.iter() {
                assert!(p.x >= 5.0 - 1e-6 && p.x <= 95.0 + 1e-6);
                assert!(p.y >= 5.0 - 1e-6 && p.y <= 95.0 + 1e-6);
            }

            assert!((geom::perimeter(&offset) - 360.0).abs() < 1.0);

            // Winding is preserved
            assert_eq!(
                geom::signed_area(&offset) > 0.0,
                geom::signed_area(ring) > 0.0
            );
        }
    }

    #[test]
    fn test_inward_offset_collapse() {
        let params = HeadlandParams::default();

        assert!(inward_offset(&square(100.0), 50.0, &params).is_none());
        assert!(inward_offset(&square(100.0), 70.0, &params).is_none());

        // Long thin field collapses at half its width
        let strip = vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 20.0),
            Point::new(0.0, 20.0),
        ];
        assert!(inward_offset(&strip, 8.0, &params).is_some());
        assert!(inward_offset(&strip, 10.5, &params).is_none());
    }

    #[test]
    fn test_inward_offset_half_width_collapses() {
        let params = HeadlandParams::default();

        let strip = vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 20.0),
            Point::new(0.0, 20.0),
        ];

        // Both long sides meet on the centre line, nothing is left inside
        assert!(inward_offset(&strip, 10.0, &params).is_none());
        let cw: Vec<Point> = strip.iter().rev().copied().collect();
        assert!(inward_offset(&cw, 10.0, &params).is_none());

        let thin = inward_offset(&strip, 9.5, &params).unwrap();
        assert!(geom::signed_area(&thin) > 0.0);

        // 100 m square in 25 m passes: one 50 m ring, the second pass is exactly half of it
        let rings = multi_pass_inward(&square(100.0), 25.0, 5, &params);
        assert_eq!(rings.len(), 1);
        assert!((geom::signed_area(&rings[0]) - 2500.0).abs() < 1.0);
    }

    #[test]
    fn test_inward_offset_trivial_inputs() {
        let params = HeadlandParams::default();
        let ring = square(10.0);

        assert_eq!(inward_offset(&ring, 0.0, &params), Some(ring.clone()));
        assert_eq!(inward_offset(&ring, -1.0, &params), Some(ring.clone()));
        assert!(inward_offset(&ring[..2], 1.0, &params).is_none());
        assert!(inward_offset(&ring, f64::NAN, &params).is_none());
    }

    #[test]
    fn test_multi_pass_stops_at_collapse() {
        let params = HeadlandParams::default();

        let rings = multi_pass_inward(&square(100.0), 10.0, 3, &params);
        assert_eq!(rings.len(), 3);

        let rings = multi_pass_inward(&square(100.0), 10.0, 10, &params);
        assert_eq!(rings.len(), 4);

        // Each ring is inside the previous one
        for w in rings.windows(2) {
            assert!(geom::signed_area(&w[1]) < geom::signed_area(&w[0]));
        }

        assert!(multi_pass_inward_until(&square(100.0), 10.0, 3, &params, || true).is_none());
    }

    #[test]
    fn test_outward_offset_join_areas() {
        let params = HeadlandParams::default();
        let ring = square(10.0);

        let area_for = |join: JoinStyle| {
            geom::signed_area(&outward_offset(&ring, 2.0, join, &params).unwrap())
        };

        // Square corners are bevelled: 100 + 4 * 20 + 4 * 2
        let bevel = area_for(JoinStyle::Square);
        assert!((bevel - 188.0).abs() < 1e-6, "bevel area {}", bevel);

        // Round corners are 10 degree chords of a 2 m circle
        let round = area_for(JoinStyle::Round);
        assert!((round - 192.5).abs() < 0.1, "round area {}", round);
        assert!(round < 180.0 + 4.0 * PI);

        // Right angles are within a miter limit of 2, so the full 14 m square is kept
        let miter = area_for(JoinStyle::Miter);
        assert!((miter - 196.0).abs() < 1e-3, "miter area {}", miter);

        // Clockwise input gives clockwise output
        let cw: Vec<Point> = ring.iter().rev().copied().collect();
        let grown = outward_offset(&cw, 2.0, JoinStyle::Round, &params).unwrap();
        assert!(geom::signed_area(&grown) < 0.0);
    }

    #[test]
    fn test_miter_limit_to_angle() {
        // A limit of 2 offsets mitres corners down to 60 degrees
        assert!((miter_min_angle_rad(2.0) - PI / 3.0).abs() < 1e-12);
        assert!((miter_min_angle_rad(2f64.sqrt()) - PI / 2.0).abs() < 1e-12);
        assert_eq!(miter_min_angle_rad(1.0), PI);
        assert_eq!(miter_min_angle_rad(f64::NAN), PI);

        // A limit below sqrt(2) cuts the right angle tips
        let params = HeadlandParams {
            miter_limit: 1.2,
            ..HeadlandParams::default()
        };
        let area = geom::signed_area(
            &outward_offset(&square(10.0), 2.0, JoinStyle::Miter, &params).unwrap()
        );
        assert!(area > 188.0 - 1e-6 && area < 196.0 - 1e-3, "clipped miter area {}", area);
    }

    #[test]
    fn test_line_offset_side() {
        let params = HeadlandParams::default();
        let line = vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(100.0, 0.0)];

        let left = line_offset(&line, 5.0, JoinStyle::Round, &params);
        assert!(left.len() >= 2);
        for p in left.iter() {
            assert!(p.y > 0.0);
            let (_, _, _, d) = geom::nearest_on_polyline(p, &line).unwrap();
            assert!((d - 5.0).abs() < 1e-3);
        }
        for w in left.windows(2) {
            assert!(w[1].x >= w[0].x);
        }

        let right = line_offset(&line, -5.0, JoinStyle::Round, &params);
        assert!(right.len() >= 2);
        assert!(right.iter().all(|p| p.y < 0.0));

        assert_eq!(line_offset(&line, 0.0, JoinStyle::Round, &params), line);
    }

    #[test]
    fn test_point_headings_square() {
        let h = point_headings(&square(10.0));

        // At (10, 0) the neighbours are (0, 0) and (10, 10)
        assert!((h[1] - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
