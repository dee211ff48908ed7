//! Pure pursuit steering for lines and curves.
//!
//! Both variants place a goal point on the track a lookahead distance ahead of the point nearest
//! the vehicle, then steer onto the circular arc through the vehicle and the goal:
//!
//! ```text
//! curvature = 2 sin(alpha) / lookahead
//! steer     = atan(curvature * wheelbase)
//! ```
//!
//! where `alpha` is the angle from the vehicle heading to the goal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nav_if::out::SteeringOutput;
use util::maths::{clamp, wrap_pi};

use crate::geom::{self, cross, heading_to_unit, Point};
use crate::loc::VehiclePose;
use crate::track::CurvePoint;

use super::{EndPolicy, GuidanceParams, NoGuidance};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tracks shorter than this cannot define a direction.
pub const MIN_TRACK_LENGTH_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Steer along the infinite line through `a` and `b`.
///
/// The line may be driven either way. If the vehicle faces against `a -> b` the goal point is
/// placed back towards `a`, while the cross track error keeps its sign relative to `a -> b`.
pub fn line_guidance(
    pose: &VehiclePose,
    a: &Point,
    b: &Point,
    lookahead_m: f64,
    params: &GuidanceParams,
) -> Result<SteeringOutput, NoGuidance> {
    check_inputs(pose, lookahead_m, params)?;

    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return Err(NoGuidance::InvalidInput);
    }

    let ab = b - a;
    let len = ab.norm();
    if len < MIN_TRACK_LENGTH_M {
        return Err(NoGuidance::DegenerateLine);
    }
    let dir = ab / len;

    let p = pose.position();
    let rel = p - a;

    // Right of a -> b is a negative cross product
    let xte_m = -cross(&dir, &rel);
    let foot = a + dir * rel.dot(&dir);

    let same_direction = heading_to_unit(pose.heading_rad).dot(&dir) >= 0.0;
    let travel = if same_direction { dir } else { -dir };

    let goal = foot + travel * lookahead_m;

    Ok(pursue(pose, goal, lookahead_m, xte_m, same_direction, params))
}

/// Steer along a polyline.
///
/// The goal point is found by advancing along the curve's arc length from the point nearest the
/// vehicle. Closed curves wrap around, open curves apply `policy` when the advance passes an end.
pub fn curve_guidance(
    pose: &VehiclePose,
    points: &[CurvePoint],
    closed: bool,
    lookahead_m: f64,
    policy: EndPolicy,
    params: &GuidanceParams,
) -> Result<SteeringOutput, NoGuidance> {
    check_inputs(pose, lookahead_m, params)?;

    if points.len() < 2 {
        return Err(NoGuidance::CurveTooShort);
    }

    let mut path: Vec<Point> = points.iter().map(|c| c.position_m).collect();
    if !path.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        return Err(NoGuidance::InvalidInput);
    }
    if closed && path.len() > 2 {
        path.push(path[0]);
    }

    // Cumulative arc length at each vertex
    let mut arc = Vec::with_capacity(path.len());
    arc.push(0.0);
    for w in path.windows(2) {
        let prev = arc[arc.len() - 1];
        arc.push(prev + (w[1] - w[0]).norm());
    }

    let total_m = arc[arc.len() - 1];
    if total_m < MIN_TRACK_LENGTH_M {
        return Err(NoGuidance::CurveTooShort);
    }

    let p = pose.position();
    let (_, seg, t, dist) = match geom::nearest_on_polyline(&p, &path) {
        Some(n) => n,
        None => return Err(NoGuidance::CurveTooShort),
    };

    let seg_len = arc[seg + 1] - arc[seg];
    let seg_dir = if seg_len > MIN_TRACK_LENGTH_M {
        (path[seg + 1] - path[seg]) / seg_len
    } else {
        heading_to_unit(points[seg % points.len()].heading_rad)
    };

    let side = -cross(&seg_dir, &(p - path[seg]));
    let xte_m = if side < 0.0 { -dist } else { dist };

    let same_direction = heading_to_unit(pose.heading_rad).dot(&seg_dir) >= 0.0;

    let foot_s = arc[seg] + t * seg_len;
    let mut goal_s = if same_direction {
        foot_s + lookahead_m
    } else {
        foot_s - lookahead_m
    };

    if closed && path.len() > 3 {
        goal_s = goal_s.rem_euclid(total_m);
    } else if goal_s < 0.0 || goal_s > total_m {
        match policy {
            EndPolicy::Clamp => goal_s = clamp(&goal_s, &0.0, &total_m),
            EndPolicy::Report => return Err(NoGuidance::OffEndOfCurve),
        }
    }

    let goal = point_at_arc(&path, &arc, goal_s);

    Ok(pursue(pose, goal, lookahead_m, xte_m, same_direction, params))
}

fn check_inputs(
    pose: &VehiclePose,
    lookahead_m: f64,
    params: &GuidanceParams,
) -> Result<(), NoGuidance> {
    if !pose.is_finite() || !lookahead_m.is_finite() || lookahead_m < 0.0 || !params.is_valid() {
        Err(NoGuidance::InvalidInput)
    } else {
        Ok(())
    }
}

/// Point at arc length `s` along a path with cumulative lengths `arc`.
fn point_at_arc(path: &[Point], arc: &[f64], s: f64) -> Point {
    // First vertex strictly beyond s, the goal lies on the segment ending there
    let end = arc.partition_point(|&a| a <= s).clamp(1, path.len() - 1);
    let start = end - 1;

    let seg_len = arc[end] - arc[start];
    if seg_len < MIN_TRACK_LENGTH_M {
        return path[end];
    }

    let t = clamp(&((s - arc[start]) / seg_len), &0.0, &1.0);
    path[start] + (path[end] - path[start]) * t
}

/// Steer towards `goal`.
fn pursue(
    pose: &VehiclePose,
    goal: Point,
    lookahead_m: f64,
    xte_m: f64,
    same_direction: bool,
    params: &GuidanceParams,
) -> SteeringOutput {
    let to_goal = goal - pose.position();
    let goal_dist = to_goal.norm();

    let alpha_rad = if goal_dist < MIN_TRACK_LENGTH_M {
        0.0
    } else {
        wrap_pi(geom::heading_of(&to_goal) - pose.heading_rad)
    };

    // A zero lookahead puts the goal at the foot of the perpendicular, so steer on the actual
    // chord to it
    let chord_m = if lookahead_m > MIN_TRACK_LENGTH_M {
        lookahead_m
    } else {
        goal_dist
    };

    let curvature_m = if alpha_rad == 0.0 || chord_m < MIN_TRACK_LENGTH_M {
        0.0
    } else {
        2.0 * alpha_rad.sin() / chord_m
    };

    let max_rad = params.max_steer_angle_rad();
    let raw_rad = (curvature_m * params.wheelbase_m).atan();
    let steer_angle_rad = clamp(&raw_rad, &-max_rad, &max_rad);

    SteeringOutput {
        steer_angle_rad,
        xte_m,
        goal_point_m: goal,
        curvature_m,
        alpha_rad,
        lookahead_m,
        same_direction,
        saturated: steer_angle_rad != raw_rad,
    }
}
