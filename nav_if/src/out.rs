//! # Navigation outputs
//!
//! Plain value types produced once per tick. Angles are in radians, distances in metres and
//! fractions in the range [0, 1]. Displays and steering controllers taking degrees use
//! [`SteeringOutput::steer_angle_deg`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fractions closer than this to 0 or 1 are treated as exactly 0 or 1 when classifying.
pub const FRACTION_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering demand from pure pursuit guidance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringOutput {
    /// Front wheel steer angle, positive turns right (clockwise seen from above).
    pub steer_angle_rad: f64,

    /// Signed distance from the track, positive when the vehicle is right of the track direction.
    pub xte_m: f64,

    /// The goal point the vehicle is steering towards.
    pub goal_point_m: Vector2<f64>,

    /// Path curvature demanded by pure pursuit before steer saturation.
    pub curvature_m: f64,

    /// Angle from the vehicle heading to the goal point.
    pub alpha_rad: f64,

    /// Lookahead distance used to place the goal point.
    pub lookahead_m: f64,

    /// True when the vehicle is driving the track in its defined direction.
    pub same_direction: bool,

    /// True when the steer demand was limited by the maximum steer angle.
    pub saturated: bool,
}

/// Classification of a segment against a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryResult {
    /// The entire segment is inside the boundary.
    pub is_fully_inside: bool,

    /// The entire segment is outside the boundary.
    pub is_fully_outside: bool,

    /// The segment crosses a boundary edge.
    pub crosses_boundary: bool,

    /// Fraction of the segment's length inside the boundary.
    pub inside_pct: f64,
}

/// Coverage of a segment by previously applied area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Fraction of the segment's length already covered.
    pub coverage_pct: f64,

    /// Any part of the segment is covered.
    pub has_any_overlap: bool,

    /// The segment is covered to within the coverage tolerance.
    pub is_fully_covered: bool,

    /// Length of the segment not yet covered.
    pub uncovered_length_m: f64,
}

/// Headland status of a single section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionHeadlandStatus {
    /// The section's leading corners are in the headland.
    pub is_in_headland_area: bool,

    /// The section's look-ahead-on corners are in the headland.
    pub is_look_on_in_headland: bool,
}

/// Result of headland detection for the whole tool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadlandDetectionOutput {
    /// Either of the tool's outermost corners is in the headland.
    pub is_tool_outer_points_in_headland: bool,

    /// The left end of the tool is in the headland.
    pub is_left_side_in_headland: bool,

    /// The right end of the tool is in the headland.
    pub is_right_side_in_headland: bool,

    /// Per-section status, ordered left to right.
    pub section_status: Vec<SectionHeadlandStatus>,

    /// Nearest point on the headland ring to the vehicle, if a headland exists.
    pub headland_nearest_point_m: Option<Vector2<f64>>,

    /// Distance to `headland_nearest_point_m`.
    pub headland_distance_m: Option<f64>,

    /// The proximity warning is active.
    pub should_trigger_warning: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteeringOutput {
    /// Front wheel steer angle in degrees, positive turns right.
    pub fn steer_angle_deg(&self) -> f64 {
        self.steer_angle_rad.to_degrees()
    }
}

impl BoundaryResult {
    /// The whole segment is inside.
    pub const FULLY_INSIDE: BoundaryResult = BoundaryResult {
        is_fully_inside: true,
        is_fully_outside: false,
        crosses_boundary: false,
        inside_pct: 1.0,
    };

    /// The whole segment is outside.
    pub const FULLY_OUTSIDE: BoundaryResult = BoundaryResult {
        is_fully_inside: false,
        is_fully_outside: true,
        crosses_boundary: false,
        inside_pct: 0.0,
    };

    /// Classify from the inside fraction of a segment.
    pub fn from_inside_pct(inside_pct: f64) -> Self {
        if inside_pct >= 1.0 - FRACTION_EPSILON {
            Self::FULLY_INSIDE
        } else if inside_pct <= FRACTION_EPSILON {
            Self::FULLY_OUTSIDE
        } else {
            Self {
                is_fully_inside: false,
                is_fully_outside: false,
                crosses_boundary: true,
                inside_pct,
            }
        }
    }
}

impl CoverageResult {
    /// Nothing covered.
    pub const NONE: CoverageResult = CoverageResult {
        coverage_pct: 0.0,
        has_any_overlap: false,
        is_fully_covered: false,
        uncovered_length_m: 0.0,
    };

    /// Build a result from a covered fraction of a segment of `length_m`.
    ///
    /// `tolerance` is how far below 1 the fraction may be and still count as fully covered.
    pub fn from_coverage_pct(coverage_pct: f64, length_m: f64, tolerance: f64) -> Self {
        let coverage_pct = coverage_pct.max(0.0).min(1.0);

        Self {
            coverage_pct,
            has_any_overlap: coverage_pct > FRACTION_EPSILON,
            is_fully_covered: coverage_pct >= 1.0 - tolerance,
            uncovered_length_m: (1.0 - coverage_pct) * length_m,
        }
    }
}

impl Default for CoverageResult {
    fn default() -> Self {
        Self::NONE
    }
}
