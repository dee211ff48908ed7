//! Headland geometry parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest accepted densify spacing.
///
/// Units: meters
pub const MIN_DENSIFY_SPACING_M: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for boundary offsetting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlandParams {
    /// Boundaries are densified so no edge is longer than this before an inward offset.
    ///
    /// Units: meters
    pub densify_spacing_m: f64,

    /// Offset points closer than this to the previous accepted point are dropped.
    ///
    /// Units: meters
    pub min_point_spacing_m: f64,

    /// Largest angle turned between two points of a round join or cap.
    ///
    /// Units: degrees
    pub round_join_step_deg: f64,

    /// Miter joins reaching further than this many offsets from the corner are cut back.
    pub miter_limit: f64,

    /// Buffer points within this fraction of the offset from the target distance are kept by
    /// the open line offset.
    pub line_offset_tolerance: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadlandParams {
    /// Check every length is positive and finite, so densifying and joins are bounded.
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        positive(self.densify_spacing_m)
            && self.densify_spacing_m >= MIN_DENSIFY_SPACING_M
            && self.min_point_spacing_m.is_finite()
            && self.min_point_spacing_m >= 0.0
            && positive(self.round_join_step_deg)
            && self.round_join_step_deg <= 90.0
            && positive(self.miter_limit)
            && positive(self.line_offset_tolerance)
    }
}

impl Default for HeadlandParams {
    fn default() -> Self {
        Self {
            densify_spacing_m: 1.0,
            min_point_spacing_m: 0.5,
            round_join_step_deg: 10.0,
            miter_limit: 2.0,
            line_offset_tolerance: 0.5,
        }
    }
}
