//! Guidance parameters
//!
//! The goal point lookahead is scaled with speed between two distance limits. The lookahead-on
//! and lookahead-off distances used to switch sections belong to the tool, see
//! `coverage::tool::ToolParams`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use util::maths::clamp;

// Internal
use super::EndPolicy;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for pure pursuit guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceParams {
    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Maximum steer angle either side of straight ahead.
    ///
    /// Units: degrees
    pub max_steer_angle_deg: f64,

    /// Time ahead of the vehicle at which the goal point is placed.
    ///
    /// Units: seconds
    pub lookahead_time_s: f64,

    /// Lookahead used at low speed and standstill.
    ///
    /// Units: meters
    pub min_lookahead_m: f64,

    /// Upper limit on the speed scaled lookahead.
    ///
    /// Units: meters
    pub max_lookahead_m: f64,

    /// What to do when the goal point runs past the end of an open curve.
    #[serde(default)]
    pub end_policy: EndPolicy,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuidanceParams {
    pub fn max_steer_angle_rad(&self) -> f64 {
        self.max_steer_angle_deg.to_radians()
    }

    /// Speed scaled lookahead distance.
    ///
    /// Reversing uses the magnitude of the speed.
    pub fn lookahead_for_speed(&self, speed_ms: f64) -> f64 {
        let raw = if speed_ms.is_finite() {
            speed_ms.abs() * self.lookahead_time_s
        } else {
            0.0
        };

        clamp(&raw, &self.min_lookahead_m, &self.max_lookahead_m.max(self.min_lookahead_m))
    }

    /// Check the parameters describe a physical vehicle.
    pub fn is_valid(&self) -> bool {
        self.wheelbase_m.is_finite()
            && self.wheelbase_m > 0.0
            && self.max_steer_angle_deg.is_finite()
            && self.max_steer_angle_deg > 0.0
            && self.max_steer_angle_deg < 90.0
            && self.lookahead_time_s.is_finite()
            && self.lookahead_time_s >= 0.0
            && self.min_lookahead_m.is_finite()
            && self.min_lookahead_m >= 0.0
            && self.max_lookahead_m.is_finite()
    }
}

impl Default for GuidanceParams {
    fn default() -> Self {
        Self {
            wheelbase_m: 2.5,
            max_steer_angle_deg: 35.0,
            lookahead_time_s: 1.5,
            min_lookahead_m: 2.0,
            max_lookahead_m: 12.0,
            end_policy: EndPolicy::default(),
        }
    }
}
