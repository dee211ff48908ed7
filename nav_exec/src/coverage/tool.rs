//! Rigid tool and section geometry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::{self, Point};
use crate::loc::VehiclePose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a rigidly mounted tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParams {
    /// Total working width.
    ///
    /// Units: meters
    pub width_m: f64,

    /// Number of equal width sections the tool is split into.
    pub num_sections: usize,

    /// Distance of the tool's working edge ahead of the vehicle's reference point, negative for
    /// rear mounted tools.
    ///
    /// Units: meters
    pub hitch_length_m: f64,

    /// Sideways offset of the tool's centre, positive to the right.
    ///
    /// Units: meters
    #[serde(default)]
    pub lateral_offset_m: f64,

    /// How far ahead in time the switch-on edge is projected.
    ///
    /// Units: seconds
    pub look_ahead_on_s: f64,

    /// How far ahead in time the switch-off edge is projected.
    ///
    /// Units: seconds
    pub look_ahead_off_s: f64,
}

/// The edges of one section for a single pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionGeometry {
    /// Left end of the working edge.
    pub left: Point,

    /// Right end of the working edge.
    pub right: Point,

    pub look_on_left: Point,
    pub look_on_right: Point,

    pub look_off_left: Point,
    pub look_off_right: Point,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ToolParams {
    fn default() -> Self {
        Self {
            width_m: 6.0,
            num_sections: 3,
            hitch_length_m: -1.5,
            lateral_offset_m: 0.0,
            look_ahead_on_s: 1.0,
            look_ahead_off_s: 0.5,
        }
    }
}

impl ToolParams {
    pub fn is_valid(&self) -> bool {
        self.width_m.is_finite()
            && self.width_m > 0.0
            && self.num_sections > 0
            && self.hitch_length_m.is_finite()
            && self.lateral_offset_m.is_finite()
            && self.look_ahead_on_s >= 0.0
            && self.look_ahead_off_s >= 0.0
    }

    pub fn section_width_m(&self) -> f64 {
        self.width_m / self.num_sections as f64
    }

    /// Geometry of every section for the given pose and speed, ordered left to right.
    ///
    /// Look-ahead edges are not projected when reversing.
    pub fn sections(&self, pose: &VehiclePose, speed_ms: f64) -> Vec<SectionGeometry> {
        let d = geom::heading_to_unit(pose.heading_rad);
        let r = geom::right_perp(pose.heading_rad);

        let centre = pose.position() + d * self.hitch_length_m + r * self.lateral_offset_m;
        let left_end = centre - r * (0.5 * self.width_m);

        let speed_ms = if speed_ms.is_finite() { speed_ms.max(0.0) } else { 0.0 };
        let on = d * (speed_ms * self.look_ahead_on_s);
        let off = d * (speed_ms * self.look_ahead_off_s);

        let section_width_m = self.section_width_m();

        (0..self.num_sections)
            .map(|i| {
                let left = left_end + r * (section_width_m * i as f64);
                let right = left_end + r * (section_width_m * (i + 1) as f64);

                SectionGeometry {
                    left,
                    right,
                    look_on_left: left + on,
                    look_on_right: right + on,
                    look_off_left: left + off,
                    look_off_right: right + off,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_sections_driving_north() {
        let params = ToolParams {
            width_m: 6.0,
            num_sections: 3,
            hitch_length_m: -2.0,
            lateral_offset_m: 0.0,
            look_ahead_on_s: 1.0,
            look_ahead_off_s: 0.5,
        };

        let s = params.sections(&VehiclePose::new(10.0, 10.0, 0.0), 2.0);
        assert_eq!(s.len(), 3);

        // Left to right is west to east
        assert!((s[0].left - Point::new(7.0, 8.0)).norm() < 1e-12);
        assert!((s[0].right - Point::new(9.0, 8.0)).norm() < 1e-12);
        assert!((s[2].right - Point::new(13.0, 8.0)).norm() < 1e-12);

        assert!((s[1].look_on_left - Point::new(9.0, 10.0)).norm() < 1e-12);
        assert!((s[1].look_off_right - Point::new(11.0, 9.0)).norm() < 1e-12);
    }

    #[test]
    fn test_sections_with_offset_and_reversing() {
        let params = ToolParams {
            width_m: 4.0,
            num_sections: 1,
            hitch_length_m: 0.0,
            lateral_offset_m: 1.0,
            look_ahead_on_s: 1.0,
            look_ahead_off_s: 1.0,
        };

        // Facing east the right of the tool is south
        let s = params.sections(&VehiclePose::new(0.0, 0.0, FRAC_PI_2), -3.0);
        assert!((s[0].left - Point::new(0.0, 1.0)).norm() < 1e-12);
        assert!((s[0].right - Point::new(0.0, -3.0)).norm() < 1e-12);
        assert_eq!(s[0].look_on_left, s[0].left);
    }

    #[test]
    fn test_param_validation() {
        assert!(ToolParams::default().is_valid());
        assert!(!ToolParams { num_sections: 0, ..Default::default() }.is_valid());
        assert!(!ToolParams { width_m: -1.0, ..Default::default() }.is_valid());
    }
}
