//! Headland detection for the tool and the vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nav_if::out::{HeadlandDetectionOutput, SectionHeadlandStatus};
use serde::{Deserialize, Serialize};

use crate::geom::{self, Point};

use super::tool::SectionGeometry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the headland proximity warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlandDetectParams {
    /// The warning turns on when the vehicle comes closer than this to the headland.
    ///
    /// Units: meters
    pub warning_distance_m: f64,

    /// The warning turns off again once the vehicle is this much further away than
    /// `warning_distance_m`.
    ///
    /// Units: meters
    pub hysteresis_m: f64,
}

/// Headland detector, holding the state of the proximity warning between ticks.
#[derive(Debug, Clone, Default)]
pub struct HeadlandDetector {
    params: HeadlandDetectParams,
    warning_active: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for HeadlandDetectParams {
    fn default() -> Self {
        Self {
            warning_distance_m: 20.0,
            hysteresis_m: 2.0,
        }
    }
}

impl HeadlandDetectParams {
    pub fn is_valid(&self) -> bool {
        self.warning_distance_m >= 0.0 && self.hysteresis_m >= 0.0
    }
}

impl HeadlandDetector {
    pub fn new(params: HeadlandDetectParams) -> Self {
        Self {
            params,
            warning_active: false,
        }
    }

    pub fn warning_active(&self) -> bool {
        self.warning_active
    }

    pub fn reset(&mut self) {
        self.warning_active = false;
    }

    /// Detect which parts of the tool are in the headland, and update the proximity warning.
    ///
    /// A point is in the headland when it is outside `headland_ring`, the inner edge of the
    /// headland. Without a ring nothing is in the headland and the warning is cleared.
    pub fn detect(
        &mut self,
        vehicle: &Point,
        headland_ring: Option<&[Point]>,
        sections: &[SectionGeometry],
    ) -> HeadlandDetectionOutput {
        let ring = match headland_ring {
            Some(r) if r.len() >= 3 => r,
            _ => {
                self.warning_active = false;
                return HeadlandDetectionOutput {
                    section_status: vec![SectionHeadlandStatus::default(); sections.len()],
                    ..Default::default()
                };
            }
        };

        let in_headland = |p: &Point| !geom::point_in_ring(p, ring);

        let section_status: Vec<SectionHeadlandStatus> = sections
            .iter()
            .map(|s| SectionHeadlandStatus {
                is_in_headland_area: in_headland(&s.left) && in_headland(&s.right),
                is_look_on_in_headland: in_headland(&s.look_on_left)
                    && in_headland(&s.look_on_right),
            })
            .collect();

        let is_left_side_in_headland = sections.first().map_or(false, |s| in_headland(&s.left));
        let is_right_side_in_headland = sections.last().map_or(false, |s| in_headland(&s.right));

        let nearest = geom::nearest_on_ring(vehicle, ring);
        let vehicle_inside = !in_headland(vehicle);

        if let Some((_, distance_m)) = nearest {
            self.update_warning(distance_m, vehicle_inside);
        }

        HeadlandDetectionOutput {
            is_tool_outer_points_in_headland: is_left_side_in_headland || is_right_side_in_headland,
            is_left_side_in_headland,
            is_right_side_in_headland,
            section_status,
            headland_nearest_point_m: nearest.map(|n| n.0),
            headland_distance_m: nearest.map(|n| n.1),
            should_trigger_warning: self.warning_active,
        }
    }

    fn update_warning(&mut self, distance_m: f64, vehicle_inside: bool) {
        let was_active = self.warning_active;

        if self.warning_active {
            if distance_m > self.params.warning_distance_m + self.params.hysteresis_m {
                self.warning_active = false;
            }
        } else if vehicle_inside && distance_m < self.params.warning_distance_m {
            self.warning_active = true;
        }

        if self.warning_active != was_active {
            debug!(
                "Headland warning {} at {:.2} m",
                if self.warning_active { "on" } else { "off" },
                distance_m
            );
        }
    }
}
