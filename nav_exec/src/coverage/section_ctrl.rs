//! Section control
//!
//! Decides which sections of the tool are on each tick, and records the area they work.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, trace};
use nav_if::out::{BoundaryResult, CoverageResult, HeadlandDetectionOutput};
use serde::{Deserialize, Serialize};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

use crate::geom::Point;
use crate::headland::FieldSnapshot;
use crate::loc::VehiclePose;

use super::{
    applied::AppliedArea,
    boundary::classify_segment,
    headland_detect::{HeadlandDetectParams, HeadlandDetector},
    tool::{SectionGeometry, ToolParams},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of section control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionCtrlParams {
    pub tool: ToolParams,

    #[serde(default)]
    pub headland: HeadlandDetectParams,

    /// Sections turn off once this fraction of their look-ahead edge is already covered.
    pub min_coverage: f64,

    /// How far below 1 coverage may be while still reported as fully covered.
    #[serde(default = "default_coverage_tolerance")]
    pub coverage_tolerance: f64,

    /// Turn sections off in the headland.
    #[serde(default = "default_headland_control")]
    pub headland_control: bool,

    /// Strips longer than this are not recorded, the pose has jumped.
    ///
    /// Units: meters
    pub max_strip_length_m: f64,
}

/// Section control module state
#[derive(Default)]
pub struct SectionCtrl {
    params: SectionCtrlParams,

    detector: HeadlandDetector,
    applied: AppliedArea,

    /// Working edges of the last tick, used to lay the strip worked since then.
    prev_edges: Option<Vec<(Point, Point)>>,

    output: SectionCtrlOutput,
    report: StatusReport,

    arch: Archiver,
}

/// Input data to section control.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// The latest pose, `None` until the first fix.
    pub pose: Option<VehiclePose>,

    /// Speed over ground.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// The field geometry to work against.
    pub snapshot: Arc<FieldSnapshot>,

    /// Forget all applied area before processing.
    pub reset_applied: bool,
}

/// Outputs of one section control cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionCtrlOutput {
    /// On state of each section, left to right.
    pub section_on: Vec<bool>,

    /// Field containment of each section's look-ahead-on edge.
    pub look_on_boundary: Vec<BoundaryResult>,

    /// Coverage of each section's look-ahead-on edge.
    pub look_on_coverage: Vec<CoverageResult>,

    /// Field containment of the whole tool's working edge.
    pub tool_boundary: Option<BoundaryResult>,

    /// Coverage of the whole tool's working edge.
    pub tool_coverage: CoverageResult,

    pub headland: HeadlandDetectionOutput,
}

/// Status report for section control processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub no_pose: bool,
    pub no_boundary: bool,
    pub num_sections_on: usize,

    /// A strip wasn't recorded because the pose jumped.
    pub strip_skipped: bool,

    pub num_patches: usize,
    pub applied_area_m2: f64,
}

/// Flat archive record of one section control cycle.
#[derive(Serialize)]
struct SectionRecord {
    time_s: f64,
    sections_on: String,
    tool_inside_pct: f64,
    tool_coverage_pct: f64,
    headland_distance_m: f64,
    headland_warning: bool,
    num_patches: usize,
    applied_area_m2: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SectionCtrlError {
    #[error("Invalid section control parameters: {0:?}")]
    InvalidParams(SectionCtrlParams),

    #[error("Could not open the section control archive: {0}")]
    ArchiveError(ArchiveError),

    #[error("The pose is not finite: {0:?}")]
    InvalidPose(VehiclePose),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SectionCtrlParams {
    fn default() -> Self {
        Self {
            tool: ToolParams::default(),
            headland: HeadlandDetectParams::default(),
            min_coverage: 0.5,
            coverage_tolerance: default_coverage_tolerance(),
            headland_control: true,
            max_strip_length_m: 10.0,
        }
    }
}

impl SectionCtrlParams {
    pub fn is_valid(&self) -> bool {
        self.tool.is_valid()
            && self.headland.is_valid()
            && (0.0..=1.0).contains(&self.min_coverage)
            && (0.0..1.0).contains(&self.coverage_tolerance)
            && self.max_strip_length_m > 0.0
    }
}

impl State for SectionCtrl {
    type InitData = SectionCtrlParams;
    type InitError = SectionCtrlError;

    type InputData = InputData;
    type OutputData = SectionCtrlOutput;
    type StatusReport = StatusReport;
    type ProcError = SectionCtrlError;

    /// Initialise section control.
    ///
    /// If a session is given outputs are archived to `section_ctrl.csv`.
    fn init(&mut self, init_data: Self::InitData, session: Option<&Session>)
        -> Result<(), Self::InitError>
    {
        if !init_data.is_valid() {
            return Err(SectionCtrlError::InvalidParams(init_data));
        }

        self.detector = HeadlandDetector::new(init_data.headland.clone());
        self.applied.clear();
        self.prev_edges = None;
        self.output = SectionCtrlOutput {
            section_on: vec![false; init_data.tool.num_sections],
            ..Default::default()
        };
        self.params = init_data;

        if let Some(session) = session {
            self.arch = Archiver::from_path(session, "section_ctrl.csv")
                .map_err(SectionCtrlError::ArchiveError)?;
        }

        debug!("Section control initialised with {:?}", self.params);

        Ok(())
    }

    /// Switch sections and record the worked area for this cycle.
    ///
    /// Without a pose all sections are turned off. Without a boundary sections are not limited
    /// by containment.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();

        if input_data.reset_applied {
            debug!("Clearing {} applied patches", self.applied.len());
            self.applied.clear();
            self.prev_edges = None;
        }

        let num_sections = self.params.tool.num_sections;

        let pose = match input_data.pose {
            Some(p) if p.is_finite() => p,
            Some(p) => return Err(SectionCtrlError::InvalidPose(p)),
            None => {
                self.report.no_pose = true;
                self.prev_edges = None;
                self.output = SectionCtrlOutput {
                    section_on: vec![false; num_sections],
                    ..Default::default()
                };
                self.fill_area_report();
                return Ok((self.output.clone(), self.report));
            }
        };

        let snapshot = &input_data.snapshot;
        let sections = self.params.tool.sections(&pose, input_data.speed_ms);

        let headland = self.detector.detect(&pose.position(), snapshot.headland_ring(), &sections);

        // Grown islands when a headland is set up, otherwise the islands themselves
        let holes: Vec<&[Point]> = match snapshot.field {
            Some(_) if !snapshot.island_rings.is_empty() => {
                snapshot.island_rings.iter().map(|r| r.as_slice()).collect()
            }
            Some(ref f) => f.islands.iter().map(|i| i.points()).collect(),
            None => Vec::new(),
        };
        let outer = snapshot.field.as_ref().map(|f| f.outer.points());
        self.report.no_boundary = outer.is_none();

        let classify = |p0: &Point, p1: &Point| match outer {
            Some(o) => classify_segment(p0, p1, o, &holes),
            None => BoundaryResult::FULLY_INSIDE,
        };

        let in_headland = |p0: &Point, p1: &Point| {
            snapshot
                .headland_ring()
                .map_or(false, |r| classify_segment(p0, p1, r, &[]).is_fully_outside)
        };

        let tol = self.params.coverage_tolerance;
        let mut section_on = self.output.section_on.clone();
        section_on.resize(num_sections, false);

        let mut look_on_boundary = Vec::with_capacity(num_sections);
        let mut look_on_coverage = Vec::with_capacity(num_sections);

        for (i, s) in sections.iter().enumerate() {
            let on_boundary = classify(&s.look_on_left, &s.look_on_right);
            let on_coverage = self.applied.coverage(&s.look_on_left, &s.look_on_right, tol);

            if section_on[i] {
                let off_boundary = classify(&s.look_off_left, &s.look_off_right);
                let off_coverage = self.applied.coverage(&s.look_off_left, &s.look_off_right, tol);

                let off = off_boundary.is_fully_outside
                    || (self.params.headland_control
                        && in_headland(&s.look_off_left, &s.look_off_right))
                    || off_coverage.coverage_pct >= self.params.min_coverage;

                if off {
                    trace!("Section {} off", i);
                    section_on[i] = false;
                }
            } else {
                let on = !on_boundary.is_fully_outside
                    && !(self.params.headland_control
                        && headland.section_status[i].is_look_on_in_headland)
                    && on_coverage.coverage_pct < self.params.min_coverage;

                if on {
                    trace!("Section {} on", i);
                    section_on[i] = true;
                }
            }

            look_on_boundary.push(on_boundary);
            look_on_coverage.push(on_coverage);
        }

        let tool_edge = tool_edge(&sections);
        let tool_boundary = tool_edge.map(|(l, r)| classify(&l, &r));
        let tool_coverage = tool_edge
            .map_or(CoverageResult::NONE, |(l, r)| self.applied.coverage(&l, &r, tol));

        self.lay_strips(&sections, &section_on);

        self.report.num_sections_on = section_on.iter().filter(|&&on| on).count();
        self.fill_area_report();

        self.output = SectionCtrlOutput {
            section_on,
            look_on_boundary,
            look_on_coverage,
            tool_boundary,
            tool_coverage,
            headland,
        };

        Ok((self.output.clone(), self.report))
    }
}

impl Archived for SectionCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let record = SectionRecord {
            time_s: session::get_elapsed_seconds(),
            sections_on: self
                .output
                .section_on
                .iter()
                .map(|&on| if on { '1' } else { '0' })
                .collect(),
            tool_inside_pct: self.output.tool_boundary.map_or(0.0, |b| b.inside_pct),
            tool_coverage_pct: self.output.tool_coverage.coverage_pct,
            headland_distance_m: self.output.headland.headland_distance_m.unwrap_or(f64::NAN),
            headland_warning: self.output.headland.should_trigger_warning,
            num_patches: self.report.num_patches,
            applied_area_m2: self.report.applied_area_m2,
        };

        self.arch.serialise(record)
    }
}

impl SectionCtrl {
    pub fn params(&self) -> &SectionCtrlParams {
        &self.params
    }

    pub fn applied(&self) -> &AppliedArea {
        &self.applied
    }

    /// The output of the last cycle.
    pub fn output(&self) -> &SectionCtrlOutput {
        &self.output
    }

    /// Record the strips worked by the sections that are on since the last cycle.
    fn lay_strips(&mut self, sections: &[SectionGeometry], section_on: &[bool]) {
        let edges: Vec<(Point, Point)> = sections.iter().map(|s| (s.left, s.right)).collect();

        if let Some(prev) = self.prev_edges.take() {
            let jumped = prev
                .iter()
                .zip(edges.iter())
                .any(|(p, c)| (c.0 - p.0).norm() > self.params.max_strip_length_m);

            if jumped {
                debug!("Pose jumped, not recording this strip");
                self.report.strip_skipped = true;
            } else {
                for (i, (p, c)) in prev.iter().zip(edges.iter()).enumerate() {
                    if section_on.get(i).copied().unwrap_or(false) {
                        self.applied.add_strip(p.0, p.1, c.0, c.1);
                    }
                }
            }
        }

        self.prev_edges = Some(edges);
    }

    fn fill_area_report(&mut self) {
        self.report.num_patches = self.applied.len();
        self.report.applied_area_m2 = self.applied.gross_area_m2();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_coverage_tolerance() -> f64 {
    0.001
}

fn default_headland_control() -> bool {
    true
}

/// Working edge of the whole tool, from its leftmost to its rightmost corner.
fn tool_edge(sections: &[SectionGeometry]) -> Option<(Point, Point)> {
    Some((sections.first()?.left, sections.last()?.right))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::Field;
    use crate::headland::HeadlandSpec;
    use nav_if::cmd::JoinStyle;

    fn params() -> SectionCtrlParams {
        SectionCtrlParams {
            tool: ToolParams {
                width_m: 6.0,
                num_sections: 2,
                hitch_length_m: 0.0,
                lateral_offset_m: 0.0,
                look_ahead_on_s: 1.0,
                look_ahead_off_s: 0.5,
            },
            headland: HeadlandDetectParams::default(),
            min_coverage: 0.5,
            coverage_tolerance: 0.001,
            headland_control: true,
            max_strip_length_m: 10.0,
        }
    }

    /// A 100 m square field with a headland ring 10 m inside it.
    fn snapshot() -> Arc<FieldSnapshot> {
        let field =
            Field::from_coords(&[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]], &[])
                .unwrap();

        Arc::new(FieldSnapshot {
            version: 1,
            field: Some(field),
            headland: Some(HeadlandSpec {
                pass_width_m: 10.0,
                num_passes: 1,
                join: JoinStyle::Round,
            }),
            headland_rings: vec![vec![
                Point::new(10.0, 10.0),
                Point::new(90.0, 10.0),
                Point::new(90.0, 90.0),
                Point::new(10.0, 90.0),
            ]],
            ..Default::default()
        })
    }

    fn input(easting_m: f64, northing_m: f64, snapshot: &Arc<FieldSnapshot>) -> InputData {
        InputData {
            pose: Some(VehiclePose::new(easting_m, northing_m, 0.0)),
            speed_ms: 2.0,
            snapshot: snapshot.clone(),
            reset_applied: false,
        }
    }

    fn ctrl() -> SectionCtrl {
        let mut ctrl = SectionCtrl::default();
        ctrl.init(params(), None).unwrap();
        ctrl
    }

    #[test]
    fn test_sections_on_in_field_and_record_area() {
        let snapshot = snapshot();
        let mut ctrl = ctrl();

        let (out, _) = ctrl.proc(&input(50.0, 30.0, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![true, true]);
        assert_eq!(out.tool_boundary, Some(BoundaryResult::FULLY_INSIDE));

        // Nothing is laid until the tool has moved
        assert!(ctrl.applied().is_empty());

        let (out, report) = ctrl.proc(&input(50.0, 32.0, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![true, true]);
        assert_eq!(report.num_patches, 2);
        assert!((report.applied_area_m2 - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_sections_off_in_headland() {
        let snapshot = snapshot();
        let mut ctrl = ctrl();

        ctrl.proc(&input(50.0, 80.0, &snapshot)).unwrap();

        // Look-off edge at 90.5 is fully beyond the headland ring
        let (out, _) = ctrl.proc(&input(50.0, 89.5, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![false, false]);

        // Driving on without headland control keeps working to the boundary
        let mut ctrl = SectionCtrl::default();
        ctrl.init(
            SectionCtrlParams {
                headland_control: false,
                ..params()
            },
            None,
        )
        .unwrap();
        let (out, _) = ctrl.proc(&input(50.0, 95.0, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![true, true]);

        // Off once the look-off edge leaves the field
        let (out, _) = ctrl.proc(&input(50.0, 99.5, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![false, false]);
    }

    #[test]
    fn test_only_uncovered_sections_turn_on() {
        let snapshot = snapshot();
        let mut ctrl = ctrl();

        // Work a pass from 30 to 50 north with the tool centred on 50 east, covering 47..53
        for i in 0..=10 {
            ctrl.proc(&input(50.0, 30.0 + 2.0 * i as f64, &snapshot)).unwrap();
        }

        // Drive back into the pass's area offset by half a tool width, left section on fresh
        // ground, right section over the worked strip
        ctrl.prev_edges = None;
        ctrl.output.section_on = vec![false, false];

        let (out, _) = ctrl.proc(&input(47.0, 35.0, &snapshot)).unwrap();
        assert_eq!(out.section_on, vec![true, false]);
        assert!(out.look_on_coverage[1].is_fully_covered);
        assert!(!out.look_on_coverage[0].has_any_overlap);

        // Half the tool's edge is over the worked strip
        assert!((out.tool_coverage.coverage_pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_pose_turns_sections_off_and_reset_clears_area() {
        let snapshot = snapshot();
        let mut ctrl = ctrl();

        ctrl.proc(&input(50.0, 30.0, &snapshot)).unwrap();
        ctrl.proc(&input(50.0, 32.0, &snapshot)).unwrap();
        assert!(!ctrl.applied().is_empty());

        let (out, report) = ctrl
            .proc(&InputData {
                snapshot: snapshot.clone(),
                ..Default::default()
            })
            .unwrap();
        assert!(report.no_pose);
        assert_eq!(out.section_on, vec![false, false]);

        let (_, report) = ctrl
            .proc(&InputData {
                reset_applied: true,
                ..input(50.0, 40.0, &snapshot)
            })
            .unwrap();
        assert_eq!(report.num_patches, 0);
        assert!(ctrl.applied().is_empty());
    }

    #[test]
    fn test_pose_jump_is_not_recorded() {
        let snapshot = snapshot();
        let mut ctrl = ctrl();

        ctrl.proc(&input(50.0, 30.0, &snapshot)).unwrap();
        let (_, report) = ctrl.proc(&input(50.0, 60.0, &snapshot)).unwrap();

        assert!(report.strip_skipped);
        assert_eq!(report.num_patches, 0);
    }

    #[test]
    fn test_no_boundary_and_invalid_inputs() {
        let mut ctrl = ctrl();

        let (out, report) = ctrl
            .proc(&input(1000.0, 1000.0, &Arc::new(FieldSnapshot::default())))
            .unwrap();
        assert!(report.no_boundary);
        assert_eq!(out.section_on, vec![true, true]);

        assert!(matches!(
            ctrl.proc(&InputData {
                pose: Some(VehiclePose::new(f64::NAN, 0.0, 0.0)),
                ..Default::default()
            }),
            Err(SectionCtrlError::InvalidPose(_))
        ));

        let mut ctrl = SectionCtrl::default();
        assert!(matches!(
            ctrl.init(SectionCtrlParams { min_coverage: 2.0, ..params() }, None),
            Err(SectionCtrlError::InvalidParams(_))
        ));
    }
}
