//! # Guidance module
//!
//! Pure pursuit guidance along the active track. [`GuidanceCtrl`] wraps the pure functions in
//! [`pure_pursuit`] as a cyclic module: it scales the lookahead with speed, picks the variant for
//! the track and archives every output.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod pure_pursuit;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::Arc;

use log::{debug, trace};
use nav_if::out::SteeringOutput;
use serde::{Deserialize, Serialize};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// Internal
use crate::loc::VehiclePose;
use crate::track::Track;

pub use self::params::GuidanceParams;
pub use self::pure_pursuit::{curve_guidance, line_guidance};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guidance module state
#[derive(Default)]
pub struct GuidanceCtrl {
    params: GuidanceParams,

    report: StatusReport,
    output: Option<SteeringOutput>,

    arch: Archiver,
}

/// Input data to guidance.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// The latest pose, `None` until the first fix.
    pub pose: Option<VehiclePose>,

    /// Speed over ground.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// The active track from the current field snapshot.
    pub track: Option<Arc<Track>>,
}

/// Status report for guidance processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Why no steering demand was produced this cycle, if it wasn't.
    pub no_guidance: Option<NoGuidance>,

    /// The speed scaled lookahead used this cycle.
    pub lookahead_m: f64,

    /// The steer demand hit the steer limit.
    pub steer_limited: bool,
}

/// Flat archive record of one guidance cycle.
#[derive(Serialize)]
struct GuidanceRecord {
    time_s: f64,
    active: bool,
    steer_angle_deg: f64,
    xte_m: f64,
    goal_easting_m: f64,
    goal_northing_m: f64,
    alpha_deg: f64,
    lookahead_m: f64,
    same_direction: bool,
    steer_limited: bool,
    no_guidance: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Behaviour when the lookahead runs past the end of an open curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndPolicy {
    /// Steer towards the last point of the curve.
    Clamp,

    /// Stop producing guidance.
    Report,
}

/// Reasons guidance could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum NoGuidance {
    #[error("The AB line's points are coincident")]
    DegenerateLine,

    #[error("The curve has fewer than 2 points or zero length")]
    CurveTooShort,

    #[error("The lookahead point is past the end of the curve")]
    OffEndOfCurve,

    #[error("The pose, lookahead or parameters are invalid")]
    InvalidInput,

    #[error("No track is active")]
    NoTrack,

    #[error("No pose is available")]
    NoPose,
}

#[derive(Debug, thiserror::Error)]
pub enum GuidanceError {
    #[error("Invalid guidance parameters: {0:?}")]
    InvalidParams(GuidanceParams),

    #[error("Could not open the guidance archive: {0}")]
    ArchiveError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for EndPolicy {
    fn default() -> Self {
        EndPolicy::Clamp
    }
}

impl State for GuidanceCtrl {
    type InitData = GuidanceParams;
    type InitError = GuidanceError;

    type InputData = InputData;
    type OutputData = Option<SteeringOutput>;
    type StatusReport = StatusReport;
    type ProcError = NoGuidance;

    /// Initialise the guidance module.
    ///
    /// If a session is given guidance output is archived to `guidance.csv`.
    fn init(&mut self, init_data: Self::InitData, session: Option<&Session>)
        -> Result<(), Self::InitError>
    {
        if !init_data.is_valid() {
            return Err(GuidanceError::InvalidParams(init_data));
        }

        self.params = init_data;

        if let Some(session) = session {
            self.arch = Archiver::from_path(session, "guidance.csv")
                .map_err(GuidanceError::ArchiveError)?;
        }

        debug!("Guidance initialised with {:?}", self.params);

        Ok(())
    }

    /// Compute the steering demand for this cycle.
    ///
    /// A missing pose or track is not an error, the output is simply `None` with the reason in
    /// the status report. Errors are only returned for numerically unusable inputs.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();
        self.output = None;

        let lookahead_m = self.params.lookahead_for_speed(input_data.speed_ms);
        self.report.lookahead_m = lookahead_m;

        let pose = match input_data.pose {
            Some(p) => p,
            None => {
                self.report.no_guidance = Some(NoGuidance::NoPose);
                return Ok((None, self.report));
            }
        };

        let result = match input_data.track.as_deref() {
            Some(Track::Line { a, b }) => line_guidance(&pose, a, b, lookahead_m, &self.params),
            Some(Track::Curve { points, closed }) => curve_guidance(
                &pose,
                points,
                *closed,
                lookahead_m,
                self.params.end_policy,
                &self.params,
            ),
            None => Err(NoGuidance::NoTrack),
        };

        match result {
            Ok(out) => {
                trace!(
                    "Guidance: steer {:.2} deg, xte {:.3} m",
                    out.steer_angle_deg(),
                    out.xte_m
                );
                self.report.steer_limited = out.saturated;
                self.output = Some(out);
                Ok((self.output, self.report))
            }
            Err(NoGuidance::InvalidInput) => {
                self.report.no_guidance = Some(NoGuidance::InvalidInput);
                Err(NoGuidance::InvalidInput)
            }
            Err(reason) => {
                trace!("No guidance: {}", reason);
                self.report.no_guidance = Some(reason);
                Ok((None, self.report))
            }
        }
    }
}

impl Archived for GuidanceCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let out = self.output;
        let record = GuidanceRecord {
            time_s: session::get_elapsed_seconds(),
            active: out.is_some(),
            steer_angle_deg: out.map_or(0.0, |o| o.steer_angle_deg()),
            xte_m: out.map_or(0.0, |o| o.xte_m),
            goal_easting_m: out.map_or(0.0, |o| o.goal_point_m.x),
            goal_northing_m: out.map_or(0.0, |o| o.goal_point_m.y),
            alpha_deg: out.map_or(0.0, |o| o.alpha_rad.to_degrees()),
            lookahead_m: self.report.lookahead_m,
            same_direction: out.map_or(true, |o| o.same_direction),
            steer_limited: self.report.steer_limited,
            no_guidance: self
                .report
                .no_guidance
                .map_or(String::new(), |r| format!("{:?}", r)),
        };

        self.arch.serialise(record)
    }
}

impl GuidanceCtrl {
    pub fn params(&self) -> &GuidanceParams {
        &self.params
    }

    /// The output of the last cycle.
    pub fn output(&self) -> Option<&SteeringOutput> {
        self.output.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Point;
    use crate::track::TrackParams;

    fn line_track() -> Arc<Track> {
        Arc::new(
            Track::line(Point::new(0.0, 0.0), Point::new(0.0, 100.0), &TrackParams::default())
                .unwrap(),
        )
    }

    #[test]
    fn test_ctrl_without_pose_or_track() {
        let mut ctrl = GuidanceCtrl::default();
        ctrl.init(GuidanceParams::default(), None).unwrap();

        let (out, report) = ctrl.proc(&InputData::default()).unwrap();
        assert!(out.is_none());
        assert_eq!(report.no_guidance, Some(NoGuidance::NoPose));

        let (out, report) = ctrl
            .proc(&InputData {
                pose: Some(VehiclePose::new(0.0, 0.0, 0.0)),
                ..Default::default()
            })
            .unwrap();
        assert!(out.is_none());
        assert_eq!(report.no_guidance, Some(NoGuidance::NoTrack));
    }

    #[test]
    fn test_ctrl_scales_lookahead() {
        let mut ctrl = GuidanceCtrl::default();
        ctrl.init(GuidanceParams::default(), None).unwrap();

        let (out, report) = ctrl
            .proc(&InputData {
                pose: Some(VehiclePose::new(1.0, 20.0, 0.0)),
                speed_ms: 4.0,
                track: Some(line_track()),
            })
            .unwrap();

        let out = out.unwrap();
        assert!((report.lookahead_m - 6.0).abs() < 1e-12);
        assert!((out.goal_point_m - Point::new(0.0, 26.0)).norm() < 1e-9);
        assert!(ctrl.output().is_some());
    }

    #[test]
    fn test_ctrl_rejects_invalid_params() {
        let mut ctrl = GuidanceCtrl::default();
        let params = GuidanceParams {
            wheelbase_m: 0.0,
            ..Default::default()
        };

        assert!(matches!(
            ctrl.init(params, None),
            Err(GuidanceError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_ctrl_invalid_pose_is_an_error() {
        let mut ctrl = GuidanceCtrl::default();
        ctrl.init(GuidanceParams::default(), None).unwrap();

        let result = ctrl.proc(&InputData {
            pose: Some(VehiclePose::new(f64::INFINITY, 0.0, 0.0)),
            speed_ms: 1.0,
            track: Some(line_track()),
        });

        assert_eq!(result.map(|(o, _)| o), Err(NoGuidance::InvalidInput));
    }
}
