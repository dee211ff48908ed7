//! # Localisation module
//!
//! The pose store is the single owner of the vehicle's position. It is fed raw sentences once per
//! tick, projects accepted fixes into the local plane and keeps the last good pose when a
//! sentence is rejected.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod local_plane;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use util::maths::wrap_2pi;

use crate::geom::Point;
use crate::sentence::{self, ParseStats, PositionFix, Sentence, SentenceError};

pub use self::local_plane::LocalPlane;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the localisation module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocParams {
    /// Origin of the local plane. If not given the first accepted fix is used.
    #[serde(default)]
    pub origin: Option<Wgs84Origin>,
}

/// A latitude/longitude used as the local plane origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wgs84Origin {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// The vehicle's pose in the local plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehiclePose {
    pub easting_m: f64,
    pub northing_m: f64,

    /// Heading clockwise from north in [0, 2pi).
    pub heading_rad: f64,
}

/// Holds the latest fix and the pose derived from it.
#[derive(Debug, Default)]
pub struct PoseStore {
    plane: Option<LocalPlane>,
    fix: Option<PositionFix>,
    pose: Option<VehiclePose>,
    stats: ParseStats,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What a successfully parsed sentence did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The fix was accepted and the pose updated.
    PoseUpdated,

    /// The fix was stored but has no position solution, the pose is unchanged.
    NoPosition,

    /// The sentence is not a position sentence, nothing changed.
    Unsupported,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehiclePose {
    pub fn new(easting_m: f64, northing_m: f64, heading_rad: f64) -> Self {
        Self {
            easting_m,
            northing_m,
            heading_rad: wrap_2pi(heading_rad),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.easting_m, self.northing_m)
    }

    pub fn is_finite(&self) -> bool {
        self.easting_m.is_finite() && self.northing_m.is_finite() && self.heading_rad.is_finite()
    }
}

impl PoseStore {
    pub fn new(params: &LocParams) -> Self {
        Self {
            plane: params
                .origin
                .map(|o| LocalPlane::new(o.latitude_deg, o.longitude_deg)),
            ..Default::default()
        }
    }

    /// Parse one sentence and update the store from it.
    ///
    /// On error the previously stored fix and pose are kept.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<IngestOutcome, SentenceError> {
        let result = sentence::parse(bytes);
        self.stats.record(&result);

        match result {
            Ok(Sentence::Fix(fix)) => Ok(self.update(fix)),
            Ok(Sentence::Unsupported { id }) => {
                trace!("Ignoring unsupported sentence {:?}", String::from_utf8_lossy(id));
                Ok(IngestOutcome::Unsupported)
            }
            Err(e) => {
                warn!("Rejected sentence: {}", e);
                Err(e)
            }
        }
    }

    /// Store an already parsed fix.
    pub fn update(&mut self, mut fix: PositionFix) -> IngestOutcome {
        if !fix.has_valid_fix() {
            self.fix = Some(fix);
            return IngestOutcome::NoPosition;
        }

        let plane = match self.plane {
            Some(p) => p,
            None => {
                let p = LocalPlane::new(fix.latitude_deg, fix.longitude_deg);
                info!(
                    "Local plane origin set from first fix: {:.8}, {:.8}",
                    fix.latitude_deg, fix.longitude_deg
                );
                self.plane = Some(p);
                p
            }
        };

        let (easting_m, northing_m) = plane.to_local(fix.latitude_deg, fix.longitude_deg);
        fix.easting_m = easting_m;
        fix.northing_m = northing_m;

        self.fix = Some(fix);
        self.pose = Some(VehiclePose::new(easting_m, northing_m, fix.heading_deg.to_radians()));

        IngestOutcome::PoseUpdated
    }

    /// The latest fix, including fixes without a position solution.
    pub fn fix(&self) -> Option<&PositionFix> {
        self.fix.as_ref()
    }

    /// The latest valid pose.
    pub fn pose(&self) -> Option<&VehiclePose> {
        self.pose.as_ref()
    }

    pub fn plane(&self) -> Option<&LocalPlane> {
        self.plane.as_ref()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Speed over ground of the latest fix, zero if there is none.
    pub fn speed_ms(&self) -> f64 {
        self.fix.map_or(0.0, |f| f.speed_ms)
    }

    pub fn has_rtk_fix(&self) -> bool {
        self.fix.map_or(false, |f| f.has_rtk_fix())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sentence::test::{frame, PANDA_BODY};
    use crate::sentence::FixQuality;

    #[test]
    fn test_first_fix_sets_origin() {
        let mut store = PoseStore::new(&LocParams::default());
        assert!(store.pose().is_none());

        let s = frame(PANDA_BODY);
        assert_eq!(store.ingest(s.as_bytes()), Ok(IngestOutcome::PoseUpdated));

        let pose = *store.pose().unwrap();
        assert!(pose.easting_m.abs() < 1e-9);
        assert!(pose.northing_m.abs() < 1e-9);
        assert!((pose.heading_rad - 270.5f64.to_radians()).abs() < 1e-12);
        assert!(store.has_rtk_fix());
    }

    #[test]
    fn test_bad_checksum_keeps_pose() {
        let mut store = PoseStore::new(&LocParams {
            origin: Some(Wgs84Origin { latitude_deg: 48.0, longitude_deg: 11.5 }),
        });

        let s = frame(PANDA_BODY);
        store.ingest(s.as_bytes()).unwrap();
        let before = *store.pose().unwrap();
        let fix_before = *store.fix().unwrap();

        let corrupt = s.replacen("01131.000", "01131.500", 1);
        assert!(matches!(
            store.ingest(corrupt.as_bytes()),
            Err(SentenceError::ChecksumError { .. })
        ));

        assert_eq!(*store.pose().unwrap(), before);
        assert_eq!(*store.fix().unwrap(), fix_before);
        assert_eq!(store.stats().num_checksum_errors, 1);
        assert_eq!(store.stats().num_fixes, 1);

        // Position relative to the configured origin
        assert!(before.northing_m > 0.0);
        assert!(before.easting_m > 0.0);
    }

    #[test]
    fn test_no_fix_does_not_move_pose() {
        let mut store = PoseStore::new(&LocParams::default());
        store.ingest(frame(PANDA_BODY).as_bytes()).unwrap();
        let before = *store.pose().unwrap();

        let no_fix = frame(
            &PANDA_BODY
                .replacen(",E,4,", ",E,0,", 1)
                .replacen("4807.038", "4808.000", 1),
        );
        assert_eq!(store.ingest(no_fix.as_bytes()), Ok(IngestOutcome::NoPosition));
        assert_eq!(*store.pose().unwrap(), before);
        assert_eq!(store.fix().unwrap().quality, FixQuality::NoFix);
        assert!(!store.fix().unwrap().has_valid_fix());
        assert!(!store.has_rtk_fix());
    }

    #[test]
    fn test_unsupported_is_not_an_error() {
        let mut store = PoseStore::new(&LocParams::default());
        assert_eq!(
            store.ingest(frame("GPGSV,1,1,00").as_bytes()),
            Ok(IngestOutcome::Unsupported)
        );
        assert_eq!(store.stats().num_unsupported, 1);
        assert!(store.fix().is_none());
    }
}
