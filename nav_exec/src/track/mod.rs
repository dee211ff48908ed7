//! # Guidance tracks
//!
//! A track is either a straight AB line or a recorded curve. Tracks are values: editing a track
//! (for example nudging it sideways) produces a new track, the old one stays valid for whoever is
//! still reading it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod nudge;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::{self, Point};

pub use self::nudge::{nudge_curve, nudge_line};
pub use self::params::TrackParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on a curve with the local heading of the curve there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub position_m: Point,
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A guidance track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Track {
    /// Straight line through `a` and `b`, the defined direction is `a -> b`.
    Line { a: Point, b: Point },

    /// Polyline of at least two points.
    Curve { points: Vec<CurvePoint>, closed: bool },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("The AB line is {0:.3} m long, shorter than the minimum of {1:.3} m")]
    LineTooShort(f64, f64),

    #[error("A curve needs at least 2 distinct points, found {0}")]
    CurveTooShort(usize),

    #[error("The track contains a non-finite coordinate")]
    NonFinite,

    #[error("Nudging the curve by {0:.3} m left fewer than 2 points")]
    NudgeCollapsed(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Track {
    /// Create a validated AB line.
    pub fn line(a: Point, b: Point, params: &TrackParams) -> Result<Self, TrackError> {
        if !is_finite(&a) || !is_finite(&b) {
            return Err(TrackError::NonFinite);
        }

        let len = (b - a).norm();
        if len <= params.min_line_length_m {
            return Err(TrackError::LineTooShort(len, params.min_line_length_m));
        }

        Ok(Track::Line { a, b })
    }

    /// Create a validated curve from positions, deriving the heading of each point.
    ///
    /// Consecutive duplicate points are removed.
    pub fn curve(positions: &[Point], closed: bool) -> Result<Self, TrackError> {
        if !positions.iter().all(is_finite) {
            return Err(TrackError::NonFinite);
        }

        let mut cleaned: Vec<Point> = Vec::with_capacity(positions.len());
        for p in positions {
            if cleaned
                .last()
                .map_or(true, |last| (p - last).norm() > geom::LENGTH_EPSILON_M)
            {
                cleaned.push(*p);
            }
        }

        if closed && cleaned.len() > 2 {
            if let (Some(first), Some(last)) = (cleaned.first(), cleaned.last()) {
                if (first - last).norm() <= geom::LENGTH_EPSILON_M {
                    cleaned.pop();
                }
            }
        }

        if cleaned.len() < 2 {
            return Err(TrackError::CurveTooShort(cleaned.len()));
        }

        Ok(Track::Curve {
            points: with_headings(&cleaned, closed),
            closed,
        })
    }

    /// Build a track from the `[easting, northing]` pairs of a line command.
    pub fn from_line_coords(
        a: [f64; 2],
        b: [f64; 2],
        params: &TrackParams,
    ) -> Result<Self, TrackError> {
        Self::line(Point::new(a[0], a[1]), Point::new(b[0], b[1]), params)
    }

    /// Build a track from the `[easting, northing]` pairs of a curve command.
    pub fn from_curve_coords(coords: &[[f64; 2]], closed: bool) -> Result<Self, TrackError> {
        let positions: Vec<Point> = coords.iter().map(|c| Point::new(c[0], c[1])).collect();
        Self::curve(&positions, closed)
    }

    /// A copy of this track shifted sideways by `offset_m`, positive to the right.
    pub fn nudged(&self, offset_m: f64, params: &TrackParams) -> Result<Self, TrackError> {
        if !offset_m.is_finite() {
            return Err(TrackError::NonFinite);
        }

        match self {
            Track::Line { a, b } => {
                let (a, b) = nudge_line(a, b, offset_m);
                Ok(Track::Line { a, b })
            }
            Track::Curve { points, closed } => {
                let nudged = nudge_curve(points, *closed, offset_m, params);

                if nudged.len() < 2 {
                    Err(TrackError::NudgeCollapsed(offset_m))
                } else {
                    Ok(Track::Curve {
                        points: nudged,
                        closed: *closed,
                    })
                }
            }
        }
    }

    /// Positions of the track's defining points.
    pub fn positions(&self) -> Vec<Point> {
        match self {
            Track::Line { a, b } => vec![*a, *b],
            Track::Curve { points, .. } => points.iter().map(|p| p.position_m).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Attach neighbour derived headings to positions.
pub(crate) fn with_headings(positions: &[Point], closed: bool) -> Vec<CurvePoint> {
    let headings = if closed && positions.len() > 2 {
        geom::ring_headings(positions)
    } else {
        geom::polyline_headings(positions)
    };

    positions
        .iter()
        .zip(headings)
        .map(|(p, h)| CurvePoint {
            position_m: *p,
            heading_rad: h,
        })
        .collect()
}

fn is_finite(p: &Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
