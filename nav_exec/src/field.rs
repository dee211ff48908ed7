//! # Field boundaries
//!
//! A field is an outer boundary ring with optional islands (areas inside the outer ring which are
//! never worked, like ponds or pylons).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::{self, Bounds, Point};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Rings with an absolute area below this are rejected as degenerate.
pub const MIN_RING_AREA_M2: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A closed boundary ring of at least three points.
///
/// The winding is preserved as given, use [`Boundary::is_anticlockwise`] to query it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    points: Vec<Point>,
    bounds: Bounds,
}

/// A field made of an outer boundary and its islands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub outer: Boundary,
    pub islands: Vec<Boundary>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundaryError {
    #[error("A boundary needs at least 3 points, found {0}")]
    TooFewPoints(usize),

    #[error("The boundary contains a non-finite coordinate")]
    NonFinite,

    #[error("The boundary encloses no area")]
    ZeroArea,

    #[error("Island {0} is invalid: {1}")]
    InvalidIsland(usize, Box<BoundaryError>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Boundary {
    /// Create a new boundary, dropping a repeated closing point if present.
    pub fn new(mut points: Vec<Point>) -> Result<Self, BoundaryError> {
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(BoundaryError::NonFinite);
        }

        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.len() < 3 {
            return Err(BoundaryError::TooFewPoints(points.len()));
        }

        if geom::signed_area(&points).abs() < MIN_RING_AREA_M2 {
            return Err(BoundaryError::ZeroArea);
        }

        let bounds = Bounds::from_points(&points).ok_or(BoundaryError::TooFewPoints(0))?;

        Ok(Self { points, bounds })
    }

    /// Create a boundary from `[easting, northing]` pairs.
    pub fn from_coords(coords: &[[f64; 2]]) -> Result<Self, BoundaryError> {
        Self::new(coords.iter().map(|c| Point::new(c[0], c[1])).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn is_anticlockwise(&self) -> bool {
        geom::signed_area(&self.points) > 0.0
    }

    /// Enclosed area, always positive.
    pub fn area(&self) -> f64 {
        geom::signed_area(&self.points).abs()
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.bounds.contains(p) && geom::point_in_ring(p, &self.points)
    }
}

impl Field {
    /// Build a field from `[easting, northing]` coordinates.
    pub fn from_coords(outer: &[[f64; 2]], islands: &[Vec<[f64; 2]>]) -> Result<Self, BoundaryError> {
        let outer = Boundary::from_coords(outer)?;

        let islands = islands
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Boundary::from_coords(c).map_err(|e| BoundaryError::InvalidIsland(i, Box::new(e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { outer, islands })
    }

    /// Returns `true` if `p` is inside the outer ring and outside every island.
    pub fn contains(&self, p: &Point) -> bool {
        self.outer.contains(p) && !self.islands.iter().any(|i| i.contains(p))
    }

    /// Workable area of the field.
    pub fn area(&self) -> f64 {
        self.outer.area() - self.islands.iter().map(|i| i.area()).sum::<f64>()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_boundary_validation() {
        assert_eq!(
            Boundary::from_coords(&[[0.0, 0.0], [1.0, 0.0]]),
            Err(BoundaryError::TooFewPoints(2))
        );
        assert_eq!(
            Boundary::from_coords(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]),
            Err(BoundaryError::ZeroArea)
        );
        assert_eq!(
            Boundary::from_coords(&[[0.0, 0.0], [1.0, f64::NAN], [2.0, 0.0]]),
            Err(BoundaryError::NonFinite)
        );

        // Closing point is dropped
        let b = Boundary::from_coords(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]])
            .unwrap();
        assert_eq!(b.points().len(), 3);
        assert!(b.is_anticlockwise());
        assert_eq!(b.area(), 50.0);
    }

    #[test]
    fn test_field_contains() {
        let field = Field::from_coords(
            &[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]],
            &[vec![[40.0, 40.0], [60.0, 40.0], [60.0, 60.0], [40.0, 60.0]]],
        )
        .unwrap();

        assert!(field.contains(&Point::new(10.0, 10.0)));
        assert!(!field.contains(&Point::new(50.0, 50.0)));
        assert!(!field.contains(&Point::new(150.0, 50.0)));
        assert_eq!(field.area(), 9600.0);

        assert!(matches!(
            Field::from_coords(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]], &[vec![[0.0, 0.0]]]),
            Err(BoundaryError::InvalidIsland(0, _))
        ));
    }
}
