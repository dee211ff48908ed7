//! Flat earth projection between WGS84 and the local plane.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A local tangent plane about an origin.
///
/// Accurate to centimetres over the few kilometres a field spans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalPlane {
    origin_lat_deg: f64,
    origin_lon_deg: f64,
    m_per_deg_lat: f64,
    m_per_deg_lon: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocalPlane {
    pub fn new(origin_lat_deg: f64, origin_lon_deg: f64) -> Self {
        let phi = origin_lat_deg.to_radians();

        // WGS84 series for the length of a degree at latitude phi
        let m_per_deg_lat = 111_132.92 - 559.82 * (2.0 * phi).cos() + 1.175 * (4.0 * phi).cos()
            - 0.0023 * (6.0 * phi).cos();
        let m_per_deg_lon =
            111_412.84 * phi.cos() - 93.5 * (3.0 * phi).cos() + 0.118 * (5.0 * phi).cos();

        Self {
            origin_lat_deg,
            origin_lon_deg,
            m_per_deg_lat,
            m_per_deg_lon,
        }
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_lat_deg, self.origin_lon_deg)
    }

    /// Project a latitude/longitude to `(easting, northing)`.
    pub fn to_local(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        (
            (lon_deg - self.origin_lon_deg) * self.m_per_deg_lon,
            (lat_deg - self.origin_lat_deg) * self.m_per_deg_lat,
        )
    }

    /// Convert `(easting, northing)` back to `(latitude, longitude)`.
    pub fn to_wgs84(&self, easting_m: f64, northing_m: f64) -> (f64, f64) {
        (
            self.origin_lat_deg + northing_m / self.m_per_deg_lat,
            self.origin_lon_deg + easting_m / self.m_per_deg_lon,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_degree_lengths() {
        let equator = LocalPlane::new(0.0, 0.0);
        let (e, n) = equator.to_local(1.0, 1.0);
        assert!((n - 110_574.0).abs() < 5.0);
        assert!((e - 111_320.0).abs() < 5.0);

        let north = LocalPlane::new(60.0, 0.0);
        let (e, _) = north.to_local(60.0, 1.0);
        assert!((e - 55_800.0).abs() < 50.0);
    }

    #[test]
    fn test_round_trip() {
        let plane = LocalPlane::new(48.1173, 11.5167);
        let (e, n) = plane.to_local(48.1183, 11.5150);
        let (lat, lon) = plane.to_wgs84(e, n);
        assert!((lat - 48.1183).abs() < 1e-12);
        assert!((lon - 11.5150).abs() < 1e-12);
        assert!(n > 100.0 && n < 120.0);
        assert!(e < 0.0);
    }
}
