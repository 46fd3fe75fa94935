//! Geodesic helpers.
//!
//! Platform-agnostic distance and bearing calculations between WGS84
//! coordinates (lat/lng in degrees). Nothing here validates input:
//! NaN or out-of-range values propagate into the result.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Earth radius in meters used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A timestamped fix from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl PositionSample {
    pub fn new(lat: f64, lng: f64, timestamp_ms: i64) -> Self {
        Self {
            coordinate: Coordinate::new(lat, lng),
            timestamp_ms,
        }
    }

    /// Stamp a coordinate with the current wall-clock time.
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            timestamp_ms: now_ms(),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Haversine distance between two coordinates in meters.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Coordinate reached by travelling `meters` due east along the parallel
/// of `origin`. Used to lay out test routes with exact spacing.
#[cfg(test)]
pub(crate) fn offset_east(origin: &Coordinate, meters: f64) -> Coordinate {
    let dlng = (meters / (EARTH_RADIUS_M * origin.lat.to_radians().cos())).to_degrees();
    Coordinate::new(origin.lat, origin.lng + dlng)
}
