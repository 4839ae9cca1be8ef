//! Great-circle helpers used by the in-memory store and input validation.
//!
//! PostGIS computes distances on the WGS84 spheroid; the haversine formula on the
//! mean earth radius stays within ~0.5% of it, which is fine for "what's close".

use crate::error::{AppError, AppResult};
use crate::types::Coordinates;

/// IUGG mean earth radius.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

impl Coordinates {
    /// Builds a point, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::validation("latitude", format!("must be within [-90, 90], got {}", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::validation(
                "longitude",
                format!("must be within [-180, 180], got {}", longitude),
            ));
        }
        Ok(Self { latitude, longitude })
    }
}

/// Haversine distance between two points in kilometers.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // clamp guards against h drifting above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Lat/lon rectangle enclosing every point within a radius of a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat = center.latitude.to_radians();
        let lon = center.longitude.to_radians();

        let mut min_lat = lat - angular;
        let mut max_lat = lat + angular;
        let (min_lon, max_lon);

        let pole = std::f64::consts::FRAC_PI_2;
        if min_lat > -pole && max_lat < pole {
            let delta_lon = (angular.sin() / lat.cos()).clamp(-1.0, 1.0).asin();
            min_lon = lon - delta_lon;
            max_lon = lon + delta_lon;
        } else {
            // A pole is inside the circle: every meridian qualifies.
            min_lat = min_lat.max(-pole);
            max_lat = max_lat.min(pole);
            min_lon = -std::f64::consts::PI;
            max_lon = std::f64::consts::PI;
        }

        Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            min_lon: min_lon.to_degrees(),
            max_lon: max_lon.to_degrees(),
        }
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        if point.latitude < self.min_lat || point.latitude > self.max_lat {
            return false;
        }
        if self.min_lon < -180.0 {
            // wraps across the antimeridian on the west side
            point.longitude >= self.min_lon + 360.0 || point.longitude <= self.max_lon
        } else if self.max_lon > 180.0 {
            point.longitude >= self.min_lon || point.longitude <= self.max_lon - 360.0
        } else {
            point.longitude >= self.min_lon && point.longitude <= self.max_lon
        }
    }
}
