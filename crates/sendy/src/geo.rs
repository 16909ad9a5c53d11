//! Great-circle geometry.

use serde::{Deserialize, Serialize};

/// Earth's mean radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Statute miles per kilometre.
const MILES_PER_KM: f64 = 0.621_371;

/// Earth's mean radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = EARTH_RADIUS_KM * MILES_PER_KM;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to `other` in statute miles.
    #[must_use]
    pub fn distance_miles(&self, other: &Coordinates) -> f64 {
        haversine_miles(self, other)
    }
}

/// Haversine great-circle distance between two points, in statute miles.
///
/// `d = 2r·asin(√(sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)))`
#[must_use]
pub fn haversine_miles(from: &Coordinates, to: &Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_MILES * a.sqrt().min(1.0).asin()
}
