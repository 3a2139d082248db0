use serde::{Deserialize, Serialize};

use crate::location::GeoCoordinate;

/// Mean earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Initial great-circle bearing (forward azimuth) from `source` to `destination`, in
/// degrees clockwise from true north, in the range `[0, 360)`.
///
/// When both points are the same, or they're antipodal on a single meridian, there is no
/// meaningful direction and this returns 0.
pub fn bearing(source: GeoCoordinate, destination: GeoCoordinate) -> f64 {
    let lat1 = source.lat.to_radians();
    let lat2 = destination.lat.to_radians();
    let delta_long = (destination.long - source.long).to_radians();

    let y = delta_long.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_long.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Great-circle distance between two points using the haversine formula
pub fn distance_km(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_long = (b.long - a.long).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_long / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, specta::Type)]
/// The 8 principal winds
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassPoint {
    const ALL: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Nearest point to a bearing in degrees, each point covers the 45 degrees centered on it
    pub fn from_bearing(bearing: f64) -> Self {
        let sector = ((bearing.rem_euclid(360.0) + 22.5) / 45.0) as usize % Self::ALL.len();
        Self::ALL[sector]
    }
}
