use anyhow::bail;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{UtcDT, prelude::*, settings::UpdateOptions};

/// A "part" of a coordinate, in degrees
pub type CoordinateComponent = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// A point on the globe in degrees
pub struct GeoCoordinate {
    /// Latitude, -90 to 90
    pub lat: CoordinateComponent,
    /// Longitude, -180 to 180
    pub long: CoordinateComponent,
}

/// The Kaaba in Mecca
pub const KAABA: GeoCoordinate = GeoCoordinate {
    lat: 21.4225,
    long: 39.8262,
};

impl GeoCoordinate {
    pub fn new(lat: CoordinateComponent, long: CoordinateComponent) -> Result<Self> {
        let coord = Self { lat, long };
        if !coord.is_valid() {
            bail!("Coordinate ({lat}, {long}) is out of range");
        }
        Ok(coord)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// A single fix as gotten from a Geolocation API
pub struct Location {
    pub coordinate: GeoCoordinate,
    /// Accuracy radius in meters
    pub accuracy: f64,
    /// Direction of travel in degrees, optional as GPS can't always determine
    pub heading: Option<f64>,
    /// When the platform took the fix
    pub timestamp: UtcDT,
}

impl Location {
    /// Make a fix timestamped now, mostly useful for services that don't report a time
    pub fn now(coordinate: GeoCoordinate, accuracy: f64) -> Self {
        Self {
            coordinate,
            accuracy,
            heading: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Something a [LocationService] reports while updates are running
pub enum LocationUpdate {
    Position(Location),
    /// The platform failed to get a fix, updates may still continue after this
    Error(String),
}

pub type LocationUpdateTx = mpsc::UnboundedSender<LocationUpdate>;
pub type LocationUpdateRx = mpsc::UnboundedReceiver<LocationUpdate>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, specta::Type)]
/// Whether the user has let us see their location
pub enum Authorization {
    Granted,
    Denied,
    /// The user hasn't decided yet, the platform will ask them once updates start
    Prompt,
}

/// Source of location fixes on the current platform
pub trait LocationService: Send + Sync {
    /// Ask the user for permission to read their location, returns the resulting state
    fn request_authorization(&self) -> Result<Authorization>;
    /// Begin delivering fixes into `updates` until [LocationService::stop_updates] is called.
    /// Implementations may call `updates` from any thread.
    fn start_updates(&self, options: &UpdateOptions, updates: LocationUpdateTx) -> Result;
    fn stop_updates(&self) -> Result;
}
