use serde::{Deserialize, Serialize};

use crate::location::{GeoCoordinate, KAABA};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// How the platform should deliver location updates
pub struct UpdateOptions {
    /// Ask for GPS-grade fixes instead of network-based ones
    pub high_accuracy: bool,
    /// Oldest cached fix the platform may hand back, in milliseconds
    pub maximum_age_ms: u32,
    /// How long the platform may take per fix, in milliseconds
    pub timeout_ms: u32,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age_ms: 2000,
            timeout_ms: 10000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// User adjustable settings for the finder
pub struct FinderSettings {
    /// Point the finder gives directions to
    pub target: GeoCoordinate,
    pub update: UpdateOptions,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            target: KAABA,
            update: UpdateOptions::default(),
        }
    }
}
