mod bearing;
mod finder;
mod location;
mod provider;
mod settings;

pub use bearing::{CompassPoint, bearing, distance_km};
pub use finder::{QiblaDirection, QiblaFinder, QiblaUiState, StateUpdateSender};
pub use location::{
    Authorization, GeoCoordinate, KAABA, Location, LocationService, LocationUpdate,
    LocationUpdateTx,
};
pub use provider::{LocationProvider, ProviderStatus};
pub use settings::{FinderSettings, UpdateOptions};

/// Convenience alias for UTC DT
pub type UtcDT = chrono::DateTime<chrono::Utc>;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
