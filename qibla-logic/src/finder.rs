use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    UtcDT,
    bearing::{CompassPoint, bearing, distance_km},
    location::{GeoCoordinate, Location, LocationService},
    prelude::*,
    provider::{LocationProvider, ProviderStatus},
    settings::FinderSettings,
};

/// Notifies the UI that [QiblaFinder::get_ui_state] has changed
pub trait StateUpdateSender: Send + Sync + 'static {
    fn send_update(&self);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// Direction to the target from a given point
pub struct QiblaDirection {
    /// Degrees clockwise from true north, 0 to 360
    pub bearing: f64,
    pub compass_point: CompassPoint,
    pub distance_km: f64,
    /// Where the user was when this was computed
    pub from: GeoCoordinate,
    pub computed_at: UtcDT,
}

impl QiblaDirection {
    pub fn compute(from: GeoCoordinate, target: GeoCoordinate) -> Self {
        let bearing = bearing(from, target);
        Self {
            bearing,
            compass_point: CompassPoint::from_bearing(bearing),
            distance_km: distance_km(from, target),
            from,
            computed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, specta::Type)]
/// Everything the finder screen displays
pub struct QiblaUiState {
    /// Direction to display, the last computed bearing or 0 if there hasn't been one
    pub direction: f64,
    pub qibla: Option<QiblaDirection>,
    /// Most recent fix, if we have one
    pub location: Option<Location>,
    pub status: ProviderStatus,
    /// The last find was attempted before we had a location
    pub location_unavailable: bool,
    pub target: GeoCoordinate,
}

#[derive(Default)]
struct FinderState {
    qibla: Option<QiblaDirection>,
    location_unavailable: bool,
}

/// Struct backing the finder screen, gets locations with [LocationProvider] and turns them
/// into a direction on request.
pub struct QiblaFinder<L: LocationService, S: StateUpdateSender> {
    provider: LocationProvider<L, S>,
    settings: RwLock<FinderSettings>,
    state: RwLock<FinderState>,
    state_update_sender: Arc<S>,
}

impl<L: LocationService, S: StateUpdateSender> QiblaFinder<L, S> {
    pub fn new(location: L, settings: FinderSettings, state_update_sender: S) -> Self {
        let state_update_sender = Arc::new(state_update_sender);
        Self {
            provider: LocationProvider::new(location, state_update_sender.clone()),
            settings: RwLock::new(settings),
            state: RwLock::new(FinderState::default()),
            state_update_sender,
        }
    }

    pub async fn start_updates(&self) -> Result {
        let options = self.settings.read().await.update;
        self.provider.start(&options).await?;
        self.state_update_sender.send_update();
        Ok(())
    }

    pub async fn stop_updates(&self) {
        self.provider.stop().await;
        self.state_update_sender.send_update();
    }

    /// Compute the direction to the target from the latest location. If there is no location
    /// yet, the previous direction is kept and [QiblaUiState::location_unavailable] is set.
    pub async fn find_qibla(&self) -> Option<QiblaDirection> {
        let target = self.settings.read().await.target;
        let mut state = self.state.write().await;

        let res = if let Some(location) = self.provider.latest() {
            let qibla = QiblaDirection::compute(location.coordinate, target);
            info!(
                "Qibla is {:.1}° ({:?}) from {:?}",
                qibla.bearing, qibla.compass_point, qibla.from
            );
            state.qibla = Some(qibla);
            state.location_unavailable = false;
            Some(qibla)
        } else {
            warn!("Tried to find qibla without a location");
            state.location_unavailable = true;
            None
        };

        drop(state);
        self.state_update_sender.send_update();
        res
    }

    pub async fn get_ui_state(&self) -> QiblaUiState {
        let state = self.state.read().await;
        let target = self.settings.read().await.target;
        QiblaUiState {
            direction: state.qibla.map(|q| q.bearing).unwrap_or_default(),
            qibla: state.qibla,
            location: self.provider.latest(),
            status: self.provider.status().await,
            location_unavailable: state.location_unavailable,
            target,
        }
    }

    pub async fn clone_settings(&self) -> FinderSettings {
        *self.settings.read().await
    }

    /// Replace the settings, restarting location updates if they're running so new options
    /// take effect. If the restart fails the old settings are kept and updates are resumed
    /// with them where possible.
    pub async fn update_settings(&self, new_settings: FinderSettings) -> Result {
        if !new_settings.target.is_valid() {
            bail!("Target {:?} is not a valid coordinate", new_settings.target);
        }

        // Held until the new settings are committed so updates can't interleave
        let mut settings = self.settings.write().await;
        let old_settings = *settings;

        if old_settings.update != new_settings.update
            && self.provider.status().await == ProviderStatus::Updating
        {
            self.provider.stop().await;
            if let Err(why) = self.provider.start(&new_settings.update).await {
                if let Err(why) = self.provider.start(&old_settings.update).await {
                    error!("Couldn't resume location updates with previous settings: {why:?}");
                }
                drop(settings);
                self.state_update_sender.send_update();
                return Err(why.context("Failed to restart location updates"));
            }
        }

        *settings = new_settings;
        drop(settings);

        if old_settings.target != new_settings.target {
            // Direction was for the old target
            self.state.write().await.qibla = None;
        }

        self.state_update_sender.send_update();
        Ok(())
    }

    /// Get notified whenever a new fix comes in
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Option<Location>> {
        self.provider.subscribe()
    }
}
