use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::debug;
use qibla_logic::{
    Authorization, GeoCoordinate, Location, LocationService, LocationUpdate, LocationUpdateTx,
    UpdateOptions,
};
use tauri::{AppHandle, plugin::PermissionState};
use tauri_plugin_geolocation::{
    GeolocationExt, PermissionType, Position, PositionOptions, WatchEvent,
};

pub struct TauriLocation {
    app: AppHandle,
    /// Id of the running position watch
    watch: Mutex<Option<u32>>,
}

impl TauriLocation {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            watch: Mutex::new(None),
        }
    }
}

fn to_location(pos: Position) -> Location {
    let coords = pos.coords;
    Location {
        coordinate: GeoCoordinate {
            lat: coords.latitude,
            long: coords.longitude,
        },
        accuracy: coords.accuracy,
        heading: coords.heading,
        timestamp: i64::try_from(pos.timestamp)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now),
    }
}

impl LocationService for TauriLocation {
    fn request_authorization(&self) -> anyhow::Result<Authorization> {
        let geo = self.app.geolocation();

        let mut status = geo
            .check_permissions()
            .context("Failed to check location permissions")?;

        if matches!(
            status.location,
            PermissionState::Prompt | PermissionState::PromptWithRationale
        ) {
            status = geo
                .request_permissions(Some(vec![PermissionType::Location]))
                .context("Failed to request location permissions")?;
        }

        Ok(match status.location {
            PermissionState::Granted => Authorization::Granted,
            PermissionState::Denied => Authorization::Denied,
            _ => Authorization::Prompt,
        })
    }

    fn start_updates(
        &self,
        options: &UpdateOptions,
        updates: LocationUpdateTx,
    ) -> anyhow::Result<()> {
        let options = PositionOptions {
            enable_high_accuracy: options.high_accuracy,
            timeout: options.timeout_ms,
            maximum_age: options.maximum_age_ms,
        };

        let id = self
            .app
            .geolocation()
            .watch_position(options, move |event| {
                let update = match event {
                    WatchEvent::Position(pos) => LocationUpdate::Position(to_location(pos)),
                    WatchEvent::Error(why) => LocationUpdate::Error(why),
                };
                // Fails once the provider stops listening, the watch is cleared right after
                updates.send(update).ok();
            })
            .context("Failed to watch position")?;

        debug!("Started position watch {id}");
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        Ok(())
    }

    fn stop_updates(&self) -> anyhow::Result<()> {
        let id = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(id) = id {
            self.app
                .geolocation()
                .clear_watch(id)
                .context("Failed to clear position watch")?;
            debug!("Cleared position watch {id}");
        }

        Ok(())
    }
}
