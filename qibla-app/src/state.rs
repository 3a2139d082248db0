use std::marker::PhantomData;

use log::{error, info};
use qibla_logic::{
    FinderSettings, QiblaDirection, QiblaFinder, QiblaUiState, StateUpdateSender,
};
use serde::{Deserialize, Serialize};
use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_specta::Event;

use crate::{Result, location::TauriLocation, settings::write_settings_to_store};

/// The state of the finder screen has changed
#[derive(Serialize, Deserialize, Clone, Default, Debug, specta::Type, tauri_specta::Event)]
pub struct QiblaStateUpdate;

pub struct TauriStateUpdateSender<E: Clone + Default + Event + Serialize>(
    AppHandle,
    PhantomData<E>,
);

impl<E: Serialize + Clone + Default + Event> TauriStateUpdateSender<E> {
    fn new(app: &AppHandle) -> Self {
        Self(app.clone(), PhantomData)
    }
}

impl<E: Serialize + Clone + Default + Event + Send + Sync + 'static> StateUpdateSender
    for TauriStateUpdateSender<E>
{
    fn send_update(&self) {
        if let Err(why) = E::default().emit(&self.0) {
            error!("Error sending state update to UI: {why:?}");
        }
    }
}

type Finder = QiblaFinder<TauriLocation, TauriStateUpdateSender<QiblaStateUpdate>>;

fn error_dialog(app: &AppHandle, msg: &str) {
    app.dialog()
        .message(msg)
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

pub struct AppState {
    app: AppHandle,
    finder: Finder,
}

impl AppState {
    pub fn new(app: &AppHandle, settings: FinderSettings) -> Self {
        let location = TauriLocation::new(app.clone());
        let state_updates = TauriStateUpdateSender::new(app);
        Self {
            app: app.clone(),
            finder: Finder::new(location, settings, state_updates),
        }
    }

    pub async fn start_updates(&self) -> Result {
        self.finder.start_updates().await.map_err(|why| {
            error!("Couldn't start location updates: {why:?}");
            error_dialog(
                &self.app,
                &format!("Qibla Finder needs your location to work\n\n{why}"),
            );
            why.to_string()
        })
    }

    pub async fn stop_updates(&self) {
        self.finder.stop_updates().await;
    }

    pub async fn find_qibla(&self) -> Result<QiblaDirection> {
        self.finder
            .find_qibla()
            .await
            .ok_or_else(|| "Location unavailable".to_string())
    }

    pub async fn get_ui_state(&self) -> QiblaUiState {
        self.finder.get_ui_state().await
    }

    pub async fn clone_settings(&self) -> FinderSettings {
        self.finder.clone_settings().await
    }

    pub async fn update_settings(&self, settings: FinderSettings) -> Result {
        self.finder
            .update_settings(settings)
            .await
            .map_err(|why| why.to_string())?;

        if let Err(why) = write_settings_to_store(&self.app, settings) {
            error!("Failed to save settings: {why:?}");
            error_dialog(&self.app, "Failed to save your settings");
        } else {
            info!("Saved settings");
        }

        Ok(())
    }
}
