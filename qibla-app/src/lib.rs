mod location;
mod settings;
mod state;

use log::LevelFilter;
use qibla_logic::{FinderSettings, QiblaDirection, QiblaUiState};
use tauri::{Manager, State};
use tauri_specta::{ErrorHandlingMode, collect_commands, collect_events};

use std::result::Result as StdResult;

use crate::{
    settings::read_settings_from_store,
    state::{AppState, QiblaStateUpdate},
};

type Result<T = (), E = String> = StdResult<T, E>;

#[tauri::command]
#[specta::specta]
/// Get everything the finder screen displays, call after receiving an update event
async fn get_qibla_state(state: State<'_, AppState>) -> Result<QiblaUiState> {
    Ok(state.get_ui_state().await)
}

#[tauri::command]
#[specta::specta]
/// Compute the direction to the qibla from the latest location. Errors with "Location
/// unavailable" if no location has come in yet, the previously displayed direction stays valid.
async fn find_qibla(state: State<'_, AppState>) -> Result<QiblaDirection> {
    state.find_qibla().await
}

#[tauri::command]
#[specta::specta]
/// Ask for location permission and begin receiving locations, call when the screen appears
async fn start_location_updates(state: State<'_, AppState>) -> Result {
    state.start_updates().await
}

#[tauri::command]
#[specta::specta]
/// Stop receiving locations, call when the screen disappears
async fn stop_location_updates(state: State<'_, AppState>) -> Result {
    state.stop_updates().await;
    Ok(())
}

#[tauri::command]
#[specta::specta]
/// Get the current settings
async fn get_settings(state: State<'_, AppState>) -> Result<FinderSettings> {
    Ok(state.clone_settings().await)
}

#[tauri::command]
#[specta::specta]
/// Update the settings and persist them
async fn update_settings(new_settings: FinderSettings, state: State<'_, AppState>) -> Result {
    state.update_settings(new_settings).await
}

pub fn mk_specta() -> tauri_specta::Builder {
    tauri_specta::Builder::<tauri::Wry>::new()
        .error_handling(ErrorHandlingMode::Throw)
        .commands(collect_commands![
            get_qibla_state,
            find_qibla,
            start_location_updates,
            stop_location_updates,
            get_settings,
            update_settings,
        ])
        .events(collect_events![QiblaStateUpdate])
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let builder = mk_specta();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(LevelFilter::Debug)
                .build(),
        )
        .plugin(tauri_plugin_geolocation::init())
        .plugin(tauri_plugin_store::Builder::default().build())
        .invoke_handler(builder.invoke_handler())
        .setup(move |app| {
            builder.mount_events(app);

            let handle = app.handle();
            let settings = read_settings_from_store(handle);
            app.manage(AppState::new(handle, settings));
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
