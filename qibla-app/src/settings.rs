use anyhow::Context;
use log::warn;
use qibla_logic::FinderSettings;
use tauri::AppHandle;
use tauri_plugin_store::StoreExt;

const STORE_NAME: &str = "settings.json";
const SETTINGS_KEY: &str = "settings";

/// Read saved settings, falling back to the defaults if there are none or they're unreadable
pub fn read_settings_from_store(app: &AppHandle) -> FinderSettings {
    let store = match app.store(STORE_NAME) {
        Ok(store) => store,
        Err(why) => {
            warn!("Couldn't open settings store, using defaults: {why:?}");
            return FinderSettings::default();
        }
    };

    let settings = store
        .get(SETTINGS_KEY)
        .and_then(|v| serde_json::from_value::<FinderSettings>(v).ok());

    store.close_resource();

    settings
        .filter(|s| s.target.is_valid())
        .unwrap_or_default()
}

pub fn write_settings_to_store(app: &AppHandle, settings: FinderSettings) -> anyhow::Result<()> {
    let store = app
        .store(STORE_NAME)
        .context("Couldn't open settings store")?;

    let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
    store.set(SETTINGS_KEY, value);

    Ok(())
}
