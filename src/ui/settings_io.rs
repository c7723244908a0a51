use std::fs;

use tracing::warn;

use mariposa::config::app_file;

use crate::ui::settings::UiSettings;

const SETTINGS_FILE: &str = "ui_settings.json";

pub fn load_settings() -> UiSettings {
    fs::read_to_string(app_file(SETTINGS_FILE))
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_settings(settings: &UiSettings) {
    let path = app_file(SETTINGS_FILE);
    let result = serde_json::to_string_pretty(settings)
        .map_err(anyhow::Error::from)
        .and_then(|json| fs::write(&path, json).map_err(anyhow::Error::from));
    if let Err(err) = result {
        warn!(path = %path.display(), error = %err, "could not save UI settings");
    }
}
