use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content::ContentLibrary;

const APP_DIR: &str = "mariposa";
const CONFIG_FILE: &str = "config.json";

/// Where and how to reach the narration assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Conversation turns kept besides the system instruction.
    pub max_history: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            model: "local-model".to_string(),
            temperature: 0.7,
            timeout_secs: 30,
            api_key_env: "MARIPOSA_API_KEY".to_string(),
            max_history: 40,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assistant: AssistantConfig,
    /// Replacement protocol library (JSON). The built-in one is used when unset
    /// or unreadable.
    pub library_path: Option<PathBuf>,
}

impl AppConfig {
    /// The API key from the configured environment variable. Blank counts as
    /// missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.assistant.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// A blank endpoint turns the assistant off. The key is optional since
    /// local servers take none.
    pub fn assistant_enabled(&self) -> bool {
        !self.assistant.endpoint.trim().is_empty()
    }

    pub fn library(&self) -> ContentLibrary {
        let Some(path) = self.library_path.as_deref() else {
            return ContentLibrary::standard().clone();
        };
        match ContentLibrary::load(path) {
            Ok(library) => {
                info!(path = %path.display(), "protocol library loaded");
                library
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "using built-in protocol library");
                ContentLibrary::standard().clone()
            }
        }
    }
}

/// `<config dir>/mariposa/<file>`, creating the directory on the way.
pub fn app_file(file: &str) -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    fs::create_dir_all(&path).ok();
    path.push(file);
    path
}

pub fn load_config() -> AppConfig {
    load_config_from(&app_file(CONFIG_FILE))
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &app_file(CONFIG_FILE))
}

/// Missing or malformed files fall back to defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    let Ok(text) = fs::read_to_string(path) else {
        return AppConfig::default();
    };
    match serde_json::from_str(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed config");
            AppConfig::default()
        }
    }
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("serializing config")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
