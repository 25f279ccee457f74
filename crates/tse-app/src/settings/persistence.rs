//! Settings persistence - load and save settings to disk.
//!
//! Settings are stored in the platform-specific configuration folder:
//! - macOS: ~/Library/Application Support/eu.efsa.TSE-Reporting/
//! - Windows: %APPDATA%/efsa/TSE Reporting/config/
//! - Linux: ~/.config/tsereporting/

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use super::Settings;
use crate::error::SettingsError;

const APP_QUALIFIER: &str = "eu";
const APP_ORG: &str = "efsa";
const APP_NAME: &str = "TSE Reporting";
const CONFIG_FILENAME: &str = "settings.toml";

/// Path of the settings file, if the platform has a config directory.
pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Load settings from the platform config directory.
///
/// Falls back to defaults when the file is missing or unreadable.
pub fn load_settings() -> Settings {
    let Some(path) = settings_path() else {
        tracing::warn!("could not determine settings path, using defaults");
        return Settings::default();
    };

    match load_settings_from(&path) {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            Settings::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "using default settings");
            Settings::default()
        }
    }
}

/// Load settings from `path`. `Ok(None)` when the file does not exist.
pub fn load_settings_from(path: &Path) -> Result<Option<Settings>, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let settings = toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "loaded settings");
    Ok(Some(settings))
}

/// Save settings to the platform config directory.
pub fn save_settings(settings: &Settings) -> Result<PathBuf, SettingsError> {
    let path = settings_path().ok_or(SettingsError::NoConfigDir)?;
    save_settings_to(settings, &path)?;
    Ok(path)
}

/// Save settings to `path`, creating its parent directory.
pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "saved settings");
    Ok(())
}
