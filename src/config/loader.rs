//! Configuration loading from file system

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::types::{default_config_path, Settings};

/// How the settings file was found
#[derive(Debug)]
pub enum SettingsSource {
    File(PathBuf),
    Missing(PathBuf),
    /// Unreadable or unparsable; defaults were used instead
    Invalid { path: PathBuf, error: anyhow::Error },
}

/// Settings plus the outcome of reading them
///
/// Loading happens before logging is installed (the log directory is itself
/// a setting), so the outcome is reported separately via [`LoadedSettings::report`].
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: SettingsSource,
}

impl LoadedSettings {
    /// The error that forced defaults, if any
    pub fn warning(&self) -> Option<&anyhow::Error> {
        match &self.source {
            SettingsSource::Invalid { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Log the outcome; call once logging is initialized
    pub fn report(&self) {
        match &self.source {
            SettingsSource::File(path) => {
                info!(path = %path.display(), demo = self.settings.demo, "Loaded settings")
            }
            SettingsSource::Missing(path) => {
                info!(path = %path.display(), "Settings file not found, using defaults")
            }
            SettingsSource::Invalid { path, error } => {
                warn!(path = %path.display(), error = %format!("{:#}", error), "Invalid settings, using defaults")
            }
        }
    }
}

/// Load settings from `path`, or `~/.lacona/bridge.json` when `None`
///
/// A missing file is not an error. An unreadable or invalid file is replaced
/// by `Settings::default()` and recorded in the returned source.
pub fn load_settings(path: Option<&Path>) -> LoadedSettings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path(),
    };

    if !path.exists() {
        return LoadedSettings {
            settings: Settings::default(),
            source: SettingsSource::Missing(path),
        };
    }

    match read_settings(&path) {
        Ok(settings) => LoadedSettings {
            settings,
            source: SettingsSource::File(path),
        },
        Err(error) => LoadedSettings {
            settings: Settings::default(),
            source: SettingsSource::Invalid { path, error },
        },
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}
