//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;
use crate::bridge::{Mode, Platform};

// ============================================
// HOST
// ============================================

/// How to start the native host in live mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Path to the host binary; a leading `~` is expanded
    #[serde(default = "default_host_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_host_command() -> String {
    DEFAULT_HOST_COMMAND.to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            command: default_host_command(),
            args: Vec::new(),
        }
    }
}

// ============================================
// SETTINGS
// ============================================

/// Contents of `~/.lacona/bridge.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Serve everything from fixtures (same effect as `LACONA_ENV=demo`)
    #[serde(default)]
    pub demo: bool,
    #[serde(default)]
    pub host: HostConfig,
    /// JSON fixtures layered over the built-in demo data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures_path: Option<String>,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            demo: false,
            host: HostConfig::default(),
            fixtures_path: None,
            log_dir: default_log_dir(),
        }
    }
}

impl Settings {
    /// Mode for these settings given the environment's demo flag
    pub fn resolve_mode(&self, env_demo: bool, platform: &Platform) -> Mode {
        Mode::resolve(self.demo || env_demo, platform)
    }

    pub fn fixtures_path(&self) -> Option<PathBuf> {
        self.fixtures_path.as_deref().map(expand_path)
    }

    pub fn log_dir(&self) -> PathBuf {
        expand_path(&self.log_dir)
    }
}

/// `~/.lacona`, or a temp directory when there is no home
pub fn lacona_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".lacona"))
        .unwrap_or_else(|| std::env::temp_dir().join("lacona"))
}

pub fn default_config_path() -> PathBuf {
    lacona_dir().join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` against the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
