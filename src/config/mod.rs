//! Configuration module - bridge settings
//!
//! # Module Structure
//!
//! - `defaults` - Default paths and commands
//! - `types` - `Settings` and `HostConfig`
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{CONFIG_FILE_NAME, DEFAULT_HOST_COMMAND, DEFAULT_LOG_DIR, LOG_FILE_NAME};
pub use loader::{load_settings, LoadedSettings, SettingsSource};
pub use types::{default_config_path, expand_path, lacona_dir, HostConfig, Settings};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
