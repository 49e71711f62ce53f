//! Lacona bridge - OS actions and file-index queries through a native host
//!
//! The bridge turns one host send primitive into one-shot calls and
//! cancellable streaming queries, serves demo fixtures instead of the host
//! when asked to, and decodes the host's positional replies into records.

pub mod bridge;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod escape;
pub mod host;
pub mod logging;
pub mod protocol;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub use bridge::{Bridge, Mode, Platform, QueryStream, Record};
pub use error::{BridgeError, DecodeError, TransportError};

use bridge::{process_mode, StaticFixtures};
use config::Settings;
use host::ProcessHost;

/// Mode for `settings` in this process: `settings.demo` or `LACONA_ENV=demo`
/// selects demo, otherwise the platform decides
pub fn bridge_mode(settings: &Settings) -> Mode {
    settings.resolve_mode(process_mode() == Mode::Demo, &Platform::current())
}

/// Build the bridge for this process from `settings`
///
/// Live mode spawns the configured host.
pub fn open_bridge(settings: &Settings) -> Result<Bridge> {
    let mode = bridge_mode(settings);
    info!(mode = %mode, "Opening bridge");

    Ok(match mode {
        Mode::Live => {
            let host = ProcessHost::spawn(&settings.host)
                .with_context(|| format!("Failed to start host {}", settings.host.command))?;
            Bridge::live(Arc::new(host))
        }
        Mode::Demo => {
            let fixtures = match settings.fixtures_path() {
                Some(path) => StaticFixtures::from_file(&path)?,
                None => StaticFixtures::builtin(),
            };
            Bridge::demo(Arc::new(fixtures))
        }
        Mode::Unsupported => Bridge::unsupported(),
    })
}
