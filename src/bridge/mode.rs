//! Live / Demo / Unsupported selection, resolved once per process

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Environment variable that switches every operation to fixture data
pub const DEMO_ENV_VAR: &str = "LACONA_ENV";
const DEMO_ENV_VALUE: &str = "demo";

static PROCESS_MODE: OnceLock<Mode> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other(std::env::consts::OS.to_string())
        }
    }

    /// Whether the host's OS integrations exist on this platform
    pub fn is_supported(&self) -> bool {
        matches!(self, Platform::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => write!(f, "macos"),
            Platform::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Calls go to the host
    Live,
    /// Calls are answered from fixtures; the host is never contacted
    Demo,
    /// Calls resolve to nothing without error
    Unsupported,
}

impl Mode {
    /// Demo wins over platform; an unsupported platform never goes live
    pub fn resolve(demo: bool, platform: &Platform) -> Mode {
        if demo {
            Mode::Demo
        } else if platform.is_supported() {
            Mode::Live
        } else {
            Mode::Unsupported
        }
    }

    /// Resolve from `LACONA_ENV` and the given platform
    pub fn from_env(platform: &Platform) -> Mode {
        Mode::resolve(demo_flag_from_env(), platform)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Demo => "demo",
            Mode::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn demo_flag_from_env() -> bool {
    is_demo_value(std::env::var(DEMO_ENV_VAR).ok().as_deref())
}

fn is_demo_value(value: Option<&str>) -> bool {
    value == Some(DEMO_ENV_VALUE)
}

/// The process-wide mode, computed on first use and never changed afterward
pub fn process_mode() -> Mode {
    *PROCESS_MODE.get_or_init(|| {
        let platform = Platform::current();
        let mode = Mode::from_env(&platform);
        info!(mode = %mode, platform = %platform, "Resolved bridge mode");
        mode
    })
}
