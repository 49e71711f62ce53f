//! Structured JSONL logging to a file plus compact output on stderr.
//!
//! - **JSONL to file** (`~/.lacona/logs/lacona-bridge.jsonl` by default)
//! - **Compact to stderr** for humans
//!
//! # Usage
//!
//! ```rust,ignore
//! // Keep the guard alive for the duration of the program
//! let _guard = lacona_bridge::logging::init(&settings.log_dir());
//! tracing::info!(event_type = "bridge_lifecycle", "Started");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2026-10-19T10:30:45.123Z","level":"DEBUG","target":"lacona_bridge::host::process","fields":{"message":"Writing envelope to host","seq":3,"op":"applescript"}}
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use time::macros::format_description;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LOG_FILE_NAME;

/// Flushes and closes the log file when dropped
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Path of the JSONL log inside `log_dir`
pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Non-blocking writer over the log file, or over a sink if it cannot be opened
fn file_writer(log_dir: &Path) -> (NonBlocking, WorkerGuard) {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("[lacona-bridge] Failed to create log directory {}: {}", log_dir.display(), e);
    }

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(log_dir))
    {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!("[lacona-bridge] Failed to open log file: {}", e);
            tracing_appender::non_blocking(std::io::sink())
        }
    }
}

/// Install the global subscriber. Returns a guard that must be held.
///
/// The filter defaults to `info` and honours `RUST_LOG`.
pub fn init(log_dir: &Path) -> LoggingGuard {
    let (file, file_guard) = file_writer(log_dir);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_timer(timer)
        .with_target(true)
        .with_level(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_span_events(FmtSpan::NONE);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("[lacona-bridge] Logging already initialized: {}", e);
    }

    tracing::info!(
        event_type = "bridge_lifecycle",
        action = "started",
        log_path = %log_path(log_dir).display(),
        "Bridge logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}
