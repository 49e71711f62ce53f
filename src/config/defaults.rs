//! Default configuration values

/// Settings file inside `~/.lacona`, read when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "bridge.json";

/// Native host binary spawned in live mode
pub const DEFAULT_HOST_COMMAND: &str = "~/.lacona/bin/lacona-host";

/// Directory holding the JSONL log file
pub const DEFAULT_LOG_DIR: &str = "~/.lacona/logs";

pub const LOG_FILE_NAME: &str = "lacona-bridge.jsonl";
