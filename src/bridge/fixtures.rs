//! Deterministic substitute data for demo mode

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::decoder::Record;

/// Home directory reported in demo mode
pub const DEMO_USER_HOME: &str = "/Users/LaconaUser";

/// Supplies fixture values keyed by operation (or capability) name
pub trait FixtureProvider: Send + Sync {
    fn value(&self, key: &str) -> Option<Value>;

    /// Fixture as a list of records; non-object items are skipped
    fn records(&self, key: &str) -> Option<Vec<Record>> {
        match self.value(key)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Fixture table held in memory
#[derive(Clone, Debug, Default)]
pub struct StaticFixtures {
    entries: HashMap<String, Value>,
}

impl StaticFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small built-in dataset so demo mode works without a fixtures file
    pub fn builtin() -> Self {
        Self::new()
            .with("userHome", json!(DEMO_USER_HOME))
            .with("fetchOpenWindows", json!([]))
            .with("fetchBrowserTabs", json!([]))
            .with("fetchApplications", json!([]))
            .with("fetchRunningApplications", json!([]))
            .with("fetchBookmarks", json!([]))
            .with("fetchPreferencePanes", json!([]))
            .with("searchFiles", json!([]))
            .with("fetchMusic", json!([]))
            .with("fetchMountedVolumes", json!([]))
            .with(
                "config",
                json!({
                    "webSearch": {
                        "searchEngines": [
                            {"name": "Google", "url": "https://www.google.com/search?q=${query}"},
                            {"name": "DuckDuckGo", "url": "https://duckduckgo.com/?q=${query}"},
                            {"name": "Wikipedia", "url": "https://wikipedia.org/wiki/Special:Search/${query}"}
                        ]
                    },
                    "applications": {"searchDirectories": [], "applications": []}
                }),
            )
    }

    /// Load a JSON object of `{ "<key>": <value> }`, layered over the built-ins
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
        let entries: HashMap<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Fixtures file {} is not a JSON object", path.display()))?;

        info!(path = %path.display(), count = entries.len(), "Loaded demo fixtures");
        let mut fixtures = Self::builtin();
        fixtures.entries.extend(entries);
        Ok(fixtures)
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FixtureProvider for StaticFixtures {
    fn value(&self, key: &str) -> Option<Value> {
        let value = self.entries.get(key).cloned();
        if value.is_none() {
            debug!(key, "No fixture declared");
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_user_home() {
        let fixtures = StaticFixtures::builtin();
        assert_eq!(fixtures.value("userHome"), Some(json!(DEMO_USER_HOME)));
        assert_eq!(fixtures.value("setVolume"), None);
    }

    #[test]
    fn test_records_skips_non_objects() {
        let fixtures =
            StaticFixtures::new().with("fetchBookmarks", json!([{"name": "a"}, 3, {"name": "b"}]));
        let records = fixtures.records("fetchBookmarks").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], "b");
        assert!(fixtures.records("missing").is_none());
    }

    #[test]
    fn test_from_file_layers_over_builtins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"userHome": "/Users/Someone", "fetchMusic": [{{"name": "Song"}}]}}"#
        )
        .unwrap();

        let fixtures = StaticFixtures::from_file(file.path()).unwrap();
        assert_eq!(fixtures.value("userHome"), Some(json!("/Users/Someone")));
        assert_eq!(fixtures.records("fetchMusic").unwrap()[0]["name"], "Song");
        assert_eq!(fixtures.value("fetchBookmarks"), Some(json!([])));
    }

    #[test]
    fn test_from_file_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(StaticFixtures::from_file(file.path()).is_err());
    }

    #[test]
    fn test_values_are_deterministic() {
        let fixtures = StaticFixtures::builtin();
        assert_eq!(fixtures.value("config"), fixtures.value("config"));
    }
}
