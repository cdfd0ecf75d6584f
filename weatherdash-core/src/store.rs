//! Durable user preferences: search history and custom alert rules.
//!
//! Both collections are JSON blobs in a [`KeyValueStore`]. They are loaded
//! once and written back after every mutation. Missing or corrupt blobs load
//! as empty collections, and a failed write is logged rather than returned.

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug, fs, path::PathBuf};

use crate::model::CustomAlertRule;

pub const HISTORY_KEY: &str = "search_history";
pub const CUSTOM_ALERTS_KEY: &str = "custom_alerts";

pub trait KeyValueStore: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(contents))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))?;

        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// In-process store, used when no data directory is available and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.lock().insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Distinct city names, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory(Vec<String>);

impl SearchHistory {
    pub const CAPACITY: usize = 5;

    /// Move `name` to the front, dropping any earlier entry with the same
    /// name (case-insensitive) and evicting the oldest beyond capacity.
    pub fn record(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let folded = name.to_lowercase();
        self.0.retain(|existing| existing.to_lowercase() != folded);
        self.0.insert(0, name.to_string());
        self.0.truncate(Self::CAPACITY);
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub struct Preferences {
    store: Box<dyn KeyValueStore>,
    history: SearchHistory,
    custom_alerts: Vec<CustomAlertRule>,
}

impl Preferences {
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let mut history: SearchHistory = load_or_default(store.as_ref(), HISTORY_KEY);
        history.0.truncate(SearchHistory::CAPACITY);
        let custom_alerts = load_or_default(store.as_ref(), CUSTOM_ALERTS_KEY);

        Self { store, history, custom_alerts }
    }

    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn custom_alerts(&self) -> &[CustomAlertRule] {
        &self.custom_alerts
    }

    pub fn record_search(&mut self, name: &str) {
        self.history.record(name);
        persist(self.store.as_ref(), HISTORY_KEY, &self.history);
    }

    /// Add an active rule and return it. Ids are epoch milliseconds, bumped
    /// past the newest existing id so they stay unique and ordered.
    pub fn add_custom_alert(&mut self, temperature: f64, condition: &str) -> CustomAlertRule {
        let now = Utc::now().timestamp_millis();
        let newest = self.custom_alerts.iter().map(|rule| rule.id).max().unwrap_or(0);
        let id = match newest.checked_add(1) {
            Some(next) => now.max(next),
            // A stored id already sits at the top of the range: take a free slot instead.
            None => (now..i64::MAX)
                .find(|id| self.custom_alerts.iter().all(|rule| rule.id != *id))
                .unwrap_or(now),
        };

        let rule = CustomAlertRule {
            id,
            temperature,
            condition: condition.trim().to_lowercase(),
            active: true,
        };
        self.custom_alerts.push(rule.clone());
        persist(self.store.as_ref(), CUSTOM_ALERTS_KEY, &self.custom_alerts);
        rule
    }

    /// Remove the rule with `id`. Returns whether anything was removed.
    pub fn remove_custom_alert(&mut self, id: i64) -> bool {
        let before = self.custom_alerts.len();
        self.custom_alerts.retain(|rule| rule.id != id);
        let removed = self.custom_alerts.len() != before;

        if removed {
            persist(self.store.as_ref(), CUSTOM_ALERTS_KEY, &self.custom_alerts);
        }
        removed
    }
}

fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: Default + for<'de> Deserialize<'de>,
{
    let raw = match store.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!("Could not read stored {key}: {e:#}");
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring corrupt stored {key}: {e}");
        T::default()
    })
}

fn persist<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .context("Failed to serialize preferences")
        .and_then(|json| store.save(key, &json));

    if let Err(e) = result {
        tracing::warn!("Could not persist {key}: {e:#}");
    }
}
