//! Durable settings store.
//!
//! The engine talks to persistence only through [`SettingsStore`], a small
//! key-value surface over JSON values. Writes are staged and made durable by
//! [`SettingsStore::commit`], so a whole snapshot lands at once.

use crate::{Error, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Keys written by the engine
pub mod keys {
    pub const START_DATE: &str = "start_date";
    pub const BASE_PUSHUPS: &str = "base_pushups";
    pub const DAILY_PUSHUP_TOTALS: &str = "daily_pushup_totals";
    pub const MAX_TEST_COUNTED: &str = "max_test_counted";
    pub const CHALLENGE_STARTED: &str = "challenge_started";
    pub const LAST_UPDATED_DAY: &str = "last_updated_day";
    pub const CURRENT_FREQUENCY: &str = "current_frequency";
    pub const TIME_REMAINING_SECONDS: &str = "time_remaining_seconds";
    pub const CURRENT_PUSHUPS: &str = "current_pushups";
    pub const TIMER_STATE: &str = "timer_state";
    pub const DONE_FOR_TODAY: &str = "done_for_today";

    /// Every key tied to one challenge cycle
    pub const ALL: [&str; 11] = [
        START_DATE,
        BASE_PUSHUPS,
        DAILY_PUSHUP_TOTALS,
        MAX_TEST_COUNTED,
        CHALLENGE_STARTED,
        LAST_UPDATED_DAY,
        CURRENT_FREQUENCY,
        TIME_REMAINING_SECONDS,
        CURRENT_PUSHUPS,
        TIMER_STATE,
        DONE_FOR_TODAY,
    ];
}

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Make staged writes durable. Stores without staging need not override.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory store, used by tests and throwaway hosts
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Settings kept as one JSON object on disk
///
/// Reads take a shared lock; commits write a locked temp file in the same
/// directory and rename it over the original.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = Self::read_values(&path);
        Self {
            path,
            values,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(path: &Path) -> Map<String, Value> {
        if !path.exists() {
            tracing::info!("No settings file at {:?}, starting empty", path);
            return Map::new();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open settings {:?}: {}. Starting empty.", path, e);
                return Map::new();
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock settings {:?}: {}. Starting empty.", path, e);
            return Map::new();
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        if let Err(e) = read {
            tracing::warn!("Failed to read settings {:?}: {}. Starting empty.", path, e);
            return Map::new();
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(values)) => {
                tracing::debug!("Loaded {} settings from {:?}", values.len(), path);
                values
            }
            Ok(other) => {
                tracing::warn!(
                    "Settings {:?} hold a {} instead of an object. Starting empty.",
                    path,
                    json_kind(&other)
                );
                Map::new()
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings {:?}: {}. Starting empty.", path, e);
                Map::new()
            }
        }
    }

    fn write_values(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("{:?} has no parent directory", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(&self.values)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved settings to {:?}", self.path);
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.write_values()?;
        self.dirty = false;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        assert!(store.get(keys::BASE_PUSHUPS).is_none());

        store.set(keys::BASE_PUSHUPS, json!(40)).unwrap();
        assert_eq!(store.get(keys::BASE_PUSHUPS), Some(json!(40)));

        store.remove(keys::BASE_PUSHUPS).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut store = JsonFileStore::open(&path);
        store.set(keys::BASE_PUSHUPS, json!(25)).unwrap();
        store.set(keys::MAX_TEST_COUNTED, json!(true)).unwrap();
        store.commit().unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(keys::BASE_PUSHUPS), Some(json!(25)));
        assert_eq!(reopened.get(keys::MAX_TEST_COUNTED), Some(json!(true)));
    }

    #[test]
    fn test_uncommitted_writes_are_not_durable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut store = JsonFileStore::open(&path);
        store.set(keys::BASE_PUSHUPS, json!(25)).unwrap();
        assert!(!path.exists());

        store.commit().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json ").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(store.get(keys::START_DATE).is_none());
    }

    #[test]
    fn test_non_object_file_opens_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(store.get(keys::START_DATE).is_none());
    }

    #[test]
    fn test_commit_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut store = JsonFileStore::open(&path);
        store.set(keys::CHALLENGE_STARTED, json!(true)).unwrap();
        store.commit().unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "settings.json")
            .collect();
        assert!(extras.is_empty(), "Unexpected files: {:?}", extras);
    }
}
