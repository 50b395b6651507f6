//! Persistence store for saved instruments
//!
//! The store is a plain get/set key-value surface. Saved instruments live in
//! a single array-valued key, [`SAVED_INSTRUMENTS_KEY`]; every change is a
//! read-modify-write of that whole array, so callers serialize writers
//! through the model mutex.
//!
//! # Implementations
//!
//! - [`JsonSettingsStore`] - JSON object file (`settings.json` in the app data dir)
//! - [`MemoryStore`] - In-process map, shareable between clones
//!
//! [`SavedInstrumentStore`] layers the saved-list semantics on top of any
//! [`SettingsStore`]: upsert by `(transport, model, serial)`, identity-based
//! removal, and tolerant loading.

use crate::config::{app_data_dir, SAVED_INSTRUMENTS_KEY, SETTINGS_FILE};
use crate::error::{ExplorerError, Result};
use crate::types::InstrumentRecord;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key-value configuration surface
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send {
    /// Current value of `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value of `key`
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

// ==================== JSON File Store ====================

/// Settings stored as one JSON object in a file
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `settings.json` in the app data directory
    pub fn in_app_data_dir() -> Result<Self> {
        let dir = app_data_dir().ok_or_else(|| {
            ExplorerError::Config("Could not determine app data directory".to_string())
        })?;
        Ok(Self::new(dir.join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ExplorerError::Persistence(format!("Failed to read {:?}: {}", self.path, e))
        })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ExplorerError::Persistence(format!(
                "{:?} does not hold a JSON object",
                self.path
            ))),
            Err(e) => Err(ExplorerError::Persistence(format!(
                "Failed to parse {:?}: {}",
                self.path, e
            ))),
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExplorerError::Persistence(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(all)).map_err(|e| {
            ExplorerError::Persistence(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(&self.path, content).map_err(|e| {
            ExplorerError::Persistence(format!("Failed to write {:?}: {}", self.path, e))
        })
    }
}

// ==================== Memory Store ====================

/// In-memory settings; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|e| ExplorerError::Persistence(format!("Memory store poisoned: {}", e)))
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }
}

// ==================== Saved Instrument Store ====================

/// Saved-instrument list semantics on top of a [`SettingsStore`]
pub struct SavedInstrumentStore {
    store: Box<dyn SettingsStore>,
}

impl SavedInstrumentStore {
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Read the saved list. Entries that fail to parse are skipped.
    pub fn load(&self) -> Result<Vec<InstrumentRecord>> {
        let items = match self.store.get(SAVED_INSTRUMENTS_KEY)? {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ExplorerError::Persistence(format!(
                    "{} is not an array: {}",
                    SAVED_INSTRUMENTS_KEY, other
                )))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<InstrumentRecord>(item) {
                Ok(mut record) => {
                    record.fill_defaults();
                    records.push(record);
                }
                Err(e) => tracing::warn!("Skipping unreadable saved instrument: {}", e),
            }
        }
        Ok(records)
    }

    /// Add `record`, or update its connection details and friendly name if
    /// already saved.
    ///
    /// Only address, port and friendly name are rewritten on a saved entry.
    /// Manufacturer, category and firmware revision keep the values from the
    /// first save. Returns true if the store was written.
    pub fn persist(&mut self, record: &InstrumentRecord) -> Result<bool> {
        let mut list = self.load()?;

        match list.iter_mut().find(|saved| saved.same_instrument(record)) {
            None => list.push(record.clone()),
            Some(saved) => {
                let mut changed = false;
                if saved.address != record.address {
                    saved.address = record.address.clone();
                    changed = true;
                }
                if saved.port != record.port {
                    saved.port = record.port.clone();
                    changed = true;
                }
                if saved.friendly_name != record.friendly_name {
                    saved.friendly_name = record.friendly_name.clone();
                    changed = true;
                }
                if !changed {
                    return Ok(false);
                }
            }
        }

        self.write(&list)?;
        Ok(true)
    }

    /// Remove the saved entry for `record`'s instrument. Returns true if one was removed.
    pub fn remove(&mut self, record: &InstrumentRecord) -> Result<bool> {
        let mut list = self.load()?;
        let Some(idx) = list.iter().position(|saved| saved.same_instrument(record)) else {
            return Ok(false);
        };
        list.remove(idx);
        self.write(&list)?;
        Ok(true)
    }

    fn write(&mut self, list: &[InstrumentRecord]) -> Result<()> {
        let value = serde_json::to_value(list).map_err(|e| {
            ExplorerError::Persistence(format!("Failed to serialize saved instruments: {}", e))
        })?;
        self.store.set(SAVED_INSTRUMENTS_KEY, value)
    }
}

impl std::fmt::Debug for SavedInstrumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavedInstrumentStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportType;

    fn record(address: &str) -> InstrumentRecord {
        InstrumentRecord::new(TransportType::Lan, address, "2450", "04512345")
    }

    #[test]
    fn test_load_absent_key_is_empty() {
        let store = SavedInstrumentStore::new(Box::new(MemoryStore::new()));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_then_update_address() {
        let memory = MemoryStore::new();
        let mut store = SavedInstrumentStore::new(Box::new(memory.clone()));

        assert!(store.persist(&record("10.0.0.5")).unwrap());
        assert!(!store.persist(&record("10.0.0.5")).unwrap());
        assert!(store.persist(&record("10.0.0.6")).unwrap());

        let saved = store.load().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].address, "10.0.0.6");

        let raw = memory.get(SAVED_INSTRUMENTS_KEY).unwrap().unwrap();
        assert_eq!(raw[0]["instr_address"], "10.0.0.6");
    }

    #[test]
    fn test_persist_updates_friendly_name() {
        let mut store = SavedInstrumentStore::new(Box::new(MemoryStore::new()));
        store.persist(&record("10.0.0.5")).unwrap();
        assert!(store
            .persist(&record("10.0.0.5").with_friendly_name("bench smu"))
            .unwrap());
        assert_eq!(store.load().unwrap()[0].friendly_name, "bench smu");
    }

    #[test]
    fn test_persist_updates_port_only() {
        let memory = MemoryStore::new();
        let mut store = SavedInstrumentStore::new(Box::new(memory.clone()));
        store
            .persist(&record("10.0.0.5").with_port("5025").with_firmware_revision("1.7"))
            .unwrap();

        let moved = record("10.0.0.5").with_port("5030").with_firmware_revision("2.0");
        assert!(store.persist(&moved).unwrap());
        assert!(!store.persist(&moved).unwrap());

        let saved = store.load().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].port.as_deref(), Some("5030"));
        assert_eq!(saved[0].firmware_revision, "1.7");

        let raw = memory.get(SAVED_INSTRUMENTS_KEY).unwrap().unwrap();
        assert_eq!(raw[0]["socket_port"], "5030");
    }

    #[test]
    fn test_remove_by_identity() {
        let mut store = SavedInstrumentStore::new(Box::new(MemoryStore::new()));
        store.persist(&record("10.0.0.5")).unwrap();

        // Address does not matter for removal
        assert!(store.remove(&record("192.168.1.1")).unwrap());
        assert!(!store.remove(&record("10.0.0.5")).unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_skips_bad_entries() {
        let mut memory = MemoryStore::new();
        memory
            .set(
                SAVED_INSTRUMENTS_KEY,
                serde_json::json!([
                    {"io_type": "Lan", "instr_address": "1.1.1.1", "model": "2450", "serial_number": "1"},
                    {"io_type": "Serial", "instr_address": "COM1"},
                ]),
            )
            .unwrap();

        let store = SavedInstrumentStore::new(Box::new(memory));
        let saved = store.load().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].friendly_name, "2450#1");
    }

    #[test]
    fn test_non_array_value_is_error() {
        let mut memory = MemoryStore::new();
        memory.set(SAVED_INSTRUMENTS_KEY, serde_json::json!({"a": 1})).unwrap();
        let store = SavedInstrumentStore::new(Box::new(memory));
        assert!(matches!(store.load(), Err(ExplorerError::Persistence(_))));
    }

    #[test]
    fn test_write_failure_surfaces() {
        let mut mock = MockSettingsStore::new();
        mock.expect_get().returning(|_| Ok(None));
        mock.expect_set()
            .returning(|_, _| Err(ExplorerError::Persistence("read-only".to_string())));

        let mut store = SavedInstrumentStore::new(Box::new(mock));
        let err = store.persist(&record("10.0.0.5")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let mut file_store = JsonSettingsStore::new(&path);

        assert_eq!(file_store.get("other").unwrap(), None);
        file_store.set("other", serde_json::json!(true)).unwrap();

        let mut store = SavedInstrumentStore::new(Box::new(file_store.clone()));
        store.persist(&record("10.0.0.5")).unwrap();

        // Unrelated keys survive the read-modify-write
        assert_eq!(file_store.get("other").unwrap(), Some(serde_json::json!(true)));
        let reopened = SavedInstrumentStore::new(Box::new(JsonSettingsStore::new(&path)));
        assert_eq!(reopened.load().unwrap()[0].address, "10.0.0.5");
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[1, 2").unwrap();

        let store = JsonSettingsStore::new(&path);
        assert!(matches!(store.get("x"), Err(ExplorerError::Persistence(_))));
    }
}
