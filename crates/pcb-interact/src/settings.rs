//! Viewer preferences persisted to a key-value store.
//!
//! Reads never fail: missing, unreadable or corrupt values fall back to the
//! defaults below. Writes log and swallow storage errors.

use std::collections::HashMap;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::store::{AppStore, PcbGroupViewMode};

pub const KEY_SHOW_COPPER_POURS: &str = "pcb_viewer:is_showing_copper_pours";
pub const KEY_SHOW_PCB_GROUPS: &str = "pcb_viewer:is_showing_pcb_groups";
pub const KEY_PCB_GROUP_VIEW_MODE: &str = "pcb_viewer:pcb_group_view_mode";

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage for tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub is_showing_copper_pours: bool,
    pub is_showing_pcb_groups: bool,
    pub pcb_group_view_mode: PcbGroupViewMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            is_showing_copper_pours: true,
            is_showing_pcb_groups: true,
            pcb_group_view_mode: PcbGroupViewMode::NamedOnly,
        }
    }
}

impl Preferences {
    pub fn apply_to(&self, store: &mut AppStore) {
        store.set_is_showing_copper_pours(self.is_showing_copper_pours);
        store.set_is_showing_pcb_groups(self.is_showing_pcb_groups);
        store.set_pcb_group_view_mode(self.pcb_group_view_mode);
    }
}

/// Read a JSON-encoded value, falling back to `default` on any failure.
pub fn read_or_default<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str, default: T) -> T {
    match storage.get_item(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("ignoring corrupt preference {key}: {e}");
            default
        }),
        Ok(None) => default,
        Err(e) => {
            warn!("could not read preference {key}: {e}");
            default
        }
    }
}

/// Write a JSON-encoded value. Failures are logged and dropped.
pub fn write_value<T: Serialize>(storage: &mut dyn KeyValueStorage, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("could not encode preference {key}: {e}");
            return;
        }
    };
    if let Err(e) = storage.set_item(key, &raw) {
        warn!("could not write preference {key}: {e}");
    }
}

pub fn load_preferences(storage: &dyn KeyValueStorage) -> Preferences {
    let d = Preferences::default();
    Preferences {
        is_showing_copper_pours: read_or_default(storage, KEY_SHOW_COPPER_POURS, d.is_showing_copper_pours),
        is_showing_pcb_groups: read_or_default(storage, KEY_SHOW_PCB_GROUPS, d.is_showing_pcb_groups),
        pcb_group_view_mode: read_or_default(storage, KEY_PCB_GROUP_VIEW_MODE, d.pcb_group_view_mode),
    }
}

pub fn save_preferences(storage: &mut dyn KeyValueStorage, prefs: &Preferences) {
    write_value(storage, KEY_SHOW_COPPER_POURS, &prefs.is_showing_copper_pours);
    write_value(storage, KEY_SHOW_PCB_GROUPS, &prefs.is_showing_pcb_groups);
    write_value(storage, KEY_PCB_GROUP_VIEW_MODE, &prefs.pcb_group_view_mode);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("private mode".to_string()))
        }

        fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded)
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(load_preferences(&MemoryStorage::default()), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let mut storage = MemoryStorage::default();
        let prefs = Preferences {
            is_showing_copper_pours: false,
            is_showing_pcb_groups: false,
            pcb_group_view_mode: PcbGroupViewMode::All,
        };
        save_preferences(&mut storage, &prefs);
        assert_eq!(
            storage.get_item(KEY_PCB_GROUP_VIEW_MODE).unwrap().as_deref(),
            Some("\"all\"")
        );
        assert_eq!(load_preferences(&storage), prefs);
    }

    #[test]
    fn test_corrupt_values_fall_back_per_field() {
        let mut storage = MemoryStorage::default();
        storage.set_item(KEY_SHOW_COPPER_POURS, "not json").unwrap();
        storage.set_item(KEY_SHOW_PCB_GROUPS, "false").unwrap();
        storage.set_item(KEY_PCB_GROUP_VIEW_MODE, "\"sideways\"").unwrap();
        let prefs = load_preferences(&storage);
        assert!(prefs.is_showing_copper_pours);
        assert!(!prefs.is_showing_pcb_groups);
        assert_eq!(prefs.pcb_group_view_mode, PcbGroupViewMode::NamedOnly);
    }

    #[test]
    fn test_broken_storage_is_swallowed() {
        let mut storage = BrokenStorage;
        save_preferences(&mut storage, &Preferences::default());
        assert_eq!(load_preferences(&storage), Preferences::default());
    }

    #[test]
    fn test_apply_to_store() {
        let mut store = AppStore::default();
        Preferences {
            is_showing_copper_pours: false,
            is_showing_pcb_groups: true,
            pcb_group_view_mode: PcbGroupViewMode::All,
        }
        .apply_to(&mut store);
        assert!(!store.state().is_showing_copper_pours);
        assert_eq!(store.state().pcb_group_view_mode, PcbGroupViewMode::All);
    }
}
