//! Application-local key-value settings: in-memory for tests, JSON file for hosts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Key-value settings store holding text and binary entries.
pub trait SettingsStore {
    fn string(&self, key: &str) -> Option<String>;
    fn data(&self, key: &str) -> Option<Vec<u8>>;
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn set_data(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// One stored value.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Text(String),
    Data(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("identity encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

fn text_of(map: &BTreeMap<String, SettingValue>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(SettingValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn data_of(map: &BTreeMap<String, SettingValue>, key: &str) -> Option<Vec<u8>> {
    match map.get(key) {
        Some(SettingValue::Data(d)) => Some(d.clone()),
        _ => None,
    }
}

/// Settings kept in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: BTreeMap<String, SettingValue>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn string(&self, key: &str) -> Option<String> {
        text_of(&self.values, key)
    }

    fn data(&self, key: &str) -> Option<Vec<u8>> {
        data_of(&self.values, key)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), SettingValue::Text(value.to_string()));
        Ok(())
    }

    fn set_data(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), SettingValue::Data(value.to_vec()));
        Ok(())
    }
}

/// Settings persisted as a JSON map. The whole file is rewritten on every set.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl FileSettings {
    /// Open the settings file. A missing file starts empty; an unreadable one is logged and
    /// starts empty (it is overwritten on the next set).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings file");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn string(&self, key: &str) -> Option<String> {
        text_of(&self.values, key)
    }

    fn data(&self, key: &str) -> Option<Vec<u8>> {
        data_of(&self.values, key)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), SettingValue::Text(value.to_string()));
        self.flush()
    }

    fn set_data(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), SettingValue::Data(value.to_vec()));
        self.flush()
    }
}
