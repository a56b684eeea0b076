//! Persisted operator settings
//!
//! Two scalars survive restarts: whether message content is logged, and
//! which sink (if any) batches are delivered to. Storage is behind
//! [`SettingsStore`] so hosts can plug in their own configuration layer.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CmdLogError, CmdLogResult};

/// Persisted settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log full message content (default false)
    pub log_content: bool,
    /// Sink to deliver batches to (default none)
    pub sink_id: Option<u64>,
}

/// Configuration persistence collaborator
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> CmdLogResult<Settings>;
    fn save(&self, settings: &Settings) -> CmdLogResult<()>;
}

/// Settings held in memory only
#[derive(Default)]
pub struct MemorySettings {
    settings: Mutex<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> CmdLogResult<Settings> {
        Ok(self.settings.lock().clone())
    }

    fn save(&self, settings: &Settings) -> CmdLogResult<()> {
        *self.settings.lock() = settings.clone();
        Ok(())
    }
}

/// Settings stored as a pretty-printed JSON file
///
/// A missing file reads as the defaults.
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> CmdLogResult<Settings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }

        let bytes = std::fs::read(&self.path)
            .map_err(|e| CmdLogError::Settings(format!("Failed to read settings file: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, settings: &Settings) -> CmdLogResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CmdLogError::Settings(format!("Failed to create settings dir: {}", e))
            })?;
        }

        let json = serde_json::to_vec_pretty(settings)?;
        std::fs::write(&self.path, json)
            .map_err(|e| CmdLogError::Settings(format!("Failed to write settings file: {}", e)))?;

        info!(path = %self.path.display(), "Saved cmdlog settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.log_content);
        assert!(settings.sink_id.is_none());
    }

    #[test]
    fn test_memory_settings() {
        let store = MemorySettings::default();
        assert_eq!(store.load().unwrap(), Settings::default());

        let updated = Settings {
            log_content: true,
            sink_id: Some(5),
        };
        store.save(&updated).unwrap();
        assert_eq!(store.load().unwrap(), updated);
    }

    #[test]
    fn test_json_file_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettings::new(dir.path().join("settings.json"));
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_json_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileSettings::new(&path);
        let settings = Settings {
            log_content: true,
            sink_id: Some(418078199982063626),
        };
        store.save(&settings).unwrap();

        // A fresh handle sees the saved values
        let reopened = JsonFileSettings::new(&path);
        assert_eq!(reopened.load().unwrap(), settings);
    }

    #[test]
    fn test_json_file_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, br#"{"log_content": true}"#).unwrap();

        let loaded = JsonFileSettings::new(&path).load().unwrap();
        assert!(loaded.log_content);
        assert!(loaded.sink_id.is_none());
    }

    #[test]
    fn test_json_file_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            JsonFileSettings::new(&path).load(),
            Err(CmdLogError::Serialization(_))
        ));
    }
}
