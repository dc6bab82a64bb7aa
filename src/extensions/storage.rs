//! Extension settings backend.
//!
//! Provides persistent key-value settings for extensions. Each extension
//! gets its own JSON file named after its identifier. Files are loaded
//! lazily on first access and written through on every change.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};

use super::api::Settings;
use super::error::{ExtensionError, ExtensionResult};

/// Settings of all extensions, keyed by extension identifier.
///
/// Only persisted values are cached; declared defaults are supplied by the
/// caller on every read so that a reloaded extension's new defaults take
/// effect immediately.
pub struct SettingsStore {
    /// Directory holding one `<id>.json` file per extension.
    dir: PathBuf,
    /// Persisted values by extension, materialized on first access.
    cache: HashMap<String, Map<String, Value>>,
}

impl SettingsStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
        }
    }

    /// Path of the settings file for `extension_id`.
    pub fn path_for(&self, extension_id: &str) -> PathBuf {
        self.dir.join(format!("{extension_id}.json"))
    }

    fn persisted(&mut self, extension_id: &str) -> &mut Map<String, Value> {
        if !self.cache.contains_key(extension_id) {
            let loaded = self.load_file(extension_id);
            self.cache.insert(extension_id.to_string(), loaded);
        }
        self.cache.entry(extension_id.to_string()).or_default()
    }

    fn load_file(&self, extension_id: &str) -> Map<String, Value> {
        let path = self.path_for(extension_id);
        if !path.exists() {
            return Map::new();
        }

        let parsed = fs::read_to_string(&path)
            .map_err(ExtensionError::from)
            .and_then(|contents| serde_json::from_str::<Map<String, Value>>(&contents).map_err(ExtensionError::from));
        match parsed {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(
                    extension = %extension_id,
                    path = %path.display(),
                    "Ignoring unreadable settings file: {}",
                    e
                );
                Map::new()
            }
        }
    }

    /// Get a setting: persisted value, else the declared default.
    pub fn get(&mut self, extension_id: &str, key: &str, defaults: &Settings) -> Option<Value> {
        self.persisted(extension_id)
            .get(key)
            .cloned()
            .or_else(|| defaults.get(key).cloned())
    }

    /// All settings of an extension: declared defaults overridden by persisted values.
    pub fn values(&mut self, extension_id: &str, defaults: &Settings) -> Settings {
        let mut merged = defaults.clone();
        for (key, value) in self.persisted(extension_id).iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Set a setting.
    ///
    /// The value is immediately written to disk.
    pub fn set(&mut self, extension_id: &str, key: &str, value: Value) -> ExtensionResult<()> {
        self.persisted(extension_id).insert(key.to_string(), value);
        self.flush(extension_id)
    }

    /// Remove a persisted value so the declared default applies again.
    pub fn reset(&mut self, extension_id: &str, key: &str) -> ExtensionResult<()> {
        if self.persisted(extension_id).remove(key).is_some() {
            self.flush(extension_id)?;
        }
        Ok(())
    }

    /// Drop the cache and the file of an extension.
    pub fn purge(&mut self, extension_id: &str) -> ExtensionResult<()> {
        self.cache.remove(extension_id);
        let path = self.path_for(extension_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Forget everything cached; the next access reads from disk again.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn flush(&self, extension_id: &str) -> ExtensionResult<()> {
        let Some(values) = self.cache.get(extension_id) else {
            return Ok(());
        };

        fs::create_dir_all(&self.dir).map_err(|e| ExtensionError::Persistence {
            what: format!("settings of '{extension_id}'"),
            message: format!("Failed to create settings directory: {e}"),
        })?;

        let contents = serde_json::to_string_pretty(values)?;
        fs::write(self.path_for(extension_id), contents).map_err(|e| ExtensionError::Persistence {
            what: format!("settings of '{extension_id}'"),
            message: e.to_string(),
        })
    }
}
