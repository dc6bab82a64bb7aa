//! Turning source units into extension records.
//!
//! Extension code is compiled into the editor and registered by name in a
//! [`FactoryRegistry`]. A source unit selects its factory through `entry`,
//! so loading a unit means: parse it, keep it in the unit table under a
//! namespaced key, look up the factory and instantiate it. Every failure on
//! the way becomes a record in the error state instead of an error.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use super::api::Extension;
use super::error::{ExtensionError, Failure};
use super::isolate::isolate;
use super::manifest::{identifier_for, ExtensionSource};
use super::metadata::parse_static;
use super::record::ExtensionRecord;

/// Creates an extension instance from its parsed unit.
pub type ExtensionFactory = Box<dyn Fn(&ExtensionSource) -> anyhow::Result<Box<dyn Extension>>>;

/// Registered extension factories by entry name.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, ExtensionFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `entry`, replacing any previous one.
    pub fn register<F>(&mut self, entry: &str, factory: F)
    where
        F: Fn(&ExtensionSource) -> anyhow::Result<Box<dyn Extension>> + 'static,
    {
        if self.factories.insert(entry.to_string(), Box::new(factory)).is_some() {
            tracing::debug!(entry, "Replaced extension factory");
        }
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }

    pub fn get(&self, entry: &str) -> Option<&ExtensionFactory> {
        self.factories.get(entry)
    }

    /// Registered entry names, sorted.
    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("entries", &self.entries())
            .finish()
    }
}

/// Key under which a unit is kept in the unit table.
pub fn unit_key(id: &str) -> String {
    format!("ext_{id}")
}

/// Loads units and keeps the table of loaded units.
pub struct Loader {
    registry: FactoryRegistry,
    units: HashMap<String, Rc<ExtensionSource>>,
}

impl Loader {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self {
            registry,
            units: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// The unit currently loaded for `id`.
    pub fn unit(&self, id: &str) -> Option<&Rc<ExtensionSource>> {
        self.units.get(&unit_key(id))
    }

    /// Drop the unit of an uninstalled extension.
    pub fn forget(&mut self, id: &str) {
        self.units.remove(&unit_key(id));
    }

    /// Load the unit at `path`.
    ///
    /// Returns `None` if the file is not an extension at all: wrong file
    /// type, reserved name, or a unit that exports no `entry`. Otherwise a
    /// record is returned, in the error state if anything failed. `enabled`
    /// applies only to records that loaded.
    pub fn load(&mut self, path: &Path, enabled: bool) -> Option<ExtensionRecord> {
        let id = identifier_for(path)?;
        let key = unit_key(&id);

        let unit = match ExtensionSource::load(&id, path) {
            Ok(unit) => Rc::new(unit),
            Err(e) => {
                self.units.remove(&key);
                return Some(self.failed(&id, path, None, e));
            }
        };
        self.units.insert(key, Rc::clone(&unit));

        let Some(entry) = unit.entry.clone() else {
            tracing::debug!(extension = %id, "Unit exports no entry; not an extension");
            self.units.remove(&unit_key(&id));
            return None;
        };

        let Some(factory) = self.registry.get(&entry) else {
            let error = ExtensionError::UnknownEntry {
                extension: id.clone(),
                entry,
            };
            return Some(self.failed(&id, path, Some(unit), error));
        };

        match isolate(|| factory(&unit)) {
            Ok(instance) => {
                tracing::debug!(extension = %id, entry = %entry, "Instantiated extension");
                Some(ExtensionRecord::loaded(id, path.to_path_buf(), unit, instance, enabled))
            }
            Err(message) => {
                let error = ExtensionError::LoadFailed {
                    extension: id.clone(),
                    message,
                };
                Some(self.failed(&id, path, Some(unit), error))
            }
        }
    }

    fn failed(
        &self,
        id: &str,
        path: &Path,
        unit: Option<Rc<ExtensionSource>>,
        error: ExtensionError,
    ) -> ExtensionRecord {
        tracing::error!(extension = %id, path = %path.display(), "Failed to load extension: {}", error);
        let meta = unit
            .as_ref()
            .map(|unit| unit.meta.clone())
            .unwrap_or_else(|| parse_static(path));
        ExtensionRecord::failed(id.to_string(), path.to_path_buf(), unit, meta, Failure::load(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::error::FailureKind;
    use crate::extensions::testing::{sample_registry, write_unit, EventLog};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_valid_unit() {
        let temp = tempdir().unwrap();
        let path = write_unit(temp.path(), "alpha", "sample", "");
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        let record = loader.load(&path, true).unwrap();
        assert_eq!(record.id(), "alpha");
        assert!(record.has_instance());
        assert!(record.error().is_none());
        assert!(record.enabled());
        assert_eq!(record.meta().name, "Alpha");
        assert!(loader.unit("alpha").is_some());
    }

    #[test]
    fn test_load_skips_non_extensions() {
        let temp = tempdir().unwrap();
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        let reserved = write_unit(temp.path(), "_shared", "sample", "");
        assert!(loader.load(&reserved, true).is_none());

        let no_entry = temp.path().join("notes.ext");
        fs::write(&no_entry, "name = \"Notes\"\n").unwrap();
        assert!(loader.load(&no_entry, true).is_none());
        assert!(loader.unit("notes").is_none());
    }

    #[test]
    fn test_instantiate_failure_becomes_error_record() {
        let temp = tempdir().unwrap();
        let path = write_unit(temp.path(), "bravo", "sample", "fail = \"instantiate\"");
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        let record = loader.load(&path, true).unwrap();
        let error = record.error().unwrap();
        assert_eq!(error.kind, FailureKind::Load);
        assert!(error.message.contains("instantiate refused"));
        assert!(!record.enabled());
        assert!(!record.has_instance());
        assert_eq!(record.meta().name, "Bravo");
    }

    #[test]
    fn test_instantiate_panic_becomes_error_record() {
        let temp = tempdir().unwrap();
        let path = write_unit(temp.path(), "charlie", "sample", "fail = \"instantiate-panic\"");
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        let record = loader.load(&path, true).unwrap();
        assert!(record.error().unwrap().message.contains("panicked"));
    }

    #[test]
    fn test_unknown_entry_and_bad_toml() {
        let temp = tempdir().unwrap();
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        let path = write_unit(temp.path(), "delta", "does-not-exist", "");
        let record = loader.load(&path, true).unwrap();
        assert!(record.error().unwrap().message.contains("does-not-exist"));

        let broken = temp.path().join("echo.ext");
        fs::write(&broken, "name = \"Echo\"\nversion = \"2.0\"\nentry = [\n").unwrap();
        let record = loader.load(&broken, true).unwrap();
        assert!(record.load_failed());
        // Metadata still comes from the static scan.
        assert_eq!(record.meta().name, "Echo");
        assert_eq!(record.meta().version, "2.0");
        assert!(loader.unit("echo").is_none());
    }

    #[test]
    fn test_reload_replaces_unit() {
        let temp = tempdir().unwrap();
        let path = write_unit(temp.path(), "foxtrot", "sample", "");
        let mut loader = Loader::new(sample_registry(&EventLog::default()));

        loader.load(&path, true).unwrap();
        let first = Rc::clone(loader.unit("foxtrot").unwrap());

        fs::write(&path, "name = \"Foxtrot 2\"\nentry = \"sample\"\n").unwrap();
        let record = loader.load(&path, true).unwrap();
        let second = loader.unit("foxtrot").unwrap();
        assert!(!Rc::ptr_eq(&first, second));
        assert_eq!(record.meta().name, "Foxtrot 2");

        loader.forget("foxtrot");
        assert!(loader.unit("foxtrot").is_none());
    }

    #[test]
    fn test_registry_entries() {
        let registry = sample_registry(&EventLog::default());
        assert!(registry.contains("sample"));
        assert_eq!(registry.entries(), vec!["sample"]);
        assert_eq!(unit_key("minimap"), "ext_minimap");
    }
}
