//! Persisted enable/disable state.
//!
//! One JSON document maps every known extension identifier to whether the
//! user wants it enabled. It is rewritten as a whole after each change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ExtensionError, ExtensionResult};

/// Persistent storage for enable flags.
///
/// Stored in `<install dir>/extensions.json`.
#[derive(Debug)]
pub struct EnableState {
    /// Path to the state file.
    path: PathBuf,

    /// Enable flag by extension ID. Sorted so the file diffs cleanly.
    states: BTreeMap<String, bool>,
}

impl EnableState {
    /// Create a state store with a custom path, loading it if present.
    pub fn with_path(path: PathBuf) -> Self {
        let states = Self::load_from_path(&path).unwrap_or_default();
        Self { path, states }
    }

    /// Load states from a file. Unreadable or corrupt files yield `None`.
    fn load_from_path(path: &Path) -> Option<BTreeMap<String, bool>> {
        if !path.exists() {
            return None;
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| tracing::warn!(path = %path.display(), "Failed to read extension state: {}", e))
            .ok()?;
        serde_json::from_str(&contents)
            .map_err(|e| tracing::warn!(path = %path.display(), "Ignoring corrupt extension state: {}", e))
            .ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted preference for an extension, if it was ever recorded.
    pub fn get(&self, extension_id: &str) -> Option<bool> {
        self.states.get(extension_id).copied()
    }

    /// Preference for an extension; first-seen extensions are enabled.
    pub fn is_enabled(&self, extension_id: &str) -> bool {
        self.get(extension_id).unwrap_or(true)
    }

    /// Replace the whole table and write it to disk.
    pub fn save<I>(&mut self, states: I) -> ExtensionResult<()>
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        self.states = states.into_iter().collect();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtensionError::Persistence {
                what: "extension state".to_string(),
                message: format!("Failed to create directory: {e}"),
            })?;
        }

        let contents = serde_json::to_string_pretty(&self.states)?;
        fs::write(&self.path, contents).map_err(|e| ExtensionError::Persistence {
            what: "extension state".to_string(),
            message: format!("Write failed: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_defaults_to_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let state = EnableState::with_path(temp_dir.path().join("extensions.json"));

        assert_eq!(state.get("minimap"), None);
        assert!(state.is_enabled("minimap"));
    }

    #[test]
    fn test_state_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("extensions.json");

        let mut state = EnableState::with_path(path.clone());
        state
            .save(vec![("minimap".to_string(), false), ("word_count".to_string(), true)])
            .unwrap();

        let state2 = EnableState::with_path(path.clone());
        assert_eq!(state2.get("minimap"), Some(false));
        assert!(state2.is_enabled("word_count"));

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.find("minimap").unwrap() < contents.find("word_count").unwrap());
    }

    #[test]
    fn test_state_save_replaces_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = EnableState::with_path(temp_dir.path().join("extensions.json"));

        state.save(vec![("a".to_string(), true)]).unwrap();
        state.save(Vec::new()).unwrap();
        assert_eq!(state.get("a"), None);
        assert_eq!(EnableState::with_path(state.path().to_path_buf()).get("a"), None);
    }

    #[test]
    fn test_corrupt_state_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("extensions.json");
        fs::write(&path, "[1, 2").unwrap();

        let state = EnableState::with_path(path);
        assert!(state.is_enabled("anything"));
    }
}
