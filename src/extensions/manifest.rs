//! Extension source units.
//!
//! Each extension is a single `<id>.ext` file in TOML form:
//! - Display metadata (name, version, description, author, icon, category, tags)
//! - `entry`: the registered factory the unit exports
//! - `[settings]`: declared setting defaults
//! - `[config]`: free-form table handed to the factory
//!
//! A file without `entry` is not an extension and is ignored by discovery.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::api::Settings;
use super::error::{ExtensionError, ExtensionResult};
use super::metadata::{title_case, ExtensionMeta};

/// File extension of source units.
pub const UNIT_EXTENSION: &str = "ext";

/// Stems starting with this marker are helpers, never extensions.
pub const RESERVED_PREFIX: char = '_';

/// Fully parsed source unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionSource {
    #[serde(flatten)]
    pub meta: ExtensionMeta,

    /// Name of the factory that instantiates this extension.
    #[serde(default)]
    pub entry: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub config: toml::Table,
}

impl ExtensionSource {
    /// Parse the unit at `path` as extension `id`.
    pub fn load(id: &str, path: &Path) -> ExtensionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(id, &content).map_err(|e| match e {
            ExtensionError::SourceInvalid { message, .. } => ExtensionError::SourceInvalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse unit text. The path in errors is a placeholder; see [`ExtensionSource::load`].
    pub fn parse(id: &str, content: &str) -> ExtensionResult<Self> {
        let mut source: Self =
            toml::from_str(content).map_err(|e| ExtensionError::SourceInvalid {
                path: format!("{id}.{UNIT_EXTENSION}").into(),
                message: e.to_string(),
            })?;

        if source.meta.name.trim().is_empty() {
            source.meta.name = title_case(id);
        }
        source.validate(id)?;
        Ok(source)
    }

    fn validate(&self, id: &str) -> ExtensionResult<()> {
        if let Some(entry) = &self.entry {
            if entry.trim().is_empty() {
                return Err(ExtensionError::SourceInvalid {
                    path: format!("{id}.{UNIT_EXTENSION}").into(),
                    message: "entry must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Read a string value from `[config]`.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

/// Identifier for the unit at `path`, or `None` if it is not a candidate.
pub fn identifier_for(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(UNIT_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || stem.starts_with(RESERVED_PREFIX) {
        return None;
    }
    Some(stem.to_string())
}

/// Candidate units in `dir`, sorted by file name. Missing directories are empty.
pub fn scan_units(dir: &Path) -> Vec<(String, std::path::PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "Cannot scan for extensions: {}", e);
            return Vec::new();
        }
    };

    let mut units: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| identifier_for(&path).map(|id| (id, path)))
        .collect();
    units.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    units
}
