use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SccError, SccResult};
use crate::extensions::ExtensionHostConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extensions: ExtensionsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Install directory; `~` is expanded.
    pub directory: String,
    /// Marketplace directory; `~` is expanded.
    pub marketplace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            directory: "~/.config/scc/extensions".to_string(),
            marketplace: "~/.config/scc/marketplace".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scc=info".to_string(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                // Fallback: ~ is not expanded by PathBuf, so use dirs::home_dir
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("scc")
            .join("config.toml")
    }

    /// Load config from the default path, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`. A missing or broken file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::read(path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to load config, using defaults: {}", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    fn read(path: &Path) -> SccResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Replace blank values with their defaults
    fn validate(&mut self) {
        let defaults = ExtensionsConfig::default();
        if self.extensions.directory.trim().is_empty() {
            self.extensions.directory = defaults.directory;
        }
        if self.extensions.marketplace.trim().is_empty() {
            self.extensions.marketplace = defaults.marketplace;
        }
        if self.logging.filter.trim().is_empty() {
            self.logging.filter = LoggingConfig::default().filter;
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> SccResult<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> SccResult<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SccError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Filesystem layout of the extension host.
    pub fn extension_host_config(&self) -> ExtensionHostConfig {
        ExtensionHostConfig::new(
            expand_path(&self.extensions.directory),
            expand_path(&self.extensions.marketplace),
        )
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = tempdir().unwrap();
        let config = Config::load_from(&temp.path().join("config.toml"));
        assert_eq!(config, Config::default());
        assert_eq!(config.logging.filter, "scc=info");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[extensions]\ndirectory = \"/opt/scc/ext\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.extensions.directory, "/opt/scc/ext");
        assert_eq!(config.extensions.marketplace, ExtensionsConfig::default().marketplace);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[extensions\n").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_blank_values_are_replaced() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[logging]\nfilter = \"  \"\n").unwrap();
        assert_eq!(Config::load_from(&path).logging.filter, "scc=info");
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/config.toml");
        let mut config = Config::default();
        config.extensions.marketplace = "/srv/market".to_string();
        config.logging.filter = "scc=debug".to_string();

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_extension_host_config_layout() {
        let mut config = Config::default();
        config.extensions.directory = "/opt/scc/ext".to_string();
        config.extensions.marketplace = "/opt/scc/market".to_string();

        let host = config.extension_host_config();
        assert_eq!(host.install_dir, PathBuf::from("/opt/scc/ext"));
        assert_eq!(host.catalog_dir, PathBuf::from("/opt/scc/market"));
        assert_eq!(host.settings_dir, PathBuf::from("/opt/scc/ext/settings"));
        assert_eq!(host.state_file, PathBuf::from("/opt/scc/ext/extensions.json"));
    }

    #[test]
    fn test_tilde_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let host = Config::default().extension_host_config();
        assert!(host.install_dir.starts_with(home));
    }
}
