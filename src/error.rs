//! Error types for the editor core.
//!
//! Extension failures have their own [`ExtensionError`]; this type covers
//! the layers around it (configuration, CLI).

use thiserror::Error;

use crate::extensions::ExtensionError;

/// Errors that can occur outside the extension subsystem
#[derive(Debug, Error)]
pub enum SccError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extension subsystem errors
    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config write error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias for editor operations
pub type SccResult<T> = Result<T, SccError>;
