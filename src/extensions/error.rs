//! Error types for the extension system.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the extension system.
///
/// None of these ever reach the editor as a panic or a hard failure: the
/// manager logs them and records them on the affected extension.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Extension '{0}' not found")]
    ExtensionNotFound(String),

    #[error("Invalid extension source {path}: {message}")]
    SourceInvalid { path: PathBuf, message: String },

    #[error("No factory registered for entry '{entry}' (extension '{extension}')")]
    UnknownEntry { extension: String, entry: String },

    #[error("Failed to load extension '{extension}': {message}")]
    LoadFailed { extension: String, message: String },

    #[error("Extension '{extension}' failed to activate: {message}")]
    ActivationFailed { extension: String, message: String },

    #[error("Hook '{hook}' failed in extension '{extension}': {message}")]
    HookFailed {
        extension: String,
        hook: &'static str,
        message: String,
    },

    #[error("Extension '{0}' is already installed")]
    AlreadyInstalled(String),

    #[error("Extension '{0}' is not active")]
    Inactive(String),

    #[error("Failed to persist {what}: {message}")]
    Persistence { what: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Which lifecycle step put a record into the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The unit could not be read, parsed or instantiated.
    Load,
    /// The instance exists but its `activate` hook failed.
    Activation,
}

/// Failure detail stored on an extension record for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn load(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Load,
            message: message.into(),
        }
    }

    pub fn activation(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Activation,
            message: message.into(),
        }
    }

    /// Convert into the matching [`ExtensionError`] for `extension`.
    pub fn into_error(self, extension: &str) -> ExtensionError {
        match self.kind {
            FailureKind::Load => ExtensionError::LoadFailed {
                extension: extension.to_string(),
                message: self.message,
            },
            FailureKind::Activation => ExtensionError::ActivationFailed {
                extension: extension.to_string(),
                message: self.message,
            },
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Load => write!(f, "load failed: {}", self.message),
            FailureKind::Activation => write!(f, "activation failed: {}", self.message),
        }
    }
}
