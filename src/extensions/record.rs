//! Bookkeeping for one installed extension.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use super::api::{Extension, KeyBindings, Settings};
use super::error::{Failure, FailureKind};
use super::manifest::ExtensionSource;
use super::metadata::ExtensionMeta;
use super::ExtensionId;

/// Effective state of an extension as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    /// Loaded, enabled and activated without error.
    Active,
    /// Loaded but disabled.
    Inactive,
    /// Load or activation failed. Never receives events.
    Error,
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// A loaded (or failed) extension.
pub struct ExtensionRecord {
    pub(crate) id: ExtensionId,
    pub(crate) path: PathBuf,
    pub(crate) unit: Option<Rc<ExtensionSource>>,
    pub(crate) instance: Option<Box<dyn Extension>>,
    pub(crate) enabled: bool,
    pub(crate) error: Option<Failure>,
    pub(crate) meta: ExtensionMeta,
    pub(crate) bindings: KeyBindings,
}

impl ExtensionRecord {
    pub(crate) fn loaded(
        id: ExtensionId,
        path: PathBuf,
        unit: Rc<ExtensionSource>,
        instance: Box<dyn Extension>,
        enabled: bool,
    ) -> Self {
        let meta = unit.meta.clone();
        Self {
            id,
            path,
            unit: Some(unit),
            instance: Some(instance),
            enabled,
            error: None,
            meta,
            bindings: KeyBindings::default(),
        }
    }

    /// A record for a unit that failed to load. It is kept so the failure is
    /// visible, but it is disabled and has no instance.
    pub(crate) fn failed(
        id: ExtensionId,
        path: PathBuf,
        unit: Option<Rc<ExtensionSource>>,
        meta: ExtensionMeta,
        failure: Failure,
    ) -> Self {
        Self {
            id,
            path,
            unit,
            instance: None,
            enabled: false,
            error: Some(failure),
            meta,
            bindings: KeyBindings::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn meta(&self) -> &ExtensionMeta {
        &self.meta
    }

    /// Persisted enable flag. May be stale-true for a record in error.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn error(&self) -> Option<&Failure> {
        self.error.as_ref()
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// True if the unit itself could not be loaded.
    pub fn load_failed(&self) -> bool {
        matches!(self.error, Some(Failure { kind: FailureKind::Load, .. }))
    }

    /// Whether this record receives events.
    pub fn is_active(&self) -> bool {
        self.enabled && self.error.is_none() && self.instance.is_some()
    }

    /// Whether the instance may hold editor state that `deactivate` must undo.
    pub(crate) fn needs_deactivation(&self) -> bool {
        self.enabled && self.instance.is_some()
    }

    pub fn state(&self) -> ExtensionState {
        if self.error.is_some() || self.instance.is_none() {
            ExtensionState::Error
        } else if self.enabled {
            ExtensionState::Active
        } else {
            ExtensionState::Inactive
        }
    }

    /// Number of key bindings currently registered by the instance.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Declared settings: unit `[settings]` overlaid by the instance's own.
    pub fn default_settings(&self) -> Settings {
        let mut defaults = self
            .unit
            .as_ref()
            .map(|unit| unit.settings.clone())
            .unwrap_or_default();
        if let Some(instance) = &self.instance {
            defaults.extend(instance.default_settings());
        }
        defaults
    }

    pub fn has_settings(&self) -> bool {
        !self.default_settings().is_empty()
    }
}

impl fmt::Debug for ExtensionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("enabled", &self.enabled)
            .field("error", &self.error)
            .field("instance", &self.instance.is_some())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
