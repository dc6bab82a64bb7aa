//! Extension manager - owns every extension record.
//!
//! The ExtensionManager is responsible for:
//! - Scanning the install directory and loading units
//! - Activating and deactivating extensions against the editor
//! - Persisting enable state and per-extension settings
//! - Hot-reloading, installing and uninstalling extensions
//! - Running the one-shot shutdown sequence

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use super::api::{EditorHost, MenuBuilder, Settings};
use super::dispatch::{hook_failed, run_hook};
use super::error::{ExtensionError, ExtensionResult, Failure};
use super::loader::{FactoryRegistry, Loader};
use super::manifest::scan_units;
use super::marketplace::{Catalog, MarketplaceEntry};
use super::metadata::parse_static;
use super::record::ExtensionRecord;
use super::state::EnableState;
use super::storage::SettingsStore;
use super::ExtensionId;

/// Filesystem layout of the extension host.
#[derive(Debug, Clone)]
pub struct ExtensionHostConfig {
    /// Directory containing installed extension units.
    pub install_dir: PathBuf,

    /// Directory containing marketplace units.
    pub catalog_dir: PathBuf,

    /// Directory holding one settings file per extension.
    pub settings_dir: PathBuf,

    /// File holding the enable flag of every extension.
    pub state_file: PathBuf,
}

impl ExtensionHostConfig {
    /// Standard layout: settings and state live inside the install directory.
    pub fn new(install_dir: PathBuf, catalog_dir: PathBuf) -> Self {
        Self {
            settings_dir: install_dir.join("settings"),
            state_file: install_dir.join("extensions.json"),
            install_dir,
            catalog_dir,
        }
    }
}

impl Default for ExtensionHostConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("scc");
        Self::new(data_dir.join("extensions"), data_dir.join("marketplace"))
    }
}

/// The extension manager.
pub struct ExtensionManager<H: EditorHost> {
    pub(super) config: ExtensionHostConfig,

    /// The editor every hook receives.
    pub(super) host: H,

    /// Factories and loaded units.
    pub(super) loader: Loader,

    /// Records by extension ID.
    pub(super) records: HashMap<ExtensionId, ExtensionRecord>,

    /// Discovery order; dispatch follows it.
    pub(super) order: Vec<ExtensionId>,

    pub(super) state: EnableState,

    pub(super) settings: SettingsStore,

    pub(super) catalog: Catalog,

    /// Set once `shutdown_all` has started.
    pub(super) shutting_down: bool,
}

impl<H: EditorHost> ExtensionManager<H> {
    /// Bring up the extension subsystem and activate enabled extensions.
    pub fn initialize(host: H, config: ExtensionHostConfig, registry: FactoryRegistry) -> Self {
        tracing::info!("Initialising extension subsystem");

        let mut manager = Self {
            state: EnableState::with_path(config.state_file.clone()),
            settings: SettingsStore::new(config.settings_dir.clone()),
            catalog: Catalog::new(config.catalog_dir.clone()),
            config,
            host,
            loader: Loader::new(registry),
            records: HashMap::new(),
            order: Vec::new(),
            shutting_down: false,
        };

        manager.ensure_dirs();
        manager.discover_and_load();

        let active = manager.active_ids();
        tracing::info!(
            "Extension subsystem ready, {} extension(s) active: {}",
            active.len(),
            if active.is_empty() {
                "(none)".to_string()
            } else {
                active.join(", ")
            }
        );
        manager
    }

    fn ensure_dirs(&self) {
        for dir in [
            &self.config.install_dir,
            &self.config.catalog_dir,
            &self.config.settings_dir,
        ] {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), "Failed to create extension directory: {}", e);
            }
        }
    }

    /// Load every unit in the install directory that is not tracked yet.
    pub fn discover_and_load(&mut self) {
        for (id, path) in scan_units(&self.config.install_dir) {
            if self.records.contains_key(&id) {
                continue;
            }
            tracing::debug!(extension = %id, path = %path.display(), "Discovered extension file");

            let enabled = self.state.is_enabled(&id);
            if let Some(record) = self.loader.load(&path, enabled) {
                self.track(record);
            }
        }
    }

    /// Add a freshly loaded record and activate it if enabled.
    fn track(&mut self, mut record: ExtensionRecord) {
        if record.enabled {
            activate_record(&mut self.host, &mut self.settings, &mut record);
        }
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record);
    }

    pub fn enable(&mut self, id: &str) {
        let Some(record) = self.records.get_mut(id) else {
            tracing::warn!(extension = %id, "Cannot enable unknown extension");
            return;
        };
        if record.enabled {
            return;
        }

        record.enabled = true;
        activate_record(&mut self.host, &mut self.settings, record);
        self.persist_state();
    }

    pub fn disable(&mut self, id: &str) {
        let Some(record) = self.records.get_mut(id) else {
            tracing::warn!(extension = %id, "Cannot disable unknown extension");
            return;
        };
        if !record.enabled {
            return;
        }

        deactivate_record(&mut self.host, &mut self.settings, record);
        record.enabled = false;
        self.persist_state();
    }

    /// Replace an extension's unit and instance from disk.
    ///
    /// There is no rollback: if the new unit fails, the old instance is
    /// gone and the record is left in the error state.
    pub fn reload_extension(&mut self, id: &str) {
        let Some(record) = self.records.get_mut(id) else {
            tracing::warn!(extension = %id, "Cannot reload unknown extension");
            return;
        };

        let enabled = if record.load_failed() {
            self.state.is_enabled(id)
        } else {
            record.enabled
        };
        if record.needs_deactivation() {
            deactivate_record(&mut self.host, &mut self.settings, record);
        }

        tracing::info!(extension = %id, "Reloading extension");
        let path = record.path.clone();
        *record = self.loader.load(&path, enabled).unwrap_or_else(|| {
            tracing::error!(extension = %id, "Reloaded unit no longer exports an extension");
            ExtensionRecord::failed(
                id.to_string(),
                path.clone(),
                None,
                parse_static(&path),
                Failure::load("unit no longer exports an extension entry"),
            )
        });

        if record.enabled {
            activate_record(&mut self.host, &mut self.settings, record);
        }
        self.persist_state();
    }

    /// Reload every tracked extension, then pick up new units.
    pub fn reload_all(&mut self) {
        for id in self.order.clone() {
            self.reload_extension(&id);
        }
        self.discover_and_load();
    }

    /// Remove an extension, its unit file and its settings.
    ///
    /// File removal is best-effort. Returns false for an unknown id.
    pub fn uninstall(&mut self, id: &str) -> bool {
        let Some(mut record) = self.records.remove(id) else {
            tracing::warn!(extension = %id, "Cannot uninstall unknown extension");
            return false;
        };
        self.order.retain(|tracked| tracked != id);

        if record.needs_deactivation() {
            deactivate_record(&mut self.host, &mut self.settings, &mut record);
        }

        if let Err(e) = fs::remove_file(&record.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(extension = %id, path = %record.path.display(), "Failed to remove unit: {}", e);
            }
        }
        if let Err(e) = self.settings.purge(id) {
            tracing::warn!(extension = %id, "Failed to remove settings: {}", e);
        }
        self.loader.forget(id);
        drop(record);

        tracing::info!(extension = %id, "Uninstalled extension");
        self.persist_state();
        true
    }

    /// Copy a marketplace unit into the install directory and load it.
    ///
    /// Never overwrites. Returns true if the extension loaded and activated
    /// (or is disabled) without error. A unit that loads with an error is
    /// still tracked so the failure is visible.
    pub fn install_from_catalog(&mut self, entry: &MarketplaceEntry) -> bool {
        match self.copy_and_track(entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(extension = %entry.id, "Install failed: {}", e);
                false
            }
        }
    }

    /// Install the marketplace unit `id`, reporting why it did not work.
    pub fn install(&mut self, id: &str) -> ExtensionResult<()> {
        if self.records.contains_key(id) {
            return Err(ExtensionError::AlreadyInstalled(id.to_string()));
        }
        let entry = self
            .catalog
            .find(id, |id| self.records.contains_key(id))
            .ok_or_else(|| ExtensionError::ExtensionNotFound(id.to_string()))?;
        self.copy_and_track(&entry)
    }

    fn copy_and_track(&mut self, entry: &MarketplaceEntry) -> ExtensionResult<()> {
        let id = entry.id.as_str();
        if self.records.contains_key(id) {
            return Err(ExtensionError::AlreadyInstalled(id.to_string()));
        }

        let file_name = entry.path.file_name().ok_or_else(|| ExtensionError::SourceInvalid {
            path: entry.path.clone(),
            message: "not a file".to_string(),
        })?;
        let dest = self.config.install_dir.join(file_name);
        if dest.exists() {
            tracing::warn!(extension = %id, path = %dest.display(), "Refusing to overwrite existing unit");
            return Err(ExtensionError::AlreadyInstalled(id.to_string()));
        }

        fs::create_dir_all(&self.config.install_dir)?;
        fs::copy(&entry.path, &dest)?;

        let enabled = self.state.is_enabled(id);
        let Some(record) = self.loader.load(&dest, enabled) else {
            if let Err(e) = fs::remove_file(&dest) {
                tracing::warn!(extension = %id, "Failed to remove copied unit: {}", e);
            }
            return Err(ExtensionError::SourceInvalid {
                path: entry.path.clone(),
                message: "unit does not export an extension entry".to_string(),
            });
        };

        let id = record.id.clone();
        self.track(record);
        self.persist_state();
        tracing::info!(extension = %id, "Installed extension from marketplace");
        self.health(&id)
    }

    /// Deactivate everything and run every `on_shutdown` hook once.
    ///
    /// Safe to call from both the normal and the abnormal close path; only
    /// the first call does anything.
    pub fn shutdown_all(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        tracing::info!("Shutting down {} extension(s)", self.records.len());

        for id in &self.order {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };
            if record.needs_deactivation() {
                deactivate_record(&mut self.host, &mut self.settings, record);
            }
            if let Some(Err(message)) = run_hook(&mut self.host, &mut self.settings, record, |ext, cx| {
                ext.on_shutdown(cx)
            }) {
                tracing::error!(extension = %id, "{}", hook_failed(id, "on_shutdown", message));
            }
        }

        self.persist_state();
        tracing::info!("All extensions shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Route a key binding or menu action to the extension that owns it.
    ///
    /// Returns false if the extension is not active or the action failed.
    pub fn invoke_action(&mut self, id: &str, action: &str) -> bool {
        match self.run_action(id, action) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(extension = %id, action, "{}", e);
                false
            }
        }
    }

    /// Like [`ExtensionManager::invoke_action`], with the reason on failure.
    pub fn run_action(&mut self, id: &str, action: &str) -> ExtensionResult<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(id.to_string()))?;
        if let Some(failure) = &record.error {
            return Err(failure.clone().into_error(id));
        }
        if !record.is_active() || self.shutting_down {
            return Err(ExtensionError::Inactive(id.to_string()));
        }

        match run_hook(&mut self.host, &mut self.settings, record, |ext, cx| ext.on_action(cx, action)) {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => Err(hook_failed(id, "on_action", message)),
            None => Err(ExtensionError::Inactive(id.to_string())),
        }
    }

    /// Write the enable flag of every record.
    ///
    /// A record that failed to load keeps its previous preference, so a
    /// broken unit that gets fixed comes back the way the user left it.
    fn persist_state(&mut self) {
        let states: Vec<(String, bool)> = self
            .order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| {
                let enabled = if record.load_failed() && !record.enabled {
                    self.state.is_enabled(&record.id)
                } else {
                    record.enabled
                };
                (record.id.clone(), enabled)
            })
            .collect();

        if let Err(e) = self.state.save(states) {
            tracing::warn!(path = %self.state.path().display(), "Failed to save extension state: {}", e);
        }
    }

    /// Read a setting of an extension: persisted value, else declared default.
    pub fn get_setting(&mut self, id: &str, key: &str) -> Option<Value> {
        let defaults = self.declared_settings(id);
        self.settings.get(id, key, &defaults)
    }

    /// Persist a setting of an installed extension.
    pub fn set_setting(&mut self, id: &str, key: &str, value: Value) -> ExtensionResult<()> {
        if !self.records.contains_key(id) {
            return Err(ExtensionError::ExtensionNotFound(id.to_string()));
        }
        self.settings.set(id, key, value)
    }

    /// Drop a persisted setting so the declared default applies again.
    pub fn reset_setting(&mut self, id: &str, key: &str) -> ExtensionResult<()> {
        if !self.records.contains_key(id) {
            return Err(ExtensionError::ExtensionNotFound(id.to_string()));
        }
        self.settings.reset(id, key)
    }

    /// All settings of an extension, defaults merged with persisted values.
    pub fn settings(&mut self, id: &str) -> Option<Settings> {
        let defaults = self.records.get(id)?.default_settings();
        Some(self.settings.values(id, &defaults))
    }

    fn declared_settings(&self, id: &str) -> Settings {
        self.records
            .get(id)
            .map(ExtensionRecord::default_settings)
            .unwrap_or_default()
    }

    /// `Ok` if the extension is installed and not in the error state.
    pub fn health(&self, id: &str) -> ExtensionResult<()> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(id.to_string()))?;
        match &record.error {
            Some(failure) => Err(failure.clone().into_error(id)),
            None => Ok(()),
        }
    }

    /// Installed extensions in discovery order.
    pub fn list_installed(&self) -> impl Iterator<Item = &ExtensionRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Marketplace units that are not installed.
    pub fn list_catalog(&self) -> Vec<MarketplaceEntry> {
        self.catalog.list(|id| self.records.contains_key(id))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn record(&self, id: &str) -> Option<&ExtensionRecord> {
        self.records.get(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(ExtensionRecord::is_active)
    }

    /// IDs of extensions that currently receive events.
    pub fn active_ids(&self) -> Vec<&str> {
        self.list_installed()
            .filter(|record| record.is_active())
            .map(|record| record.id.as_str())
            .collect()
    }

    pub fn extension_count(&self) -> usize {
        self.records.len()
    }

    pub fn config(&self) -> &ExtensionHostConfig {
        &self.config
    }

    pub fn registry(&self) -> &FactoryRegistry {
        self.loader.registry()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: EditorHost> Drop for ExtensionManager<H> {
    fn drop(&mut self) {
        // Covers close paths that never reached an explicit shutdown.
        self.shutdown_all();
    }
}

/// Run `activate`, then contribute menus if the editor has a menu root.
///
/// A failure is stored on the record but leaves `enabled` untouched: the
/// record shows as enabled-with-error and receives no events.
fn activate_record(host: &mut dyn EditorHost, settings: &mut SettingsStore, record: &mut ExtensionRecord) {
    if record.instance.is_none() {
        return;
    }
    tracing::info!(extension = %record.id, "Activating extension");

    let mut result = run_hook(host, settings, record, |ext, cx| ext.activate(cx)).unwrap_or(Ok(()));

    if result.is_ok() && host.menu_root().is_some() {
        let mut menu = MenuBuilder::default();
        result = run_hook(host, settings, record, |ext, cx| ext.contribute_menu(cx, &mut menu))
            .unwrap_or(Ok(()));
        if let (Ok(()), Some(root)) = (&result, host.menu_root()) {
            menu.apply(&record.id, root);
        }
    }

    match result {
        Ok(()) => record.error = None,
        Err(message) => {
            tracing::error!(extension = %record.id, "Activate failed: {}", message);
            release_host(host, record);
            record.error = Some(Failure::activation(message));
        }
    }
}

/// Drop the extension's key bindings and menu entries, then run `deactivate`.
fn deactivate_record(host: &mut dyn EditorHost, settings: &mut SettingsStore, record: &mut ExtensionRecord) {
    if record.instance.is_none() {
        return;
    }
    tracing::info!(extension = %record.id, "Deactivating extension");

    release_host(host, record);
    if let Some(Err(message)) = run_hook(host, settings, record, |ext, cx| ext.deactivate(cx)) {
        tracing::error!(extension = %record.id, "Deactivate failed: {}", message);
    }
}

/// Remove everything the extension registered with the editor.
fn release_host(host: &mut dyn EditorHost, record: &mut ExtensionRecord) {
    record.bindings.unregister_all(host);
    if let Some(menu) = host.menu_root() {
        menu.remove_commands(&record.id);
    }
}
