//! The contract between the editor and its extensions.
//!
//! Every extension implements [`Extension`]. The editor implements
//! [`EditorHost`] (and optionally [`MenuRoot`]) and hands itself to hooks
//! through an [`ExtensionContext`], which also carries the extension's
//! settings and its tracked key bindings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Map, Value};

use super::storage::SettingsStore;

/// Identifier the host assigns to a registered key binding.
pub type BindingId = u64;

/// Declared setting defaults of an extension.
pub type Settings = Map<String, Value>;

/// A key press as seen by the editor's text surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key name or typed character (e.g. `"a"`, `"("`, `"Return"`).
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// True for a plain character with no command modifier held.
    pub fn is_plain(&self) -> bool {
        !self.ctrl && !self.alt
    }
}

/// What an extension did with a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the event continue to the next extension and the editor.
    #[default]
    Pass,
    /// Stop dispatch; the editor suppresses its default handling.
    Consumed,
}

/// The menu surface of the editor.
pub trait MenuRoot {
    /// Add a command entry under the top-level `menu`.
    ///
    /// Activating the entry makes the editor call
    /// `ExtensionManager::invoke_action(owner, action)`.
    fn add_command(&mut self, menu: &str, label: &str, owner: &str, action: &str);

    /// Remove every entry contributed by `owner`.
    fn remove_commands(&mut self, owner: &str);
}

/// The editor as seen by extensions.
///
/// Every method has a default so headless hosts only implement what they
/// actually surface. Hosts without key bindings reject `bind_key`.
pub trait EditorHost {
    /// Resolve the current menu root, if the editor has one.
    fn menu_root(&mut self) -> Option<&mut dyn MenuRoot> {
        None
    }

    /// Bind `sequence` (e.g. `"<Control-Shift-P>"`) to `action` of `owner`.
    fn bind_key(&mut self, owner: &str, sequence: &str, action: &str) -> anyhow::Result<BindingId> {
        let _ = (owner, action);
        anyhow::bail!("key bindings are not supported by this host (requested {sequence})")
    }

    /// Remove a binding previously returned by [`EditorHost::bind_key`].
    fn unbind_key(&mut self, sequence: &str, binding: BindingId) {
        let _ = (sequence, binding);
    }

    /// Full text of the active buffer.
    fn text(&self) -> String {
        String::new()
    }

    /// Insert text at the cursor.
    fn insert_text(&mut self, text: &str) {
        let _ = text;
    }

    /// Text between the start of the cursor's line and the cursor.
    ///
    /// Defaults to the last line of [`EditorHost::text`], for hosts whose
    /// cursor always sits at the end of the buffer.
    fn line_before_cursor(&self) -> String {
        let text = self.text();
        text.rsplit('\n').next().unwrap_or_default().to_string()
    }

    /// Delete `count` characters before the cursor.
    fn delete_before_cursor(&mut self, count: usize) {
        let _ = count;
    }

    /// Replace the status bar message.
    fn set_status(&mut self, message: &str) {
        let _ = message;
    }

    /// Show a transient notification.
    fn notify(&mut self, message: &str, duration: Duration) {
        let _ = (message, duration);
    }
}

/// Key bindings registered by one extension.
///
/// The manager drops all of them when the extension is deactivated, so
/// extensions never have to unbind manually.
#[derive(Debug, Default)]
pub struct KeyBindings {
    bindings: BTreeMap<String, BindingId>,
}

impl KeyBindings {
    pub fn register(
        &mut self,
        host: &mut dyn EditorHost,
        owner: &str,
        sequence: &str,
        action: &str,
    ) -> anyhow::Result<()> {
        let id = host.bind_key(owner, sequence, action)?;
        if let Some(previous) = self.bindings.insert(sequence.to_string(), id) {
            host.unbind_key(sequence, previous);
        }
        Ok(())
    }

    pub fn unregister(&mut self, host: &mut dyn EditorHost, sequence: &str) {
        if let Some(id) = self.bindings.remove(sequence) {
            host.unbind_key(sequence, id);
        }
    }

    pub fn unregister_all(&mut self, host: &mut dyn EditorHost) {
        for (sequence, id) in std::mem::take(&mut self.bindings) {
            host.unbind_key(&sequence, id);
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Everything a hook may touch while it runs.
pub struct ExtensionContext<'a> {
    id: &'a str,
    host: &'a mut dyn EditorHost,
    settings: &'a mut SettingsStore,
    defaults: &'a Settings,
    bindings: &'a mut KeyBindings,
}

impl<'a> ExtensionContext<'a> {
    pub(crate) fn new(
        id: &'a str,
        host: &'a mut dyn EditorHost,
        settings: &'a mut SettingsStore,
        defaults: &'a Settings,
        bindings: &'a mut KeyBindings,
    ) -> Self {
        Self {
            id,
            host,
            settings,
            defaults,
            bindings,
        }
    }

    /// Identifier of the extension this context belongs to.
    pub fn id(&self) -> &str {
        self.id
    }

    pub fn host(&mut self) -> &mut dyn EditorHost {
        &mut *self.host
    }

    /// Read a setting: persisted value, else declared default.
    pub fn setting(&mut self, key: &str) -> Option<Value> {
        self.settings.get(self.id, key, self.defaults)
    }

    /// Persist a setting. Write failures are logged and dropped.
    pub fn set_setting(&mut self, key: &str, value: Value) {
        if let Err(e) = self.settings.set(self.id, key, value) {
            tracing::warn!(extension = %self.id, key, "Failed to persist setting: {}", e);
        }
    }

    /// Bind a key sequence; removed automatically on deactivation.
    pub fn register_keybinding(&mut self, sequence: &str, action: &str) -> anyhow::Result<()> {
        self.bindings
            .register(&mut *self.host, self.id, sequence, action)
    }

    pub fn unregister_keybinding(&mut self, sequence: &str) {
        self.bindings.unregister(&mut *self.host, sequence);
    }

    pub fn set_status(&mut self, message: &str) {
        self.host.set_status(message);
    }

    pub fn notify(&mut self, message: &str) {
        self.host.notify(message, Duration::from_millis(3000));
    }
}

/// Menu contributions of one extension.
///
/// Entries are collected while `contribute_menu` runs and only reach the
/// editor's menu root once the hook has returned `Ok`.
#[derive(Debug, Default)]
pub struct MenuBuilder {
    commands: Vec<(String, String, String)>,
}

impl MenuBuilder {
    pub fn add_command(&mut self, menu: &str, label: &str, action: &str) {
        self.commands.push((menu.into(), label.into(), action.into()));
    }

    /// Add every collected entry to `root` under `owner`.
    pub(crate) fn apply(self, owner: &str, root: &mut dyn MenuRoot) {
        for (menu, label, action) in self.commands {
            root.add_command(&menu, &label, owner, &action);
        }
    }
}

/// An editor extension.
///
/// Only `activate` is required. Every hook runs on the editor's thread and
/// is isolated: an `Err` or a panic is logged against the extension and
/// never reaches the editor. Deferred work an extension schedules must be
/// cancelled in `deactivate`.
pub trait Extension {
    /// Bind the extension into the live editor.
    fn activate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()>;

    /// Undo `activate`. Key bindings made through the context are already
    /// gone when this runs.
    fn deactivate(&mut self, _cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called exactly once when the editor closes, after `deactivate`.
    fn on_shutdown(&mut self, _cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_key(&mut self, _cx: &mut ExtensionContext<'_>, _event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        Ok(KeyOutcome::Pass)
    }

    fn on_file_open(&mut self, _cx: &mut ExtensionContext<'_>, _path: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_file_save(&mut self, _cx: &mut ExtensionContext<'_>, _path: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_build_start(&mut self, _cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_build_end(&mut self, _cx: &mut ExtensionContext<'_>, _success: bool) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after a successful `activate` when the editor has a menu
    /// surface. Nothing is added if the hook fails.
    fn contribute_menu(&mut self, _cx: &mut ExtensionContext<'_>, _menu: &mut MenuBuilder) -> anyhow::Result<()> {
        Ok(())
    }

    /// A key binding or menu entry owned by this extension fired.
    fn on_action(&mut self, _cx: &mut ExtensionContext<'_>, _action: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Settings the extension understands, with their defaults.
    fn default_settings(&self) -> Settings {
        Settings::new()
    }
}
