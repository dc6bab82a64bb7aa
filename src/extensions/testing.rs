//! Test doubles shared by the extension tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::json;

use super::api::{
    BindingId, EditorHost, Extension, ExtensionContext, KeyEvent, KeyOutcome, MenuBuilder, MenuRoot,
    Settings,
};
use super::loader::FactoryRegistry;
use super::manifest::ExtensionSource;

/// Shared record of every hook call, as `"<id>#<instance>:<event>"`.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == needle).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Write `<id>.ext` exporting `entry` with a `[config]` body.
pub fn write_unit(dir: &Path, id: &str, entry: &str, config: &str) -> PathBuf {
    let path = dir.join(format!("{id}.ext"));
    let text = format!("version = \"1.0.0\"\nentry = \"{entry}\"\n\n[config]\n{config}\n");
    fs::write(&path, text).unwrap();
    path
}

/// Registry with a single `sample` factory logging into `log`.
pub fn sample_registry(log: &EventLog) -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    let log = log.clone();
    let serial = Rc::new(Cell::new(0u32));
    registry.register("sample", move |source: &ExtensionSource| {
        match source.config_str("fail") {
            Some("instantiate") => anyhow::bail!("instantiate refused"),
            Some("instantiate-panic") => panic!("constructor exploded"),
            _ => {}
        }
        serial.set(serial.get() + 1);
        Ok(Box::new(Sample {
            serial: serial.get(),
            fail: source.config_str("fail").map(str::to_string),
            consume: source.config.get("consume").and_then(|v| v.as_bool()).unwrap_or(false),
            bind: source.config_str("bind").map(str::to_string),
            log: log.clone(),
        }) as Box<dyn Extension>)
    });
    registry
}

struct Sample {
    serial: u32,
    fail: Option<String>,
    consume: bool,
    bind: Option<String>,
    log: EventLog,
}

impl Sample {
    fn record(&self, cx: &ExtensionContext<'_>, event: &str) {
        self.log.push(format!("{}#{}:{}", cx.id(), self.serial, event));
    }

    fn hook(&self, cx: &ExtensionContext<'_>, event: &str) -> anyhow::Result<()> {
        self.record(cx, event);
        match self.fail.as_deref() {
            Some("hook") => anyhow::bail!("{event} failed"),
            Some("hook-panic") => panic!("{event} panicked"),
            _ => Ok(()),
        }
    }
}

impl Extension for Sample {
    fn activate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        self.record(cx, "activate");
        if self.fail.as_deref() == Some("activate") {
            anyhow::bail!("activate refused");
        }
        if let Some(sequence) = &self.bind {
            cx.register_keybinding(sequence, "sample-action")?;
        }
        Ok(())
    }

    fn deactivate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        self.record(cx, "deactivate");
        if self.fail.as_deref() == Some("deactivate") {
            anyhow::bail!("deactivate refused");
        }
        Ok(())
    }

    fn on_shutdown(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        self.record(cx, "shutdown");
        if self.fail.as_deref() == Some("shutdown") {
            panic!("shutdown exploded");
        }
        Ok(())
    }

    fn on_key(&mut self, cx: &mut ExtensionContext<'_>, event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        self.hook(cx, &format!("key:{}", event.key))?;
        Ok(if self.consume {
            KeyOutcome::Consumed
        } else {
            KeyOutcome::Pass
        })
    }

    fn on_file_open(&mut self, cx: &mut ExtensionContext<'_>, path: &str) -> anyhow::Result<()> {
        self.hook(cx, &format!("open:{path}"))
    }

    fn on_file_save(&mut self, cx: &mut ExtensionContext<'_>, path: &str) -> anyhow::Result<()> {
        self.hook(cx, &format!("save:{path}"))?;
        cx.set_setting("last_saved", json!(path));
        Ok(())
    }

    fn on_build_start(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        self.hook(cx, "build_start")
    }

    fn on_build_end(&mut self, cx: &mut ExtensionContext<'_>, success: bool) -> anyhow::Result<()> {
        let greeting = cx.setting("greeting").and_then(|v| v.as_str().map(str::to_string));
        self.hook(cx, &format!("build_end:{success}:{}", greeting.unwrap_or_default()))
    }

    fn contribute_menu(&mut self, cx: &mut ExtensionContext<'_>, menu: &mut MenuBuilder) -> anyhow::Result<()> {
        menu.add_command("Tools", "Sample", "sample-action");
        if self.fail.as_deref() == Some("menu") {
            anyhow::bail!("menu refused by {}", cx.id());
        }
        Ok(())
    }

    fn on_action(&mut self, cx: &mut ExtensionContext<'_>, action: &str) -> anyhow::Result<()> {
        self.hook(cx, &format!("action:{action}"))
    }

    fn default_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("greeting".to_string(), json!("hello"));
        settings
    }
}

/// Menu entries as `(menu, label, owner, action)`.
#[derive(Debug, Default)]
pub struct RecordingMenu {
    pub entries: Vec<(String, String, String, String)>,
}

impl MenuRoot for RecordingMenu {
    fn add_command(&mut self, menu: &str, label: &str, owner: &str, action: &str) {
        self.entries
            .push((menu.into(), label.into(), owner.into(), action.into()));
    }

    fn remove_commands(&mut self, owner: &str) {
        self.entries.retain(|entry| entry.2 != owner);
    }
}

/// Editor stand-in that records what extensions do to it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub menu: Option<RecordingMenu>,
    pub bindings: BTreeMap<BindingId, (String, String, String)>,
    next_binding: BindingId,
    pub text: String,
    pub inserted: String,
    pub deleted: usize,
    pub statuses: Vec<String>,
    pub notifications: Vec<String>,
}

impl RecordingHost {
    pub fn with_menu() -> Self {
        Self {
            menu: Some(RecordingMenu::default()),
            ..Default::default()
        }
    }
}

impl EditorHost for RecordingHost {
    fn menu_root(&mut self) -> Option<&mut dyn MenuRoot> {
        self.menu.as_mut().map(|menu| menu as &mut dyn MenuRoot)
    }

    fn bind_key(&mut self, owner: &str, sequence: &str, action: &str) -> anyhow::Result<BindingId> {
        self.next_binding += 1;
        self.bindings
            .insert(self.next_binding, (owner.into(), sequence.into(), action.into()));
        Ok(self.next_binding)
    }

    fn unbind_key(&mut self, _sequence: &str, binding: BindingId) {
        self.bindings.remove(&binding);
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn insert_text(&mut self, text: &str) {
        self.inserted.push_str(text);
    }

    fn delete_before_cursor(&mut self, count: usize) {
        let keep = self.text.chars().count().saturating_sub(count);
        self.text = self.text.chars().take(keep).collect();
        self.deleted += count;
    }

    fn set_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn notify(&mut self, message: &str, _duration: std::time::Duration) {
        self.notifications.push(message.to_string());
    }
}
