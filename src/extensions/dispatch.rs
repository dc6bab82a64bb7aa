//! Fan-out of editor events to active extensions.
//!
//! Events go to every active extension in discovery order. A hook that
//! fails is logged against its extension and the fan-out continues.

use super::api::{EditorHost, Extension, ExtensionContext, KeyEvent, KeyOutcome};
use super::error::ExtensionError;
use super::isolate::isolate;
use super::manager::ExtensionManager;
use super::record::ExtensionRecord;
use super::storage::SettingsStore;

/// Run one hook of `record` with a fresh context.
///
/// Returns `None` if the record has no instance.
pub(super) fn run_hook<T>(
    host: &mut dyn EditorHost,
    settings: &mut SettingsStore,
    record: &mut ExtensionRecord,
    f: impl FnOnce(&mut dyn Extension, &mut ExtensionContext<'_>) -> anyhow::Result<T>,
) -> Option<Result<T, String>> {
    let defaults = record.default_settings();
    let ExtensionRecord {
        id,
        instance,
        bindings,
        ..
    } = record;
    let instance = instance.as_deref_mut()?;

    let mut cx = ExtensionContext::new(id, host, settings, &defaults, bindings);
    Some(isolate(|| f(instance, &mut cx)))
}

/// Error for a failed `hook` of extension `id`.
pub(super) fn hook_failed(id: &str, hook: &'static str, message: String) -> ExtensionError {
    ExtensionError::HookFailed {
        extension: id.to_string(),
        hook,
        message,
    }
}

impl<H: EditorHost> ExtensionManager<H> {
    /// Call `f` on every active extension, logging failures as `hook`.
    ///
    /// Stops early once `f` returns `true`.
    fn fan_out<T>(
        &mut self,
        hook: &'static str,
        mut f: impl FnMut(&mut dyn Extension, &mut ExtensionContext<'_>) -> anyhow::Result<T>,
        stop: impl Fn(&T) -> bool,
    ) -> bool {
        if self.shutting_down {
            return false;
        }

        for id in &self.order {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };
            if !record.is_active() {
                continue;
            }

            match run_hook(&mut self.host, &mut self.settings, record, &mut f) {
                Some(Ok(value)) if stop(&value) => {
                    tracing::debug!(extension = %id, hook, "Event consumed");
                    return true;
                }
                Some(Err(message)) => {
                    tracing::warn!(extension = %id, hook, "{}", hook_failed(id, hook, message));
                }
                _ => {}
            }
        }
        false
    }

    /// Offer a key press to active extensions.
    ///
    /// Returns true if an extension consumed it; later extensions do not see
    /// a consumed key.
    pub fn dispatch_key(&mut self, event: &KeyEvent) -> bool {
        self.fan_out(
            "on_key",
            |ext, cx| ext.on_key(cx, event),
            |outcome| *outcome == KeyOutcome::Consumed,
        )
    }

    pub fn dispatch_file_open(&mut self, path: &str) {
        self.fan_out("on_file_open", |ext, cx| ext.on_file_open(cx, path), |_| false);
    }

    pub fn dispatch_file_save(&mut self, path: &str) {
        self.fan_out("on_file_save", |ext, cx| ext.on_file_save(cx, path), |_| false);
    }

    pub fn dispatch_build_start(&mut self) {
        self.fan_out("on_build_start", |ext, cx| ext.on_build_start(cx), |_| false);
    }

    pub fn dispatch_build_end(&mut self, success: bool) {
        self.fan_out("on_build_end", |ext, cx| ext.on_build_end(cx, success), |_| false);
    }
}
