//! Extensions shipped with the editor.
//!
//! Each one is registered under the entry name its unit declares, e.g. a
//! `word_count.ext` containing `entry = "word-count"`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::json;

use super::api::{Extension, ExtensionContext, KeyEvent, KeyOutcome, MenuBuilder, Settings};
use super::loader::FactoryRegistry;

pub const WORD_COUNT: &str = "word-count";
pub const FILE_BACKUP: &str = "file-backup";
pub const AUTO_BRACKET: &str = "auto-bracket";
pub const SNIPPETS: &str = "snippets";

/// Register every built-in factory.
pub fn register_builtins(registry: &mut FactoryRegistry) {
    registry.register(WORD_COUNT, |_| Ok(Box::new(WordCount) as Box<dyn Extension>));
    registry.register(FILE_BACKUP, |_| Ok(Box::new(FileBackup) as Box<dyn Extension>));
    registry.register(AUTO_BRACKET, |_| Ok(Box::new(AutoBracket) as Box<dyn Extension>));
    registry.register(SNIPPETS, |_| Ok(Box::new(Snippets) as Box<dyn Extension>));
}

/// A registry holding only the built-ins.
pub fn builtin_registry() -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    register_builtins(&mut registry);
    registry
}

// ---------------------------------------------------------------------------
// Word count
// ---------------------------------------------------------------------------

/// Live word, line and character count in the status area.
pub struct WordCount;

impl WordCount {
    const SHOW_ACTION: &'static str = "word-count.show";

    pub fn summary(text: &str) -> String {
        let words = text.split_whitespace().count();
        let lines = text.matches('\n').count() + usize::from(!text.is_empty());
        let chars = text.chars().count();
        format!("Words: {words} | Lines: {lines} | Chars: {chars}")
    }

    fn update(cx: &mut ExtensionContext<'_>) {
        let text = cx.host().text();
        cx.set_status(&Self::summary(&text));
    }
}

impl Extension for WordCount {
    fn activate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Self::update(cx);
        Ok(())
    }

    fn on_key(&mut self, cx: &mut ExtensionContext<'_>, _event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        Self::update(cx);
        Ok(KeyOutcome::Pass)
    }

    fn on_file_open(&mut self, cx: &mut ExtensionContext<'_>, _path: &str) -> anyhow::Result<()> {
        Self::update(cx);
        Ok(())
    }

    fn contribute_menu(&mut self, _cx: &mut ExtensionContext<'_>, menu: &mut MenuBuilder) -> anyhow::Result<()> {
        menu.add_command("Tools", "Word Count", Self::SHOW_ACTION);
        Ok(())
    }

    fn on_action(&mut self, cx: &mut ExtensionContext<'_>, action: &str) -> anyhow::Result<()> {
        if action == Self::SHOW_ACTION {
            let text = cx.host().text();
            cx.notify(&Self::summary(&text));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File backup
// ---------------------------------------------------------------------------

/// Copies a file to `<name>.bak<N>` on every save.
///
/// Settings: `backup_dir` (empty means next to the file) and `max_backups`.
/// A save whose content equals the newest backup is skipped.
pub struct FileBackup;

const DEFAULT_MAX_BACKUPS: u64 = 5;

impl FileBackup {
    fn backup_dir(cx: &mut ExtensionContext<'_>, source: &Path) -> PathBuf {
        let configured = cx
            .setting("backup_dir")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        if configured.trim().is_empty() {
            source.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            PathBuf::from(shellexpand::tilde(configured.trim()).into_owned())
        }
    }

    /// Existing backups of `file_name` in `dir` as `(index, path)`, oldest first.
    pub fn existing_backups(dir: &Path, file_name: &str) -> Vec<(u32, PathBuf)> {
        let prefix = format!("{file_name}.bak");
        let mut backups: Vec<(u32, PathBuf)> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| {
                        let name = entry.file_name();
                        let index = name.to_str()?.strip_prefix(&prefix)?.parse().ok()?;
                        Some((index, entry.path()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        backups.sort_by_key(|(index, _)| *index);
        backups
    }

    fn backup(cx: &mut ExtensionContext<'_>, path: &str) -> anyhow::Result<Option<PathBuf>> {
        let source = Path::new(path);
        if !source.is_file() {
            return Ok(None);
        }
        let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };

        let max_backups = cx
            .setting("max_backups")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_BACKUPS)
            .max(1) as usize;
        let dir = Self::backup_dir(cx, source);
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

        let mut existing = Self::existing_backups(&dir, file_name);
        let content = fs::read(source).with_context(|| format!("cannot read {path}"))?;
        if let Some((_, newest)) = existing.last() {
            if fs::read(newest).is_ok_and(|previous| previous == content) {
                return Ok(None);
            }
        }

        let next = existing.last().map_or(1, |(index, _)| index + 1);
        while existing.len() >= max_backups {
            let (_, oldest) = existing.remove(0);
            if let Err(e) = fs::remove_file(&oldest) {
                tracing::debug!(path = %oldest.display(), "Failed to prune backup: {}", e);
            }
        }

        let dest = dir.join(format!("{file_name}.bak{next}"));
        fs::write(&dest, content).with_context(|| format!("cannot write {}", dest.display()))?;
        Ok(Some(dest))
    }
}

impl Extension for FileBackup {
    fn activate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        cx.notify("File Backup active: .bak on every save");
        Ok(())
    }

    fn on_file_save(&mut self, cx: &mut ExtensionContext<'_>, path: &str) -> anyhow::Result<()> {
        if path.is_empty() || !Path::new(path).is_file() {
            return Ok(());
        }
        match Self::backup(cx, path) {
            Ok(Some(dest)) => {
                let name = dest.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                cx.set_status(&format!("Backup saved: {name}"));
                Ok(())
            }
            Ok(None) => {
                cx.set_status("Backup skipped: no changes");
                Ok(())
            }
            Err(e) => {
                cx.set_status(&format!("Backup failed: {e:#}"));
                Err(e)
            }
        }
    }

    fn default_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("backup_dir".to_string(), json!(""));
        settings.insert("max_backups".to_string(), json!(DEFAULT_MAX_BACKUPS));
        settings
    }
}

// ---------------------------------------------------------------------------
// Auto bracket
// ---------------------------------------------------------------------------

/// Inserts the closing character when an opener is typed.
pub struct AutoBracket;

const DEFAULT_PAIRS: &str = "(){}[]\"\"''";

impl AutoBracket {
    /// Closer for `opener` in a flat `pairs` string such as `"(){}"`.
    pub fn closer(pairs: &str, opener: char) -> Option<char> {
        let chars: Vec<char> = pairs.chars().collect();
        chars
            .chunks_exact(2)
            .find(|pair| pair[0] == opener)
            .map(|pair| pair[1])
    }
}

impl Extension for AutoBracket {
    fn activate(&mut self, _cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_key(&mut self, cx: &mut ExtensionContext<'_>, event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        if !event.is_plain() {
            return Ok(KeyOutcome::Pass);
        }
        let mut chars = event.key.chars();
        let (Some(opener), None) = (chars.next(), chars.next()) else {
            return Ok(KeyOutcome::Pass);
        };

        let pairs = cx
            .setting("pairs")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_PAIRS.to_string());
        match Self::closer(&pairs, opener) {
            Some(closer) => {
                cx.host().insert_text(&format!("{opener}{closer}"));
                Ok(KeyOutcome::Consumed)
            }
            None => Ok(KeyOutcome::Pass),
        }
    }

    fn default_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("pairs".to_string(), json!(DEFAULT_PAIRS));
        settings
    }
}

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// Expands the trigger word before the cursor into a template on Tab.
///
/// The `snippets` setting maps trigger words to templates and replaces the
/// built-in C++ set as a whole.
pub struct Snippets;

const DEFAULT_SNIPPETS: &[(&str, &str)] = &[
    ("forr", "for (int i = 0; i < n; i++) {\n    \n}"),
    ("main", "#include <iostream>\nusing namespace std;\n\nint main() {\n    \n    return 0;\n}"),
    ("cls", "class ClassName {\npublic:\n    ClassName() {}\n    ~ClassName() {}\n\nprivate:\n    \n};"),
    ("iff", "if (condition) {\n    \n} else {\n    \n}"),
    ("cout", "cout << \"\" << endl;"),
    ("inc", "#include <>"),
    ("whl", "while (condition) {\n    \n}"),
    ("sw", "switch (variable) {\n    case 1:\n        break;\n    default:\n        break;\n}"),
];

impl Snippets {
    /// Trailing identifier characters of `line`.
    pub fn trigger(line: &str) -> &str {
        let start = line
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
            .last()
            .map_or(line.len(), |(i, _)| i);
        &line[start..]
    }
}

impl Extension for Snippets {
    fn activate(&mut self, cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        cx.notify("Snippets active: type a trigger and press Tab");
        Ok(())
    }

    fn on_key(&mut self, cx: &mut ExtensionContext<'_>, event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        if event.key != "Tab" || !event.is_plain() || event.shift {
            return Ok(KeyOutcome::Pass);
        }

        let line = cx.host().line_before_cursor();
        let word = Self::trigger(&line);
        if word.is_empty() {
            return Ok(KeyOutcome::Pass);
        }
        let template = cx
            .setting("snippets")
            .and_then(|snippets| snippets.get(word)?.as_str().map(str::to_string));
        let Some(template) = template else {
            return Ok(KeyOutcome::Pass);
        };

        let host = cx.host();
        host.delete_before_cursor(word.chars().count());
        host.insert_text(&template);
        Ok(KeyOutcome::Consumed)
    }

    fn default_settings(&self) -> Settings {
        let snippets: serde_json::Map<String, serde_json::Value> = DEFAULT_SNIPPETS
            .iter()
            .map(|(trigger, template)| (trigger.to_string(), json!(template)))
            .collect();
        let mut settings = Settings::new();
        settings.insert("snippets".to_string(), serde_json::Value::Object(snippets));
        settings
    }
}
