//! Editor stand-in for running extensions from the command line.
//!
//! There is no buffer and no window: menus and key bindings are recorded so
//! they can be listed, and status messages go to stdout.

use std::collections::BTreeMap;
use std::time::Duration;

use console::style;

use crate::extensions::{BindingId, EditorHost, MenuRoot};

/// A menu command contributed by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCommand {
    pub menu: String,
    pub label: String,
    pub owner: String,
    pub action: String,
}

#[derive(Debug, Default)]
pub struct HeadlessMenu {
    commands: Vec<MenuCommand>,
}

impl HeadlessMenu {
    pub fn commands(&self) -> &[MenuCommand] {
        &self.commands
    }
}

impl MenuRoot for HeadlessMenu {
    fn add_command(&mut self, menu: &str, label: &str, owner: &str, action: &str) {
        self.commands.push(MenuCommand {
            menu: menu.to_string(),
            label: label.to_string(),
            owner: owner.to_string(),
            action: action.to_string(),
        });
    }

    fn remove_commands(&mut self, owner: &str) {
        self.commands.retain(|command| command.owner != owner);
    }
}

/// A key binding as `(owner, sequence, action)`.
pub type Binding = (String, String, String);

#[derive(Debug, Default)]
pub struct HeadlessHost {
    menu: HeadlessMenu,
    bindings: BTreeMap<BindingId, Binding>,
    next_binding: BindingId,
    text: String,
    quiet: bool,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that does not print status messages.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn menu(&self) -> &HeadlessMenu {
        &self.menu
    }

    /// Key bindings owned by `owner`.
    pub fn bindings_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings.values().filter(move |binding| binding.0 == owner)
    }
}

impl EditorHost for HeadlessHost {
    fn menu_root(&mut self) -> Option<&mut dyn MenuRoot> {
        Some(&mut self.menu)
    }

    fn bind_key(&mut self, owner: &str, sequence: &str, action: &str) -> anyhow::Result<BindingId> {
        if sequence.trim().is_empty() {
            anyhow::bail!("empty key sequence");
        }
        self.next_binding += 1;
        self.bindings.insert(
            self.next_binding,
            (owner.to_string(), sequence.to_string(), action.to_string()),
        );
        Ok(self.next_binding)
    }

    fn unbind_key(&mut self, _sequence: &str, binding: BindingId) {
        self.bindings.remove(&binding);
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn insert_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn delete_before_cursor(&mut self, count: usize) {
        let keep = self.text.chars().count().saturating_sub(count);
        self.text = self.text.chars().take(keep).collect();
    }

    fn set_status(&mut self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("»").dim(), message);
        }
    }

    fn notify(&mut self, message: &str, _duration: Duration) {
        if !self.quiet {
            println!("{} {}", style("ℹ").cyan(), message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_commands_by_owner() {
        let mut host = HeadlessHost::quiet();
        let menu = host.menu_root().unwrap();
        menu.add_command("Tools", "Word Count", "word_count", "word-count.show");
        menu.add_command("Tools", "Backup", "file_backup", "backup.now");
        menu.remove_commands("word_count");

        let labels: Vec<&str> = host.menu().commands().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Backup"]);
    }

    #[test]
    fn test_bindings() {
        let mut host = HeadlessHost::quiet();
        let first = host.bind_key("alpha", "Ctrl+K", "a").unwrap();
        host.bind_key("bravo", "Ctrl+L", "b").unwrap();
        assert!(host.bind_key("alpha", " ", "c").is_err());

        assert_eq!(host.bindings_of("alpha").count(), 1);
        host.unbind_key("Ctrl+K", first);
        assert_eq!(host.bindings_of("alpha").count(), 0);
        assert_eq!(host.bindings_of("bravo").count(), 1);
    }

    #[test]
    fn test_text_buffer() {
        let mut host = HeadlessHost::quiet().with_text("fn");
        host.insert_text("()");
        assert_eq!(host.text(), "fn()");

        host.insert_text("\nlet héllo");
        assert_eq!(host.line_before_cursor(), "let héllo");
        host.delete_before_cursor(5);
        assert_eq!(host.text(), "fn()\nlet ");
        host.delete_before_cursor(100);
        assert_eq!(host.text(), "");
    }
}
