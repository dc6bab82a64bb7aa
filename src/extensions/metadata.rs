//! Static metadata extraction.
//!
//! The marketplace has to show name, version and author of units that are
//! not trusted to load yet, and the installed list has to show something
//! useful for units that failed to load. [`parse_static`] therefore never
//! parses the unit as a document: it scans the raw text for
//! `key = "value"` declarations and falls back to defaults for anything it
//! cannot find.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Categories understood by the catalog filter.
pub const CATEGORIES: &[&str] = &["All", "Appearance", "Editing", "Tools", "Languages", "Other"];

pub const DEFAULT_VERSION: &str = "?";
pub const DEFAULT_AUTHOR: &str = "Unknown";
pub const DEFAULT_ICON: &str = "🧩";
pub const DEFAULT_CATEGORY: &str = "Other";

/// Display metadata of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMeta {
    /// Empty when a unit omits it; loaders fill in the title-cased id.
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_author")]
    pub author: String,

    /// Emoji or single glyph used as a badge.
    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl ExtensionMeta {
    /// Defaults for a unit whose declarations are unknown.
    pub fn fallback(id: &str) -> Self {
        Self {
            name: title_case(id),
            version: default_version(),
            description: String::new(),
            author: default_author(),
            icon: default_icon(),
            category: default_category(),
            tags: Vec::new(),
        }
    }

    /// Text searched by the catalog filter.
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.description, self.tags.join(" "))
    }
}

/// `line_highlight` → `Line Highlight`.
pub fn title_case(id: &str) -> String {
    id.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn declaration(key: &str) -> Regex {
    // `key = "value"` or `key: 'value'`, optionally indented, first on its line.
    Regex::new(&format!(r#"(?m)^[ \t]*{key}[ \t]*[=:][ \t]*["'](.+?)["']"#))
        .expect("static declaration pattern is valid")
}

static NAME: Lazy<Regex> = Lazy::new(|| declaration("name"));
static VERSION: Lazy<Regex> = Lazy::new(|| declaration("version"));
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| declaration("description"));
static AUTHOR: Lazy<Regex> = Lazy::new(|| declaration("author"));
static ICON: Lazy<Regex> = Lazy::new(|| declaration("icon"));
static CATEGORY: Lazy<Regex> = Lazy::new(|| declaration("category"));

static TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*tags[ \t]*[=:][ \t]*\[([^\]]*)\]"#).expect("tags pattern is valid")
});
static TAG_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("tag item pattern is valid"));

/// Scan `source` for metadata declarations of extension `id`.
pub fn scan(id: &str, source: &str) -> ExtensionMeta {
    let mut meta = ExtensionMeta::fallback(id);

    let fields: [(&Regex, &mut String); 6] = [
        (&*NAME, &mut meta.name),
        (&*VERSION, &mut meta.version),
        (&*DESCRIPTION, &mut meta.description),
        (&*AUTHOR, &mut meta.author),
        (&*ICON, &mut meta.icon),
        (&*CATEGORY, &mut meta.category),
    ];
    for (pattern, slot) in fields {
        if let Some(found) = pattern.captures(source).and_then(|c| c.get(1)) {
            *slot = found.as_str().to_string();
        }
    }

    if let Some(list) = TAGS.captures(source).and_then(|c| c.get(1)) {
        meta.tags = TAG_ITEM
            .captures_iter(list.as_str())
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
    }

    meta
}

/// Read metadata of the unit at `path` without loading it.
///
/// Never fails: unreadable files yield [`ExtensionMeta::fallback`].
pub fn parse_static(path: &Path) -> ExtensionMeta {
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match std::fs::read(path) {
        Ok(bytes) => scan(&id, &String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::debug!(path = %path.display(), "Static metadata scan fell back to defaults: {}", e);
            ExtensionMeta::fallback(&id)
        }
    }
}
