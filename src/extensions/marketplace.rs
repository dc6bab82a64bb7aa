//! Marketplace catalog.
//!
//! The catalog is a directory of units that can be copied into the install
//! directory. Nothing in it is ever loaded: entries are described by the
//! static metadata scan only.

use std::path::{Path, PathBuf};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

use super::manifest::scan_units;
use super::metadata::{parse_static, ExtensionMeta};

/// An installable unit.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceEntry {
    pub id: String,
    pub path: PathBuf,
    pub meta: ExtensionMeta,
}

pub struct Catalog {
    dir: PathBuf,
    matcher: SkimMatcherV2,
}

impl Catalog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Catalog units whose identifier is not installed, in file-name order.
    pub fn list(&self, is_installed: impl Fn(&str) -> bool) -> Vec<MarketplaceEntry> {
        scan_units(&self.dir)
            .into_iter()
            .filter(|(id, _)| !is_installed(id))
            .map(|(id, path)| MarketplaceEntry {
                meta: parse_static(&path),
                id,
                path,
            })
            .collect()
    }

    /// Look up a single not-installed entry.
    pub fn find(&self, id: &str, is_installed: impl Fn(&str) -> bool) -> Option<MarketplaceEntry> {
        self.list(is_installed).into_iter().find(|entry| entry.id == id)
    }

    /// Narrow `entries` to `category` (or `All`) and rank them by `query`.
    ///
    /// An empty query keeps catalog order.
    pub fn filter(&self, entries: Vec<MarketplaceEntry>, query: &str, category: &str) -> Vec<MarketplaceEntry> {
        let in_category = |entry: &MarketplaceEntry| category == "All" || entry.meta.category == category;

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return entries.into_iter().filter(in_category).collect();
        }

        let mut scored: Vec<(MarketplaceEntry, i64)> = entries
            .into_iter()
            .filter(in_category)
            .filter_map(|entry| {
                let score = self.score(&entry.meta, &query)?;
                Some((entry, score))
            })
            .collect();

        // Sort by score descending; ties keep catalog order
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().map(|(entry, _)| entry).collect()
    }

    fn score(&self, meta: &ExtensionMeta, query: &str) -> Option<i64> {
        let name = meta.name.to_lowercase();
        let name_score = self.matcher.fuzzy_match(&name, query);

        let tag_score = meta
            .tags
            .iter()
            .filter_map(|tag| self.matcher.fuzzy_match(&tag.to_lowercase(), query))
            .max();

        // Description matches weigh less
        let desc_score = self
            .matcher
            .fuzzy_match(&meta.description.to_lowercase(), query)
            .map(|s| s / 2);

        let best = [name_score, tag_score, desc_score].into_iter().flatten().max()?;
        let prefix_boost = if name.starts_with(query) { 100 } else { 0 };
        Some(best + prefix_boost)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("dir", &self.dir).finish()
    }
}
