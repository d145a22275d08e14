//! Entry Index: category and tag lookup over an owned entry sequence
//!
//! The index stores positions into the knowledge base's entry vector, never
//! entries themselves, so the knowledge base remains the only owner.

use crate::types::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    /// Category names in first-seen order
    category_order: Vec<String>,
    /// Category → entry positions, in document order
    by_category: HashMap<String, Vec<usize>>,
    /// Lower-cased tag → entry positions, in document order
    by_tag: HashMap<String, Vec<usize>>,
}

impl EntryIndex {
    /// Build the index for `entries`.
    ///
    /// `headed_categories` lists categories in first-seen order, including
    /// any whose heading had no bullets. Categories of entries that are not
    /// in the list are appended in entry order.
    pub fn build(entries: &[Entry], headed_categories: &[String]) -> Self {
        let mut index = Self::default();

        for category in headed_categories {
            index.ensure_category(category);
        }

        for (pos, entry) in entries.iter().enumerate() {
            index.ensure_category(&entry.category);
            if let Some(positions) = index.by_category.get_mut(&entry.category) {
                positions.push(pos);
            }
            for tag in &entry.tags {
                index.by_tag.entry(tag.to_lowercase()).or_default().push(pos);
            }
        }

        index
    }

    fn ensure_category(&mut self, category: &str) {
        if !self.by_category.contains_key(category) {
            self.by_category.insert(category.to_string(), Vec::new());
            self.category_order.push(category.to_string());
        }
    }

    /// Category names in first-seen order.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.category_order.iter().map(String::as_str)
    }

    pub fn category_count(&self) -> usize {
        self.category_order.len()
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// Entries of `name`, in document order. Unknown categories yield nothing.
    pub fn by_category<'a>(&self, entries: &'a [Entry], name: &str) -> Vec<&'a Entry> {
        Self::resolve(entries, self.by_category.get(name))
    }

    /// Entries carrying `tag` (case-insensitive), in document order.
    pub fn by_tag<'a>(&self, entries: &'a [Entry], tag: &str) -> Vec<&'a Entry> {
        Self::resolve(entries, self.by_tag.get(&tag.to_lowercase()))
    }

    fn resolve<'a>(entries: &'a [Entry], positions: Option<&Vec<usize>>) -> Vec<&'a Entry> {
        positions
            .map(|p| p.iter().filter_map(|&i| entries.get(i)).collect())
            .unwrap_or_default()
    }
}
