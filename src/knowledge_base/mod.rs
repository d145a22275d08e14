//! Structured Knowledge Base for IEC 61131-3 ST and safety-interlock notes
//!
//! Reference documents are parsed once into immutable entries. A built
//! `KnowledgeBase` never changes; reloading builds a complete new one and
//! swaps it in atomically through `KnowledgeBaseHandle`.
//!
//! ## Data Flow
//!
//! ```text
//! {PLC_KB_DIR}/*.md ──layout──► SourceDocument[] ──loader──► Entry[]
//!                                                              │
//!                                          EntryIndex ◄────────┘
//!                                              │
//!                             QueryInterface (categories, by_category, search)
//! ```
//!
//! ## Lifecycle
//!
//! Unloaded → Loaded, once. A load error leaves the system Unloaded (no
//! partial knowledge base). A failed reload keeps the previous snapshot.

pub mod index;
pub mod layout;
pub mod loader;
pub mod query;
pub mod store;
pub mod tags;
pub mod watcher;

pub use index::EntryIndex;
pub use loader::{DocumentLoader, LoadError, ParseResult, SourceDocument};
pub use query::{QueryError, QueryInterface};
pub use store::KnowledgeStore;

use crate::config::KbConfig;
use crate::types::{Entry, KnowledgeBaseStats};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable snapshot of all loaded entries and their index.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<Entry>,
    index: EntryIndex,
    documents: usize,
    loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Build from in-memory documents.
    pub fn from_documents(
        loader: &DocumentLoader,
        documents: &[SourceDocument],
    ) -> ParseResult<Self> {
        let corpus = loader.parse_documents(documents)?;
        let index = EntryIndex::build(&corpus.entries, &corpus.categories);
        Ok(Self {
            entries: corpus.entries,
            index,
            documents: corpus.documents,
            loaded_at: Utc::now(),
        })
    }

    /// Build from the configured source directory.
    pub fn load(config: &KbConfig) -> ParseResult<Self> {
        let documents = config.source.read_documents()?;
        let kb = Self::from_documents(&DocumentLoader::from_config(config), &documents)?;
        info!(
            dir = %config.source.dir.display(),
            documents = kb.documents,
            entries = kb.entries.len(),
            categories = kb.index.category_count(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// All entries in document order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Category names in first-seen order.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.categories()
    }

    pub fn by_category(&self, name: &str) -> Vec<&Entry> {
        self.index.by_category(&self.entries, name)
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&Entry> {
        self.index.by_tag(&self.entries, tag)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        KnowledgeBaseStats {
            documents: self.documents,
            entries: self.entries.len(),
            categories: self.index.category_count(),
            tags: self.index.tag_count(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Shared, reloadable reference to the current knowledge base snapshot.
///
/// Readers call `snapshot()` and keep the returned `Arc` for as long as they
/// need a consistent view; a concurrent `reload()` never affects it.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseHandle {
    current: Arc<ArcSwap<KnowledgeBase>>,
    config: Arc<KbConfig>,
}

impl KnowledgeBaseHandle {
    /// Perform the initial load. Fails fast: no handle without a complete KB.
    pub fn load(config: KbConfig) -> ParseResult<Self> {
        let kb = KnowledgeBase::load(&config)?;
        Ok(Self::from_parts(kb, config))
    }

    /// Wrap an already built knowledge base.
    pub fn from_parts(kb: KnowledgeBase, config: KbConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(kb)),
            config: Arc::new(config),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current.load_full()
    }

    /// Query interface bound to the current snapshot.
    pub fn query(&self) -> QueryInterface {
        QueryInterface::new(self.snapshot(), self.config.query.clone())
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    /// Rebuild from the source directory and swap the result in.
    ///
    /// On failure the previous snapshot stays active and the error is returned.
    pub fn reload(&self) -> ParseResult<Arc<KnowledgeBase>> {
        match KnowledgeBase::load(&self.config) {
            Ok(kb) => {
                let kb = Arc::new(kb);
                self.current.store(Arc::clone(&kb));
                info!(entries = kb.entries().len(), "Knowledge base snapshot swapped");
                Ok(kb)
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_category_rules;

    fn build(docs: &[SourceDocument]) -> KnowledgeBase {
        let loader = DocumentLoader::new(default_category_rules(), false);
        KnowledgeBase::from_documents(&loader, docs).expect("valid corpus")
    }

    #[test]
    fn test_from_documents_and_lookup() {
        let kb = build(&[
            SourceDocument::new("a.md", "Title: ST Syntax\n- Use `:=` for assignment.\n"),
            SourceDocument::new("b.md", "Title: Safety\n- EmergencyStop latches.\n- Reset is manual.\n"),
        ]);
        assert_eq!(kb.categories().collect::<Vec<_>>(), vec!["syntax", "safety"]);
        assert_eq!(kb.by_category("safety").len(), 2);
        assert_eq!(kb.by_tag(":=").len(), 1);
        assert!(kb.by_category("nonexistent").is_empty());

        let stats = kb.stats();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.categories, 2);
    }

    #[test]
    fn test_empty_corpus_is_loaded_and_empty() {
        let kb = build(&[]);
        assert!(kb.is_empty());
        assert_eq!(kb.categories().count(), 0);
    }

    #[test]
    fn test_reload_swaps_and_old_snapshot_survives() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("s.md"), "Title: Safety\n- one\n").expect("write");

        let mut config = KbConfig::default();
        config.source.dir = tmp.path().to_path_buf();
        let handle = KnowledgeBaseHandle::load(config).expect("initial load");
        let before = handle.snapshot();
        assert_eq!(before.entries().len(), 1);

        std::fs::write(tmp.path().join("s.md"), "Title: Safety\n- one\n- two\n").expect("write");
        let after = handle.reload().expect("reload");
        assert_eq!(after.entries().len(), 2);
        assert_eq!(handle.snapshot().entries().len(), 2);
        assert_eq!(before.entries().len(), 1, "held snapshot must not change");
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("s.md"), "Title: Safety\n- one\n").expect("write");

        let mut config = KbConfig::default();
        config.source.dir = tmp.path().to_path_buf();
        let handle = KnowledgeBaseHandle::load(config).expect("initial load");

        std::fs::write(tmp.path().join("s.md"), "- orphan\n").expect("write");
        assert!(matches!(handle.reload(), Err(LoadError::MalformedDocument { .. })));
        assert_eq!(handle.snapshot().entries()[0].body, "one");
    }
}
