//! Knowledge Store trait
//!
//! The seam used by downstream tooling (code generators, linters, prompt
//! builders) that only needs "give me the relevant reference snippets".
//! Implemented by a fixed `QueryInterface` snapshot and by the reloadable
//! `KnowledgeBaseHandle`, which answers from whatever snapshot is current.

use crate::knowledge_base::{KnowledgeBaseHandle, QueryInterface};

/// Every implementation must be thread-safe (Send + Sync) since the HTTP
/// layer shares the store across request tasks.
pub trait KnowledgeStore: Send + Sync {
    /// Bodies of the entries most relevant to `query`, best first.
    ///
    /// Invalid or unmatched queries yield an empty list.
    fn query(&self, query: &str, max_results: usize) -> Vec<String>;

    /// Store name for logging and health checks
    fn store_name(&self) -> &'static str;

    /// Number of entries currently available
    fn entry_count(&self) -> usize;
}

impl KnowledgeStore for QueryInterface {
    fn query(&self, query: &str, max_results: usize) -> Vec<String> {
        self.retrieve(query, Some(max_results))
            .unwrap_or_default()
            .into_iter()
            .map(|hit| hit.entry.body)
            .collect()
    }

    fn store_name(&self) -> &'static str {
        "Snapshot"
    }

    fn entry_count(&self) -> usize {
        self.knowledge_base().entries().len()
    }
}

impl KnowledgeStore for KnowledgeBaseHandle {
    fn query(&self, query: &str, max_results: usize) -> Vec<String> {
        KnowledgeStore::query(&self.query(), query, max_results)
    }

    fn store_name(&self) -> &'static str {
        "Reloadable"
    }

    fn entry_count(&self) -> usize {
        self.snapshot().entries().len()
    }
}
