//! Core value types shared by the loader, index, query interface and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Entry
// ============================================================================

/// One discrete fact or pattern extracted from a knowledge base document.
///
/// Entries are produced once by the loader and never mutated afterwards.
/// Every entry belongs to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Semantic grouping resolved from the nearest preceding heading
    pub category: String,
    /// Keywords extracted from the bullet text, unique case-insensitively
    pub tags: Vec<String>,
    /// Bullet text with the list marker removed
    pub body: String,
    /// Source document, relative to the knowledge base root
    pub source: String,
    /// 1-based line number of the bullet in `source`
    pub line: usize,
}

impl Entry {
    /// Case-insensitive tag membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }
}

// ============================================================================
// Search Results
// ============================================================================

/// A ranked query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub entry: Entry,
    pub score: u32,
}

// ============================================================================
// Stats
// ============================================================================

/// Summary of a loaded knowledge base snapshot (health endpoint, `stats` command).
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseStats {
    pub documents: usize,
    pub entries: usize,
    pub categories: usize,
    pub tags: usize,
    pub loaded_at: DateTime<Utc>,
}
