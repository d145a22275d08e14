//! Query Interface: the read-only surface handed to external callers
//!
//! A `QueryInterface` is bound to one knowledge base snapshot and holds no
//! other state, so it can be cloned freely and shared across threads.
//!
//! ## Ranking
//!
//! For a keyword `k` (case-insensitive):
//! - +2 for every tag of the entry containing `k`
//! - +1 for every occurrence of `k` in the body
//!
//! Results are sorted by score, highest first; equal scores keep document
//! order. Entries scoring zero are not returned.

use crate::config::QueryConfig;
use crate::knowledge_base::{tags, KnowledgeBase};
use crate::types::{Entry, SearchHit};
use std::sync::Arc;
use thiserror::Error;

const TAG_WEIGHT: u32 = 2;
const BODY_WEIGHT: u32 = 1;

/// Invalid query input. Never affects the knowledge base itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Query keyword must not be empty")]
    EmptyQuery,
}

#[derive(Debug, Clone)]
pub struct QueryInterface {
    kb: Arc<KnowledgeBase>,
    limits: QueryConfig,
}

impl QueryInterface {
    pub fn new(kb: Arc<KnowledgeBase>, limits: QueryConfig) -> Self {
        Self { kb, limits }
    }

    /// The snapshot this interface answers from.
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Category names, lazily, in first-seen source order.
    pub fn list_categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.kb.categories()
    }

    /// Entries of a category; empty for an unknown category.
    pub fn by_category(&self, name: &str) -> Vec<&Entry> {
        self.kb.by_category(name)
    }

    /// Entries carrying a tag (case-insensitive); empty when none match.
    pub fn by_tag(&self, tag: &str) -> Vec<&Entry> {
        self.kb.by_tag(tag)
    }

    /// Ranked case-insensitive substring search over tags and bodies.
    pub fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, QueryError> {
        let needle = normalize(keyword)?;
        Ok(rank(self.kb.entries(), |entry| keyword_score(entry, &needle)))
    }

    /// `search` truncated to `limit` hits (clamped to the configured maximum).
    pub fn search_top(&self, keyword: &str, limit: Option<usize>) -> Result<Vec<SearchHit>, QueryError> {
        let mut hits = self.search(keyword)?;
        hits.truncate(self.limits.clamp_limit(limit, self.limits.max_results));
        Ok(hits)
    }

    /// Multi-term retrieval for free-text questions.
    ///
    /// The query is split into alphanumeric terms and each entry scores the
    /// sum of its per-term keyword scores. A query with no usable terms
    /// (only punctuation) matches nothing.
    pub fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>, QueryError> {
        normalize(query)?;
        let terms = tags::query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = rank(self.kb.entries(), |entry| {
            terms.iter().map(|t| keyword_score(entry, t)).sum()
        });
        hits.truncate(self.limits.clamp_limit(top_k, self.limits.default_top_k));
        Ok(hits)
    }

    /// Render the best matches as a reference-context block for prompt
    /// builders. Returns an empty string when nothing matches.
    ///
    /// ```text
    /// Source: safety_interlocks.md#2
    /// [safety] EmergencyStop trips all actuators immediately and latches until reset.
    /// ```
    pub fn compose_context(&self, query: &str, top_k: Option<usize>) -> Result<String, QueryError> {
        let blocks: Vec<String> = self
            .retrieve(query, top_k)?
            .into_iter()
            .map(|hit| {
                format!(
                    "Source: {}#{}\n[{}] {}",
                    hit.entry.source, hit.entry.line, hit.entry.category, hit.entry.body
                )
            })
            .collect();
        Ok(blocks.join("\n\n"))
    }
}

/// Lower-case the keyword as given. Surrounding whitespace is part of the
/// substring being matched; it only counts as empty if nothing else is there.
fn normalize(keyword: &str) -> Result<String, QueryError> {
    if keyword.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }
    Ok(keyword.to_lowercase())
}

/// Score one entry against an already lower-cased keyword.
fn keyword_score(entry: &Entry, needle: &str) -> u32 {
    let tag_hits = entry
        .tags
        .iter()
        .filter(|t| t.to_lowercase().contains(needle))
        .count();
    let body_hits = entry.body.to_lowercase().matches(needle).count();
    u32::try_from(tag_hits).unwrap_or(u32::MAX).saturating_mul(TAG_WEIGHT)
        + u32::try_from(body_hits).unwrap_or(u32::MAX).saturating_mul(BODY_WEIGHT)
}

/// Score, drop zeros, and stable-sort descending so ties keep document order.
fn rank(entries: &[Entry], score: impl Fn(&Entry) -> u32) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .iter()
        .filter_map(|entry| {
            let s = score(entry);
            (s > 0).then(|| SearchHit {
                entry: entry.clone(),
                score: s,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits
}
