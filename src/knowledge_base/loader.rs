//! Document Loader: heading-then-bullets text → ordered `Entry` sequence
//!
//! ## Grammar
//!
//! ```text
//! Title: IEC 61131-3 ST Syntax Core      <- heading (also "# ..." to "###### ...")
//! - Statements end with a semicolon.      <- bullet ("- " or "* "), one Entry each
//!                                         <- blank lines are ignored
//! ```
//!
//! Any other non-blank line is prose. Prose is skipped with a warning unless
//! the loader is strict, in which case it is a `MalformedDocument`. The
//! current heading resets at every document boundary.

use crate::config::{CategoryRule, KbConfig};
use crate::knowledge_base::tags;
use crate::types::Entry;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort a knowledge base build.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Malformed document {document}:{line}: {reason}")]
    MalformedDocument {
        document: String,
        line: usize,
        reason: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of parsing one line or one document.
pub type ParseResult<T> = Result<T, LoadError>;

/// A named block of raw text handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Name used for provenance, usually the path relative to the KB root
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Entries plus every category that was headed, in first-seen order.
///
/// A heading with no bullets still contributes its category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCorpus {
    pub entries: Vec<Entry>,
    pub categories: Vec<String>,
    pub documents: usize,
}

// ============================================================================
// Line Classification
// ============================================================================

/// Structural role of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Heading(&'a str),
    Bullet(&'a str),
    Prose(&'a str),
}

/// Classify one line of a source document.
pub fn classify_line(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }

    if let Some(rest) = line.strip_prefix("Title:") {
        return Line::Heading(rest.trim());
    }

    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.is_empty() || rest.starts_with(' ') {
            return Line::Heading(rest.trim());
        }
    }

    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Line::Bullet(rest.trim());
    }
    if line == "-" || line == "*" {
        return Line::Bullet("");
    }

    Line::Prose(line)
}

// ============================================================================
// Category Resolution
// ============================================================================

/// Resolve a heading to its category name.
///
/// The first rule whose keyword occurs in the heading (case-insensitive)
/// wins; otherwise the heading is slugified.
pub fn resolve_category(heading: &str, rules: &[CategoryRule]) -> String {
    let lowered = heading.to_lowercase();
    rules
        .iter()
        .find(|rule| lowered.contains(&rule.keyword.to_lowercase()))
        .map_or_else(|| slugify(heading), |rule| rule.category.clone())
}

/// Lower-case, with every run of non-alphanumerics collapsed to one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// ============================================================================
// Loader
// ============================================================================

/// Converts source documents into entries. Pure: no I/O, no shared state.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    rules: Vec<CategoryRule>,
    strict: bool,
}

impl DocumentLoader {
    pub fn new(rules: Vec<CategoryRule>, strict: bool) -> Self {
        Self { rules, strict }
    }

    pub fn from_config(config: &KbConfig) -> Self {
        Self::new(config.categories.clone(), config.loader.strict)
    }

    /// Parse a set of documents in order. The first malformed document
    /// aborts the whole parse; no partial corpus is returned.
    pub fn parse_documents(&self, documents: &[SourceDocument]) -> ParseResult<ParsedCorpus> {
        let mut corpus = ParsedCorpus::default();
        let mut seen_categories = HashSet::new();

        for doc in documents {
            let before = corpus.entries.len();
            self.parse_into(doc, &mut corpus, &mut seen_categories)?;
            corpus.documents += 1;
            debug!(
                document = %doc.name,
                entries = corpus.entries.len() - before,
                "Parsed knowledge base document"
            );
        }

        Ok(corpus)
    }

    /// Parse a single document into its entries.
    pub fn parse_document(&self, doc: &SourceDocument) -> ParseResult<Vec<Entry>> {
        let mut corpus = ParsedCorpus::default();
        self.parse_into(doc, &mut corpus, &mut HashSet::new())?;
        Ok(corpus.entries)
    }

    fn parse_into(
        &self,
        doc: &SourceDocument,
        corpus: &mut ParsedCorpus,
        seen_categories: &mut HashSet<String>,
    ) -> ParseResult<()> {
        let malformed = |line: usize, reason: &str| LoadError::MalformedDocument {
            document: doc.name.clone(),
            line,
            reason: reason.to_string(),
        };

        let mut current_category: Option<String> = None;

        for (idx, raw) in doc.text.lines().enumerate() {
            let line_no = idx + 1;
            match classify_line(raw) {
                Line::Blank => {}
                Line::Heading("") => return Err(malformed(line_no, "heading has no text")),
                Line::Heading(text) => {
                    let category = resolve_category(text, &self.rules);
                    if category.is_empty() {
                        return Err(malformed(line_no, "heading does not yield a category name"));
                    }
                    if seen_categories.insert(category.clone()) {
                        corpus.categories.push(category.clone());
                    }
                    current_category = Some(category);
                }
                Line::Bullet(body) => {
                    let Some(category) = current_category.as_ref() else {
                        return Err(malformed(line_no, "bullet appears before any heading"));
                    };
                    if body.is_empty() {
                        return Err(malformed(line_no, "bullet has no text"));
                    }
                    corpus.entries.push(Entry {
                        category: category.clone(),
                        tags: tags::extract_tags(body),
                        body: body.to_string(),
                        source: doc.name.clone(),
                        line: line_no,
                    });
                }
                Line::Prose(text) => {
                    if self.strict {
                        return Err(malformed(line_no, "line is neither a heading nor a bullet"));
                    }
                    warn!(
                        document = %doc.name,
                        line = line_no,
                        text = %text,
                        "Skipping prose line outside heading/bullet structure"
                    );
                }
            }
        }

        Ok(())
    }
}
