//! PLC-KB: Structured Text & Safety Interlock Knowledge Base
//!
//! Reference notes on IEC 61131-3 Structured Text conventions and
//! safety-interlock practice, parsed into addressable entries for
//! downstream tooling (code generators, linters, prompt-context builders).
//!
//! ## Architecture
//!
//! - **Document Loader**: heading-then-bullets text → categorised, tagged entries
//! - **Entry Index**: category and tag lookup over the owned entry sequence
//! - **Query Interface**: read-only categories / by-category / ranked search
//! - **Handle + Watcher**: atomic snapshot swap on source changes
//! - **API**: thin Axum surface over the query interface

pub mod api;
pub mod config;
pub mod knowledge_base;
pub mod types;

// Re-export configuration
pub use config::KbConfig;

// Re-export commonly used types
pub use types::{Entry, KnowledgeBaseStats, SearchHit};

// Re-export knowledge base components
pub use knowledge_base::{
    DocumentLoader, KnowledgeBase, KnowledgeBaseHandle, KnowledgeStore, LoadError, QueryError,
    QueryInterface, SourceDocument,
};
