//! Knowledge Base Integration Tests
//!
//! Loads the bundled `kb/` corpus through the public API and checks the
//! loader, index and query interface against it end to end.

use plc_kb::config::KbConfig;
use plc_kb::{KnowledgeBase, KnowledgeBaseHandle, LoadError, QueryError};
use std::path::PathBuf;
use tempfile::TempDir;

fn bundled_kb_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("kb")
}

fn bundled_config() -> KbConfig {
    let mut config = KbConfig::default();
    config.source.dir = bundled_kb_dir();
    config
}

fn load_bundled() -> KnowledgeBaseHandle {
    KnowledgeBaseHandle::load(bundled_config()).expect("bundled corpus should load")
}

#[test]
fn test_bundled_corpus_categories_and_counts() {
    let handle = load_bundled();
    let query = handle.query();

    let categories: Vec<&str> = query.list_categories().collect();
    assert_eq!(categories, vec!["syntax", "safety"]);

    assert_eq!(query.by_category("syntax").len(), 7);
    assert_eq!(query.by_category("safety").len(), 5);

    let stats = handle.snapshot().stats();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.entries, 12);
    assert_eq!(stats.categories, 2);
}

#[test]
fn test_emergency_stop_search_finds_exact_entry() {
    let query = load_bundled().query();

    let hits = query.search("EmergencyStop").unwrap();
    assert_eq!(hits.len(), 1);
    let entry = &hits[0].entry;
    assert_eq!(entry.category, "safety");
    assert_eq!(
        entry.body,
        "EmergencyStop trips all actuators immediately and latches until reset."
    );
    assert!(entry.has_tag("emergencystop"));
    assert_eq!(entry.source, "safety_interlocks.md");
    assert_eq!(entry.line, 2);

    // Case-insensitive
    let lower = query.search("emergencystop").unwrap();
    assert_eq!(lower, hits);
}

#[test]
fn test_empty_and_whitespace_queries_rejected() {
    let query = load_bundled().query();
    assert_eq!(query.search(""), Err(QueryError::EmptyQuery));
    assert_eq!(query.search("   "), Err(QueryError::EmptyQuery));
    assert_eq!(query.compose_context("", None), Err(QueryError::EmptyQuery));
}

#[test]
fn test_unknown_category_and_tag_are_empty() {
    let query = load_bundled().query();
    assert!(query.by_category("motion").is_empty());
    assert!(query.by_tag("NoSuchTag").is_empty());
    assert!(query.search("zzzz-not-present").unwrap().is_empty());
}

#[test]
fn test_every_bullet_becomes_exactly_one_entry() {
    let kb = load_bundled().snapshot();

    let mut expected = Vec::new();
    for name in ["iec61131_st_syntax.md", "safety_interlocks.md"] {
        let text = std::fs::read_to_string(bundled_kb_dir().join(name)).unwrap();
        for line in text.lines() {
            if let Some(body) = line.trim().strip_prefix("- ") {
                expected.push(body.trim().to_string());
            }
        }
    }

    let bodies: Vec<&str> = kb.entries().iter().map(|e| e.body.as_str()).collect();
    assert_eq!(bodies, expected);

    // Union of categories covers every entry exactly once.
    let covered: usize = kb.categories().map(|c| kb.by_category(c).len()).sum();
    assert_eq!(covered, kb.entries().len());
}

#[test]
fn test_load_is_idempotent() {
    let config = bundled_config();
    let first = KnowledgeBase::load(&config).unwrap();
    let second = KnowledgeBase::load(&config).unwrap();
    assert_eq!(first.entries(), second.entries());
    assert_eq!(
        first.categories().collect::<Vec<_>>(),
        second.categories().collect::<Vec<_>>()
    );
}

#[test]
fn test_search_results_ranked_and_limited() {
    let query = load_bundled().query();

    let hits = query.search("interlock").unwrap();
    assert!(hits.len() >= 2);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits.iter().all(|h| h.entry.category == "safety"));

    let top = query.search_top("interlock", Some(1)).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0], hits[0]);
}

#[test]
fn test_compose_context_cites_sources() {
    let query = load_bundled().query();

    let context = query
        .compose_context("EmergencyStop latch", Some(2))
        .unwrap();
    assert!(context.starts_with("Source: safety_interlocks.md#2\n[safety] EmergencyStop"));
    assert!(context.matches("Source: ").count() <= 2);

    let nothing = query.compose_context("?!", None).unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn test_missing_directory_yields_empty_knowledge_base() {
    let tmp = TempDir::new().unwrap();
    let mut config = KbConfig::default();
    config.source.dir = tmp.path().join("does-not-exist");

    let handle = KnowledgeBaseHandle::load(config).unwrap();
    let query = handle.query();
    assert_eq!(query.list_categories().count(), 0);
    assert!(query.search("anything").unwrap().is_empty());
}

#[test]
fn test_malformed_document_fails_whole_load() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a_good.md"), "Title: Safety\n- fine\n").unwrap();
    std::fs::write(tmp.path().join("b_bad.md"), "- orphan bullet\nTitle: Syntax\n").unwrap();

    let mut config = KbConfig::default();
    config.source.dir = tmp.path().to_path_buf();

    match KnowledgeBaseHandle::load(config) {
        Err(LoadError::MalformedDocument { document, line, .. }) => {
            assert_eq!(document, "b_bad.md");
            assert_eq!(line, 1);
        }
        Err(other) => panic!("expected MalformedDocument, got {other}"),
        Ok(_) => panic!("malformed corpus must not load"),
    }
}

#[test]
fn test_reload_after_edit_keeps_old_snapshot_readable() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.md");
    std::fs::write(&path, "# Syntax\n- Use `:=` for assignment\n").unwrap();

    let mut config = KbConfig::default();
    config.source.dir = tmp.path().to_path_buf();
    let handle = KnowledgeBaseHandle::load(config).unwrap();
    let before = handle.snapshot();

    std::fs::write(
        &path,
        "# Syntax\n- Use `:=` for assignment\n\n# Safety\n- Outputs default to FALSE\n",
    )
    .unwrap();
    let after = handle.reload().unwrap();

    assert_eq!(before.entries().len(), 1);
    assert_eq!(after.entries().len(), 2);
    assert_eq!(handle.query().by_category("safety").len(), 1);

    // Broken edit: reload fails, current snapshot survives.
    std::fs::write(&path, "- no heading\n").unwrap();
    assert!(handle.reload().is_err());
    assert_eq!(handle.snapshot().entries().len(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_does_not_duplicate_entries() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.md"), "Title: Safety\n- Outputs default to FALSE\n").unwrap();
    std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop")).unwrap();

    let mut config = KbConfig::default();
    config.source.dir = tmp.path().to_path_buf();
    let stats = KnowledgeBaseHandle::load(config).unwrap().snapshot().stats();
    assert_eq!(stats.documents, 1);
    assert_eq!(stats.entries, 1);
}
