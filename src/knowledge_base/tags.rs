//! Tag extraction from bullet text
//!
//! A tag is either a backtick-quoted span (`` `IF ... THEN` ``) or an
//! identifier-like token starting with an upper-case letter (`EmergencyStop`,
//! `TON`, `BOOL`). Tags keep the spelling of their first occurrence and are
//! unique case-insensitively within one entry.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("static backtick regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("static token regex"))
}

/// Extract tags from bullet text, in first-seen order.
///
/// Backtick spans are collected first; capitalised tokens are then taken
/// from the text with those spans removed, so `` `END_IF` `` is not counted
/// twice.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    let mut push = |tag: &str| {
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag.to_string());
        }
    };

    for cap in backtick_re().captures_iter(text) {
        let inner = cap[1].trim();
        if !inner.is_empty() {
            push(inner);
        }
    }

    let outside = backtick_re().replace_all(text, " ");
    for m in token_re().find_iter(&outside) {
        if is_capitalised(m.as_str()) {
            push(m.as_str());
        }
    }

    tags
}

/// Upper-case first letter and at least two characters.
fn is_capitalised(token: &str) -> bool {
    token.len() >= 2 && token.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Split free text into lower-cased search terms.
pub fn query_terms(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
