//! Title similarity for near-duplicate work detection.
//!
//! Titles are reduced to sets of normalized tokens and compared with
//! Jaccard similarity. Callers compare the score against
//! [`SIMILARITY_THRESHOLD`]; it is a fuzzy "same kind of work" signal,
//! not a ranking.

use std::collections::HashSet;

/// Score at or above which two titles describe the same kind of work.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Tokens shorter than this (in characters) are discarded.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Latin (including accented) and Cyrillic letters, ASCII digits.
fn is_token_char(c: char) -> bool {
    if c.is_ascii_alphanumeric() {
        return true;
    }
    c.is_alphabetic()
        && matches!(
            c,
            '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' | '\u{0400}'..='\u{04FF}'
        )
}

/// Normalize text into a set of tokens.
///
/// Lowercases, turns everything except Latin/Cyrillic letters, digits and
/// whitespace into separators, splits on whitespace and drops short tokens.
///
/// Example: `"Rapid, Response! Звіт-42?"` → `{"rapid", "response", "звіт"}`
pub fn tokenize(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_token_char(c) { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity: |A ∩ B| / |A ∪ B|.
///
/// Two empty sets are maximally similar (1.0).
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Tokenize both titles and compare them.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

/// Returns true if two titles meet [`SIMILARITY_THRESHOLD`].
pub fn is_similar_title(a: &str, b: &str) -> bool {
    title_similarity(a, b) >= SIMILARITY_THRESHOLD
}
