//! Order-insensitive fuzzy similarity between product titles

use strsim::normalized_levenshtein;

use super::normalizer::normalize;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 70.0;

/// Normalized title with its tokens sorted alphabetically, so that word
/// order does not affect comparisons.
pub fn token_sort_key(text: &str) -> String {
    let normalized = normalize(text);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity in `[0, 100]` between two precomputed token-sort keys.
///
/// An empty key matches nothing, not even another empty key: titles that
/// normalize away entirely carry no evidence of being the same product.
pub fn key_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (normalized_levenshtein(a, b) * 100.0).clamp(0.0, 100.0)
}

/// Token-sort Levenshtein ratio of two raw titles, in `[0, 100]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    key_similarity(&token_sort_key(a), &token_sort_key(b))
}

pub fn are_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) >= threshold
}
