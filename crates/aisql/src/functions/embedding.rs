//! Vector math for the embedding functions

use serde::Serialize;
use serde_json::Value;

/// Longest snippet, in characters, before truncation
pub const SNIPPET_CHARS: usize = 200;

/// Cosine similarity of two vectors.
///
/// Computed in `f64`. Extra trailing components of the longer vector are
/// ignored in the dot product. A zero-magnitude vector gives `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let magnitude = |v: &[f32]| {
        v.iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt()
    };

    let denominator = magnitude(a) * magnitude(b);
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

/// A candidate text and its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredText {
    pub text: String,
    pub similarity: f64,
}

/// A search hit for `ai_document_search`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentHit {
    pub doc_id: Value,
    pub score: f64,
    pub snippet: String,
}

/// Sort by descending score and keep the first `k`.
///
/// The sort is stable, so equal scores keep their input order.
pub fn top_k<T>(mut items: Vec<T>, k: usize, score: impl Fn(&T) -> f64) -> Vec<T> {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
    items.truncate(k);
    items
}

/// The first [`SNIPPET_CHARS`] characters, with `...` when cut
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
