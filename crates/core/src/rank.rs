//! Similarity ranking of candidate memories against a query vector.

use crate::types::{MatchType, MemoryRecord, SearchResult};

/// Cosine similarity clamped to [-1, 1]. Mismatched lengths, empty vectors
/// and zero-magnitude vectors all score 0 rather than erroring, so one bad
/// stored vector cannot take down a search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (dot / denominator).clamp(-1.0, 1.0)
}

/// Score, filter and order candidates. Unprocessed records are dropped,
/// scores at or below `threshold` are dropped, ties are broken by recency
/// and at most `top_k` results survive.
pub fn rank_candidates(
    query: &[f32],
    candidates: Vec<MemoryRecord>,
    threshold: f32,
    top_k: usize,
    date_filtered: bool,
) -> Vec<SearchResult> {
    let match_type =
        if date_filtered { MatchType::TemporalSemantic } else { MatchType::SemanticOnly };

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|record| {
            let similarity = match record.embedding.as_deref() {
                Some(embedding) => cosine_similarity(query, embedding),
                None => return None,
            };
            if similarity <= threshold {
                return None;
            }
            Some(SearchResult {
                id: record.id,
                raw_text: record.raw_text,
                summary: record.summary,
                context: record.context,
                mood: record.mood,
                created_at: record.created_at,
                similarity,
                match_type,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    results.truncate(top_k);
    results
}
