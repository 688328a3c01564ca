//! Cross-encoder reranking of search candidates.
//!
//! A [`Reranker`] scores `(query, passage)` pairs jointly. [`rerank`] applies
//! one to a candidate list and keeps the best `k`, breaking score ties by the
//! candidates' incoming order.

use solorag_core::{Candidate, Error, Result, ScoredPassage};

use crate::embedding::tokenize;

/// Scores query/passage pairs.
///
/// Scoring is CPU-bound model inference; callers run it off the async
/// reactor (see `spawn_blocking` in the retriever).
pub trait Reranker: Send + Sync {
    /// Return one relevance score per passage, in input order.
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;

    /// Reranker name for diagnostics.
    fn name(&self) -> &str;
}

/// Rerank `candidates` against `query` and keep the top `k`.
///
/// Output length is `min(k, candidates.len())`, scores are non-increasing,
/// and equal scores keep their input order.
pub fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    candidates: Vec<Candidate>,
    k: usize,
) -> Result<Vec<ScoredPassage>> {
    if candidates.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let passages: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
    let scores = reranker.score(query, &passages)?;
    if scores.len() != candidates.len() {
        return Err(Error::operation(format!(
            "{} returned {} scores for {} passages",
            reranker.name(),
            scores.len(),
            candidates.len()
        )));
    }

    let mut scored: Vec<ScoredPassage> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, score)| ScoredPassage::new(candidate.text, score))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);

    tracing::debug!(
        reranker = reranker.name(),
        kept = scored.len(),
        "candidates reranked"
    );
    Ok(scored)
}

/// A lexical reranker for tests and model-free runs.
///
/// Scores a passage by the fraction of distinct query tokens it contains.
#[derive(Debug, Clone, Default)]
pub struct TokenOverlapReranker;

impl TokenOverlapReranker {
    /// Create a new overlap reranker.
    pub fn new() -> Self {
        Self
    }
}

impl Reranker for TokenOverlapReranker {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let mut query_tokens: Vec<String> = tokenize(query).collect();
        query_tokens.sort();
        query_tokens.dedup();
        if query_tokens.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|passage| {
                let passage_tokens: std::collections::HashSet<String> =
                    tokenize(passage).collect();
                let hits = query_tokens
                    .iter()
                    .filter(|t| passage_tokens.contains(*t))
                    .count();
                hits as f32 / query_tokens.len() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "overlap"
    }
}

// ============================================================================
// Tests
// ============================================================================
