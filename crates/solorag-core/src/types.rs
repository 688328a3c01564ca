//! Request-scoped data carried through the answer pipeline.
//!
//! Nothing here is persisted. A [`Candidate`] lives between vector search and
//! reranking; a [`ScoredPassage`] is both prompt context and the provenance
//! returned to the caller.

use serde::{Deserialize, Serialize};

/// Which retrieval stage produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// Dense inner-product search.
    Vector,
}

/// A corpus entry returned by candidate search, before reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Corpus position; the join key between the vector index and text store.
    pub position: usize,

    /// The passage text.
    pub text: String,

    /// Inner-product similarity against the query vector.
    pub similarity: f32,

    /// Stage that produced this candidate.
    pub source: CandidateSource,
}

impl Candidate {
    /// Create a vector-search candidate.
    pub fn vector(position: usize, text: impl Into<String>, similarity: f32) -> Self {
        Self {
            position,
            text: text.into(),
            similarity,
            source: CandidateSource::Vector,
        }
    }
}

/// A passage with its cross-encoder relevance score.
///
/// Serializes as `{ "text": ..., "score": ... }`, the shape of one entry in
/// the `sources` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// The passage text.
    pub text: String,

    /// Relevance score; unbounded, higher is more relevant.
    pub score: f32,
}

impl ScoredPassage {
    /// Create a scored passage.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// The blocking response: a generated answer and the passages behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Markdown answer text.
    pub answer: String,

    /// Grounding passages in reranked order.
    pub sources: Vec<ScoredPassage>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_passage_wire_shape() {
        let passage = ScoredPassage::new("Payouts arrive in 2 days.", 7.5);
        let json: serde_json::Value = serde_json::to_value(&passage).unwrap();
        assert_eq!(json["text"], "Payouts arrive in 2 days.");
        assert_eq!(json["score"], 7.5);
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_answer_wire_shape() {
        let answer = Answer {
            answer: "Two days.".to_string(),
            sources: vec![ScoredPassage::new("a", 1.0)],
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["answer"], "Two days.");
        assert!(json["sources"].is_array());
    }

    #[test]
    fn test_candidate_source_serializes_lowercase() {
        let candidate = Candidate::vector(3, "text", 0.8);
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["source"], "vector");
        assert_eq!(json["position"], 3);
    }
}
