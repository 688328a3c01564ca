//! Cross-encoder reranker backed by `fastembed::TextRerank`.

use std::sync::Mutex;

use solorag_core::{Error, Result};
use tracing::info;

use crate::rerank::Reranker;

/// Map a reranker name to a fastembed `RerankerModel` variant.
pub(crate) fn resolve_reranker_model(name: &str) -> Result<fastembed::RerankerModel> {
    match name {
        "bge-reranker-base" | "BGERerankerBase" => Ok(fastembed::RerankerModel::BGERerankerBase),
        "bge-reranker-v2-m3" | "BGERerankerV2M3" => Ok(fastembed::RerankerModel::BGERerankerV2M3),
        "jina-reranker-v1-turbo-en" | "JINARerankerV1TurboEn" => {
            Ok(fastembed::RerankerModel::JINARerankerV1TurboEn)
        }
        "jina-reranker-v2-base-multilingual" | "JINARerankerV2BaseMultiligual" => {
            Ok(fastembed::RerankerModel::JINARerankerV2BaseMultiligual)
        }
        other => Err(Error::config(format!(
            "Unknown reranker model: '{other}'. Supported: bge-reranker-base, bge-reranker-v2-m3, \
             jina-reranker-v1-turbo-en, jina-reranker-v2-base-multilingual"
        ))),
    }
}

/// Local cross-encoder reranker.
///
/// Scoring is synchronous; the mutex serializes access to the ONNX session.
pub struct FastEmbedReranker {
    model: Mutex<fastembed::TextRerank>,
    model_name: String,
}

impl FastEmbedReranker {
    /// Load the named cross-encoder, downloading it into `cache_path` if needed.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let model_enum = resolve_reranker_model(model_name)?;

        let mut init = fastembed::RerankInitOptions::new(model_enum);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }

        let model = fastembed::TextRerank::try_new(init).map_err(|e| {
            Error::index_unavailable(format!("Failed to load reranker {model_name}: {e}"))
        })?;

        info!(model = model_name, "reranker model loaded");

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
        })
    }
}

impl Reranker for FastEmbedReranker {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
        let documents: Vec<&str> = passages.to_vec();
        let results = model
            .rerank(query, documents, false, None)
            .map_err(|e| Error::operation(format!("Reranking failed: {e}")))?;

        // Results come back sorted by score; restore input order.
        let mut scores = vec![f32::NEG_INFINITY; passages.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedReranker")
            .field("model", &self.model_name)
            .finish()
    }
}
