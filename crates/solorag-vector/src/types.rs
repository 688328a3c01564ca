//! Configuration for the embedding and reranking models.

use serde::{Deserialize, Serialize};

/// Model selection for query embedding and cross-encoder reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider: "fastembed" or "mock".
    pub provider: String,

    /// Embedding model name (e.g., "bge-base-en-v1.5").
    pub model: String,

    /// Reranker: "fastembed" or "overlap".
    pub reranker: String,

    /// Cross-encoder model name (e.g., "bge-reranker-base").
    pub reranker_model: String,

    /// Directory for downloaded model files.
    pub cache_path: Option<String>,

    /// Batch size for offline corpus embedding.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub batch_size: usize,

    /// Dimension of the mock provider's vectors.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub mock_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "bge-base-en-v1.5".to_string(),
            reranker: "fastembed".to_string(),
            reranker_model: "bge-reranker-base".to_string(),
            cache_path: None,
            batch_size: 64,
            mock_dimension: 256,
        }
    }
}
