//! Candidate search and reranking for one question.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solorag_core::{Error, Result, ScoredPassage};
use solorag_vector::{ArtifactStore, EmbeddingProvider, Reranker, rerank};
use tracing::debug;

/// Retrieval depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages kept after reranking.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub k: usize,

    /// Candidate pool multiplier; search fetches `k * overfetch`.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub overfetch: usize,

    /// Maximum characters per context bullet in the prompt.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub snippet_width: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 4,
            overfetch: 5,
            snippet_width: crate::prompt::DEFAULT_SNIPPET_WIDTH,
        }
    }
}

/// Embeds a question, searches the store, and reranks the candidates.
///
/// All three collaborators are loaded once and shared; nothing here is
/// mutated per request.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<ArtifactStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever over loaded artifacts and models.
    pub fn new(
        store: Arc<ArtifactStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            config,
        }
    }

    /// The retrieval settings.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Return the top `k` passages for `question`, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredPassage>> {
        let query = self.embedder.embed(question).await?;

        let store = self.store.clone();
        let reranker = self.reranker.clone();
        let question = question.to_string();
        let RetrievalConfig { k, overfetch, .. } = self.config;

        // Search and cross-encoder scoring are CPU-bound.
        tokio::task::spawn_blocking(move || {
            let candidates = store.search(&query, k, overfetch)?;
            debug!(candidates = candidates.len(), "vector search done");
            rerank(reranker.as_ref(), &question, candidates, k)
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("documents", &self.store.len())
            .field("embedder", &self.embedder.name())
            .field("reranker", &self.reranker.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use solorag_vector::{ArtifactWriter, MockEmbeddingProvider, TokenOverlapReranker};

    async fn retriever(texts: &[&str], config: RetrievalConfig) -> Retriever {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(128));
        let store = ArtifactWriter::new(embedder.clone())
            .build(texts.iter().map(|t| t.to_string()).collect())
            .await
            .unwrap();
        Retriever::new(
            Arc::new(store),
            embedder,
            Arc::new(TokenOverlapReranker::new()),
            config,
        )
    }

    #[test]
    fn test_retrieval_config_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.k, 4);
        assert_eq!(config.overfetch, 5);
        assert_eq!(config.snippet_width, 300);
    }

    #[tokio::test]
    async fn test_retrieve_returns_k_best_first() {
        let texts = [
            "Refunds return money to the customer card.",
            "Payouts move your balance to your bank.",
            "Disputes are raised by cardholders with their bank.",
            "Radar blocks fraudulent payments.",
            "Invoices can be emailed to customers.",
            "Connect platforms route payouts to sellers.",
        ];
        let config = RetrievalConfig {
            k: 2,
            ..RetrievalConfig::default()
        };
        let retriever = retriever(&texts, config).await;

        let passages = retriever.retrieve("how do disputes work with the bank").await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, texts[2]);
        assert!(passages[0].score >= passages[1].score);
    }

    #[tokio::test]
    async fn test_retrieve_small_corpus() {
        let retriever = retriever(&["only passage"], RetrievalConfig::default()).await;
        let passages = retriever.retrieve("anything").await.unwrap();
        assert_eq!(passages.len(), 1);
    }
}
