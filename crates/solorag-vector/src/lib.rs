//! Retrieval infrastructure for SoloRAG.
//!
//! This crate owns everything between a question string and a ranked list
//! of passages: the read-only artifact store, query embedding, inner-product
//! candidate search, and cross-encoder reranking. It also carries the
//! offline writer that produces the artifact directory.
//!
//! # Features
//!
//! - `fastembed`: Enable local embedding and reranking models via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     solorag-vector                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ArtifactStore: load, verify, search(query, k, overfetch)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reranker trait + rerank()                                  │
//! │  ├── TokenOverlapReranker (always available)                │
//! │  └── FastEmbedReranker (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ArtifactWriter (offline batch embed + write)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use solorag_core::{Error, Result};

pub mod builder;
pub mod embedding;
pub mod persistence;
pub mod rerank;
pub mod store;
pub mod types;

#[cfg(feature = "fastembed")]
pub mod fastembed;

#[cfg(feature = "fastembed")]
pub mod fastembed_rerank;

pub use builder::{ArtifactWriter, build_artifacts, read_corpus_jsonl};
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
pub use persistence::ArtifactManifest;
pub use rerank::{Reranker, TokenOverlapReranker, rerank};
pub use store::ArtifactStore;
pub use types::EmbeddingConfig;

#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;

#[cfg(feature = "fastembed")]
pub use fastembed_rerank::FastEmbedReranker;

/// Create the embedding provider named in `config`.
///
/// Model loading failures surface as [`Error::IndexUnavailable`]; callers
/// treat them as fatal startup errors.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbeddingProvider::new(config.mock_dimension))),
        #[cfg(feature = "fastembed")]
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(
            &config.model,
            config.cache_path.as_deref(),
        )?)),
        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(Error::config(
            "embedding provider 'fastembed' requires the `fastembed` feature",
        )),
        other => Err(Error::config(format!(
            "Unknown embedding provider: '{other}'. Supported: fastembed, mock"
        ))),
    }
}

/// Create the reranker named in `config`.
pub fn create_reranker(config: &EmbeddingConfig) -> Result<Arc<dyn Reranker>> {
    match config.reranker.as_str() {
        "overlap" => Ok(Arc::new(TokenOverlapReranker::new())),
        #[cfg(feature = "fastembed")]
        "fastembed" => Ok(Arc::new(FastEmbedReranker::new(
            &config.reranker_model,
            config.cache_path.as_deref(),
        )?)),
        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(Error::config(
            "reranker 'fastembed' requires the `fastembed` feature",
        )),
        other => Err(Error::config(format!(
            "Unknown reranker: '{other}'. Supported: fastembed, overlap"
        ))),
    }
}
