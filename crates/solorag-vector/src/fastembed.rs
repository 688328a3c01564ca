//! FastEmbed embedding provider.
//!
//! Wraps `fastembed::TextEmbedding` for local query embedding with
//! pre-trained sentence models.
//!
//! # Thread Safety
//!
//! The model runtime needs exclusive access per call, so it lives behind
//! `Arc<Mutex<>>` and every call runs under `tokio::task::spawn_blocking`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solorag_core::{Error, Result};
use tracing::info;

use crate::embedding::{EmbeddingProvider, l2_normalize};

/// Map a model name to a fastembed `EmbeddingModel` variant.
pub(crate) fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" | "BGELargeENV15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "multilingual-e5-base" | "MultilingualE5Base" => {
            Ok(fastembed::EmbeddingModel::MultilingualE5Base)
        }
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: bge-small-en-v1.5, bge-base-en-v1.5, \
             bge-large-en-v1.5, all-minilm-l6-v2, multilingual-e5-base"
        ))),
    }
}

/// FastEmbed-based embedding provider.
///
/// | Name | Dimension |
/// |------|-----------|
/// | `bge-small-en-v1.5` | 384 |
/// | `bge-base-en-v1.5` | 768 |
/// | `bge-large-en-v1.5` | 1024 |
/// | `all-minilm-l6-v2` | 384 |
/// | `multilingual-e5-base` | 768 |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load the named model, downloading it into `cache_path` if needed.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let model_enum = resolve_model(model_name)?;

        let mut init = fastembed::InitOptions::new(model_enum);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }

        let mut text_embedding = fastembed::TextEmbedding::try_new(init).map_err(|e| {
            Error::index_unavailable(format!("Failed to load embedding model {model_name}: {e}"))
        })?;

        let probe = text_embedding
            .embed(vec!["dimension probe"], None)
            .map_err(|e| Error::operation(format!("Failed to probe embedding dimension: {e}")))?;
        let dimension = probe
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::operation("Empty probe embedding"))?;

        info!(model = model_name, dimension, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }

    fn embed_blocking(
        model: &Mutex<fastembed::TextEmbedding>,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>> {
        let mut model = model
            .lock()
            .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
        let mut vectors = model
            .embed(texts, None)
            .map_err(|e| Error::operation(format!("Embedding failed: {e}")))?;
        for vector in &mut vectors {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            Self::embed_blocking(&model, vec![text])?
                .into_iter()
                .next()
                .ok_or_else(|| Error::operation("No embedding returned"))
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        tokio::task::spawn_blocking(move || Self::embed_blocking(&model, texts))
            .await
            .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
