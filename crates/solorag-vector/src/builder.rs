//! Offline artifact build: embed a corpus and write the artifact directory.
//!
//! Input is the crawler's JSON Lines output, one `{"text": ...}` object per
//! line. Nothing here runs at serve time.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use solorag_core::{Error, Result};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::store::ArtifactStore;

#[derive(Debug, Deserialize)]
struct CorpusLine {
    text: String,
}

/// Parse JSON Lines corpus content into passage texts.
///
/// Blank lines are skipped. Entries whose text is blank are dropped, since
/// they can never ground an answer.
pub fn parse_corpus_jsonl(content: &str) -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: CorpusLine = serde_json::from_str(line).map_err(|e| {
            Error::invalid_data(format!("corpus line {}: {e}", lineno + 1))
        })?;
        if !entry.text.trim().is_empty() {
            texts.push(entry.text);
        }
    }
    Ok(texts)
}

/// Read a JSON Lines corpus file.
pub fn read_corpus_jsonl(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    parse_corpus_jsonl(&content)
}

/// Embeds passages in batches and assembles an [`ArtifactStore`].
pub struct ArtifactWriter {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl ArtifactWriter {
    /// Create a writer around an embedding provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: 64,
        }
    }

    /// Set the embedding batch size (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed `texts` and return the resulting in-memory store.
    pub async fn build(&self, texts: Vec<String>) -> Result<ArtifactStore> {
        if texts.is_empty() {
            return Err(Error::invalid_data("corpus is empty"));
        }

        let total = texts.len();
        let mut embeddings = Vec::with_capacity(total);
        for (batch_idx, chunk) in texts.chunks(self.batch_size).enumerate() {
            let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
            let batch = self.provider.embed_batch(&refs).await?;
            if batch.len() != chunk.len() {
                return Err(Error::operation(format!(
                    "{} returned {} embeddings for {} texts",
                    self.provider.name(),
                    batch.len(),
                    chunk.len()
                )));
            }
            embeddings.extend(batch);
            debug!(batch = batch_idx, done = embeddings.len(), total, "embedded batch");
        }

        ArtifactStore::from_embeddings(
            texts,
            embeddings,
            provider_kind(self.provider.name()),
            self.provider.name(),
        )
    }

    /// Embed `texts` and write the artifact directory.
    pub async fn write(&self, texts: Vec<String>, output: &Path) -> Result<ArtifactStore> {
        let store = self.build(texts).await?;
        store.save(output)?;
        info!(
            path = %output.display(),
            documents = store.len(),
            dimension = store.dimension(),
            "artifacts written"
        );
        Ok(store)
    }
}

fn provider_kind(model_name: &str) -> &'static str {
    if model_name == "mock" { "mock" } else { "fastembed" }
}

/// Read a JSON Lines corpus and write its artifacts in one step.
pub async fn build_artifacts(
    provider: Arc<dyn EmbeddingProvider>,
    input: &Path,
    output: &Path,
    batch_size: usize,
) -> Result<ArtifactStore> {
    let texts = read_corpus_jsonl(input)?;
    info!(path = %input.display(), documents = texts.len(), "corpus read");
    ArtifactWriter::new(provider)
        .with_batch_size(batch_size)
        .write(texts, output)
        .await
}

// ============================================================================
// Tests
// ============================================================================
