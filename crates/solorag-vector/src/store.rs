//! The loaded artifact store and candidate search.
//!
//! [`ArtifactStore`] owns the vector matrix and the aligned passage texts.
//! It is built once at startup and only read afterwards, so it is shared
//! across requests behind an `Arc` with no locking.

use std::cmp::Ordering;
use std::path::Path;

use solorag_core::{Candidate, Error, Result};
use tracing::info;

use crate::persistence::{
    self, ArtifactManifest, MANIFEST_FILE, TEXTS_FILE, VECTORS_FILE, content_hash,
};

/// Read-only dense index plus text store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    manifest: ArtifactManifest,
    vectors: Vec<f32>,
    texts: Vec<String>,
}

impl ArtifactStore {
    /// Load and verify the artifacts in `dir`.
    ///
    /// Every failure, whether a missing file, a count or dimension mismatch,
    /// or a hash mismatch, is reported as [`Error::IndexUnavailable`].
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let unavailable =
            |e: Error| Error::index_unavailable(format!("{}: {e}", dir.display()));

        let manifest = persistence::load_manifest(&dir.join(MANIFEST_FILE)).map_err(unavailable)?;
        let vectors = persistence::load_vectors(&dir.join(VECTORS_FILE)).map_err(unavailable)?;
        let texts = persistence::load_texts(&dir.join(TEXTS_FILE)).map_err(unavailable)?;

        if texts.len() != manifest.document_count {
            return Err(Error::index_unavailable(format!(
                "manifest lists {} documents but {TEXTS_FILE} holds {}",
                manifest.document_count,
                texts.len()
            )));
        }
        let expected = manifest.document_count * manifest.embedding_dimension;
        if vectors.len() != expected {
            return Err(Error::index_unavailable(format!(
                "{VECTORS_FILE} holds {} values, expected {} x {}",
                vectors.len(),
                manifest.document_count,
                manifest.embedding_dimension
            )));
        }
        if content_hash(&vectors, &texts) != manifest.content_hash {
            return Err(Error::index_unavailable(format!(
                "content hash mismatch in {}",
                dir.display()
            )));
        }

        info!(
            path = %dir.display(),
            documents = manifest.document_count,
            dimension = manifest.embedding_dimension,
            model = %manifest.model,
            "artifact store loaded"
        );

        Ok(Self {
            manifest,
            vectors,
            texts,
        })
    }

    /// Build an in-memory store from precomputed embeddings.
    pub fn from_embeddings(
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        provider: &str,
        model: &str,
    ) -> Result<Self> {
        if texts.len() != embeddings.len() {
            return Err(Error::invalid_data(format!(
                "{} texts but {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }
        let dimension = embeddings.first().map_or(0, Vec::len);
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimension) {
            return Err(Error::invalid_data(format!(
                "embedding {bad} has dimension {}, expected {dimension}",
                embeddings[bad].len()
            )));
        }

        let vectors: Vec<f32> = embeddings.into_iter().flatten().collect();
        let manifest = ArtifactManifest {
            format_version: persistence::FORMAT_VERSION,
            document_count: texts.len(),
            embedding_dimension: dimension,
            provider: provider.to_string(),
            model: model.to_string(),
            built_at: chrono::Utc::now().to_rfc3339(),
            content_hash: content_hash(&vectors, &texts),
        };
        Ok(Self {
            manifest,
            vectors,
            texts,
        })
    }

    /// Persist this store into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        persistence::write_artifacts(dir.as_ref(), &self.manifest, &self.vectors, &self.texts)
    }

    /// Number of corpus entries.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.manifest.embedding_dimension
    }

    /// The manifest read at load time.
    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// Passage text at a corpus position.
    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    /// Stored embedding at a corpus position.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        (position < self.len()).then(|| self.row(position))
    }

    fn row(&self, position: usize) -> &[f32] {
        let dim = self.manifest.embedding_dimension;
        &self.vectors[position * dim..(position + 1) * dim]
    }

    /// Return the `min(k * overfetch, len)` nearest entries by inner product.
    ///
    /// Results are in non-increasing similarity order; equal similarities are
    /// ordered by corpus position.
    pub fn search(&self, query: &[f32], k: usize, overfetch: usize) -> Result<Vec<Candidate>> {
        if overfetch == 0 {
            return Err(Error::validation("overfetch must be at least 1"));
        }
        if query.len() != self.dimension() {
            return Err(Error::invalid_data(format!(
                "query vector has dimension {}, index has {}",
                query.len(),
                self.dimension()
            )));
        }

        let n = k.saturating_mul(overfetch).min(self.len());
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|i| (i, dot(self.row(i), query)))
            .collect();

        let by_similarity = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        };
        if n < scored.len() {
            scored.select_nth_unstable_by(n - 1, by_similarity);
            scored.truncate(n);
        }
        scored.sort_unstable_by(by_similarity);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| Candidate::vector(i, self.texts[i].clone(), similarity))
            .collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// ============================================================================
// Tests
// ============================================================================
