//! Embedding provider trait and mock implementation.
//!
//! The `EmbeddingProvider` trait abstracts over the model that turns a query
//! (or, offline, a corpus passage) into an L2-normalized vector.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: hashed bag-of-words vectors for tests
//! - `FastEmbedProvider`: local embedding via fastembed (requires `fastembed` feature)

use async_trait::async_trait;
use solorag_core::Result;

/// Trait for generating text embeddings.
///
/// Implementations must return unit-length vectors of `dimension()` floats so
/// that inner product equals cosine similarity during candidate search.
///
/// # Thread Safety
///
/// Implementations handle their own synchronization (e.g., `Arc<Mutex<>>`)
/// for thread-unsafe model runtimes.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The model name, recorded in the artifact manifest.
    fn name(&self) -> &str;
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

/// A mock embedding provider for testing.
///
/// Each lowercase token is hashed into one of `dimension` buckets and the
/// bucket counts are normalized. Texts sharing distinctive words therefore
/// land close together, which is enough for retrieval tests to be meaningful.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hashed_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&hash.as_bytes()[..8]);
            let bucket = (u64::from_le_bytes(prefix) % self.dimension as u64) as usize;
            embedding[bucket] += 1.0;
        }
        l2_normalize(&mut embedding);
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hashed_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hashed_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================
