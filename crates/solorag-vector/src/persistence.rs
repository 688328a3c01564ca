//! On-disk artifact format.
//!
//! An artifact directory holds three files written once by the offline
//! build and read once at startup:
//!
//! - `manifest.json`: [`ArtifactManifest`]
//! - `vectors.f32`: little-endian `f32`, row-major, `count * dimension` values
//! - `texts.json`: JSON array of passage strings, positionally aligned with rows
//!
//! The manifest's blake3 content hash covers both the vectors and the texts,
//! so a partially copied or hand-edited directory is detected at load time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solorag_core::{Error, Result};

/// Manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Vector matrix file name.
pub const VECTORS_FILE: &str = "vectors.f32";

/// Passage text file name.
pub const TEXTS_FILE: &str = "texts.json";

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored alongside the vectors and texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Artifact format version.
    pub format_version: u32,

    /// Number of corpus entries.
    pub document_count: usize,

    /// Embedding dimension.
    pub embedding_dimension: usize,

    /// Embedding provider name.
    pub provider: String,

    /// Model name used for embeddings.
    pub model: String,

    /// Build timestamp (RFC 3339).
    pub built_at: String,

    /// blake3 hash of vectors and texts.
    pub content_hash: String,
}

/// Compute the content hash of a vector matrix and its texts.
pub fn content_hash(vectors: &[f32], texts: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for value in vectors {
        hasher.update(&value.to_le_bytes());
    }
    for text in texts {
        hasher.update(&(text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Encode a row-major matrix as little-endian bytes.
pub fn encode_vectors(vectors: &[f32]) -> Vec<u8> {
    vectors.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian bytes into floats.
pub fn decode_vectors(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::invalid_data(format!(
            "{VECTORS_FILE} length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Write all three artifact files into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    manifest: &ArtifactManifest,
    vectors: &[f32],
    texts: &[String],
) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(e, dir))?;

    let vectors_path = dir.join(VECTORS_FILE);
    std::fs::write(&vectors_path, encode_vectors(vectors))
        .map_err(|e| Error::io_with_path(e, &vectors_path))?;

    let texts_path = dir.join(TEXTS_FILE);
    std::fs::write(&texts_path, serde_json::to_vec(texts)?)
        .map_err(|e| Error::io_with_path(e, &texts_path))?;

    // Manifest last: its presence marks a complete build.
    save_manifest(&dir.join(MANIFEST_FILE), manifest)
}

/// Save a manifest as pretty JSON.
pub fn save_manifest(path: &Path, manifest: &ArtifactManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json).map_err(|e| Error::io_with_path(e, path))?;
    Ok(())
}

/// Load a manifest.
pub fn load_manifest(path: &Path) -> Result<ArtifactManifest> {
    let json = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    Ok(serde_json::from_str(&json)?)
}

/// Load the texts array.
pub fn load_texts(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load the vector matrix.
pub fn load_vectors(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
    decode_vectors(&bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> (ArtifactManifest, Vec<f32>, Vec<String>) {
        let vectors = vec![1.0, 0.0, 0.0, 1.0];
        let texts = vec!["Refunds".to_string(), "Payouts".to_string()];
        let manifest = ArtifactManifest {
            format_version: FORMAT_VERSION,
            document_count: 2,
            embedding_dimension: 2,
            provider: "mock".to_string(),
            model: "mock".to_string(),
            built_at: "2026-01-15T12:00:00Z".to_string(),
            content_hash: content_hash(&vectors, &texts),
        };
        (manifest, vectors, texts)
    }

    #[test]
    fn test_write_and_load_artifacts() {
        let dir = tempdir().unwrap();
        let (manifest, vectors, texts) = sample();
        write_artifacts(dir.path(), &manifest, &vectors, &texts).unwrap();

        assert_eq!(load_manifest(&dir.path().join(MANIFEST_FILE)).unwrap(), manifest);
        assert_eq!(load_vectors(&dir.path().join(VECTORS_FILE)).unwrap(), vectors);
        assert_eq!(load_texts(&dir.path().join(TEXTS_FILE)).unwrap(), texts);
    }

    #[test]
    fn test_vectors_file_is_little_endian() {
        let bytes = encode_vectors(&[1.0]);
        assert_eq!(bytes, vec![0x00, 0x00, 0x80, 0x3f]);
    }

    #[test]
    fn test_decode_rejects_partial_float() {
        let err = decode_vectors(&[0, 0, 128]).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_content_hash_sensitive_to_text_boundaries() {
        let a = content_hash(&[], &["ab".to_string(), "c".to_string()]);
        let b = content_hash(&[], &["a".to_string(), "bc".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_hash_sensitive_to_vectors() {
        let texts = vec!["x".to_string()];
        assert_ne!(content_hash(&[1.0], &texts), content_hash(&[0.5], &texts));
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_manifest(&dir.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, Error::IoPath { .. }));
    }
}
