//! Storage trait definitions for examforge
//!
//! These traits define the two external capabilities the retriever relies on:
//! - `Embedder`: text in, fixed-length vector out
//! - `VectorIndex`: nearest-neighbour query, metadata scan, upsert
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{EmbedError, StoreError};

/// Result type for index operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for embedding operations
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

/// Flat metadata map stored alongside each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string) of an indexed document.
///
/// Only constructed through `from_bytes`, so the inner string is always
/// lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

/// Embedding provider.
///
/// Guarantees:
/// - a successful call returns a non-empty vector
/// - every vector from one provider has the same dimensionality
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;
}

// ---------------------------------------------------------------------------
// VectorIndex
// ---------------------------------------------------------------------------

/// Equality filter on a single metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    /// Match records whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `section = value`, the only filter the retriever issues.
    pub fn section(value: impl Into<String>) -> Self {
        Self::eq("section", value)
    }

    /// Whether the metadata satisfies this filter. Numbers and booleans are
    /// compared through their string rendering.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match metadata.get(&self.field) {
            Some(serde_json::Value::String(s)) => s == &self.value,
            Some(serde_json::Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// A record to insert or replace in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Caller-chosen stable id; upserting the same id replaces the record.
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Metadata,
}

impl IndexRecord {
    pub fn new(
        id: impl Into<String>,
        embedding: Vec<f32>,
        document: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            embedding,
            document: document.into(),
            metadata,
        }
    }

    /// Digest of the embedded document text.
    pub fn document_digest(&self) -> ContentDigest {
        ContentDigest::from_bytes(self.document.as_bytes())
    }
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    /// Cosine distance in `[0, 2]`; smaller is closer.
    pub distance: f32,
}

/// Vector similarity index.
///
/// Guarantees:
/// - `query` returns at most `top_k` hits ordered by ascending distance
/// - `query` with a filter never returns records that fail the filter
/// - `upsert` with an existing id replaces that record
/// - records whose dimensionality differs from the query vector are skipped
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest-neighbour search with an optional equality filter.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<IndexHit>>;

    /// Metadata of every stored record, in insertion order.
    async fn scan_all(&self) -> StoreResult<Vec<Metadata>>;

    /// Insert or replace a record.
    async fn upsert(&self, record: IndexRecord) -> StoreResult<()>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<usize>;

    /// Remove every record.
    async fn clear(&self) -> StoreResult<()>;
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Zero-norm vectors are treated as maximally distant from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> StoreResult<f32> {
    if a.len() != b.len() {
        return Err(StoreError::DimensionMismatch {
            expected: b.len(),
            actual: a.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: serde_json::Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cosine_distance_identical_is_zero() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal_is_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_dimension_mismatch() {
        let err = cosine_distance(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_filter_matches_string_and_number() {
        let m = meta(json!({"section": "Functions", "marks": 10}));
        assert!(MetadataFilter::section("Functions").matches(&m));
        assert!(!MetadataFilter::section("2D Arrays").matches(&m));
        assert!(MetadataFilter::eq("marks", "10").matches(&m));
        assert!(!MetadataFilter::eq("missing", "x").matches(&m));
    }
}
