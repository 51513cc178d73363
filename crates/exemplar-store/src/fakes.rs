//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryVectorIndex`, `HashEmbedder`, `FailingEmbedder` and
//! `FailingIndex` that satisfy the trait contracts without any external
//! dependencies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EmbedError, StoreError};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryVectorIndex
// ---------------------------------------------------------------------------

/// In-memory vector index backed by an insertion-ordered `Vec<IndexRecord>`.
#[derive(Debug, Default)]
pub struct MemoryVectorIndex {
    records: Mutex<Vec<IndexRecord>>,
    queries: AtomicUsize,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<IndexHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();

        let mut hits = Vec::new();
        for record in records.iter() {
            if let Some(filter) = filter {
                if !filter.matches(&record.metadata) {
                    continue;
                }
            }
            let Ok(distance) = cosine_distance(embedding, &record.embedding) else {
                continue;
            };
            hits.push(IndexHit {
                id: record.id.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                distance,
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn scan_all(&self) -> StoreResult<Vec<Metadata>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().map(|r| r.metadata.clone()).collect())
    }

    async fn upsert(&self, record: IndexRecord) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.lock().unwrap().len())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.lock().unwrap().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FailingIndex
// ---------------------------------------------------------------------------

/// Index whose every call fails with a query error.
#[derive(Debug, Default)]
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn query(
        &self,
        _embedding: &[f32],
        _top_k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<IndexHit>> {
        Err(StoreError::Query("index offline".to_string()))
    }

    async fn scan_all(&self) -> StoreResult<Vec<Metadata>> {
        Err(StoreError::Query("index offline".to_string()))
    }

    async fn upsert(&self, _record: IndexRecord) -> StoreResult<()> {
        Err(StoreError::Query("index offline".to_string()))
    }

    async fn count(&self) -> StoreResult<usize> {
        Err(StoreError::Query("index offline".to_string()))
    }

    async fn clear(&self) -> StoreResult<()> {
        Err(StoreError::Query("index offline".to_string()))
    }
}

// ---------------------------------------------------------------------------
// HashEmbedder
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of `dims`
/// buckets, so texts sharing vocabulary land close together.
#[derive(Debug)]
pub struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dims as u64) as usize
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[self.bucket(token)] += 1.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            // Keep the vector non-zero so cosine distance stays defined.
            vector[0] = 1.0;
        }
        Ok(vector)
    }
}

// ---------------------------------------------------------------------------
// FailingEmbedder
// ---------------------------------------------------------------------------

/// Embedder whose every call fails.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
        Err(EmbedError::Request("embedding service unavailable".to_string()))
    }
}
