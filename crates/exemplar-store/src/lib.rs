//! Exemplar-Store: Vector Index Backend for examforge
//!
//! This crate provides the persistence layer for style exemplars. It owns
//! every vector, document and metadata map; callers only ever hold transient
//! copies returned from queries.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: nearest-neighbour lookup, metadata scans, idempotent upserts.
//!
//! ## Key Components
//!
//! - `Embedder` / `VectorIndex`: the capability traits
//! - `SurrealHandle` + `SurrealExemplarIndex`: SurrealDB-backed index
//! - `fakes`: in-memory doubles for tests

mod error;
pub mod fakes;
mod handle;
pub mod schema;
pub mod storage_traits;
pub mod surreal_index;

pub use error::{EmbedError, StoreError};
pub use handle::{IndexConfig, SurrealHandle, DEFAULT_COLLECTION, DEFAULT_INDEX_PATH};
pub use schema::{metadata_f64, metadata_str, metadata_u32, ExemplarRow};
pub use storage_traits::{
    cosine_distance, ContentDigest, EmbedResult, Embedder, IndexHit, IndexRecord, Metadata,
    MetadataFilter, StoreResult, VectorIndex,
};
pub use surreal_index::SurrealExemplarIndex;

/// Connect to the configured index and return it together with its record count.
pub async fn open_index(config: &IndexConfig) -> StoreResult<(SurrealExemplarIndex, usize)> {
    let handle = SurrealHandle::connect(config).await?;
    let index = SurrealExemplarIndex::new(handle, config.collection.clone());
    let count = index.count().await?;
    Ok((index, count))
}
