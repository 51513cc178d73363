//! SurrealDB-backed implementation of [`VectorIndex`].
//!
//! Rows for one logical collection are loaded (optionally narrowed by the
//! section column server-side) and ranked by cosine distance in process.
//! Question banks are small enough that a brute-force scan is cheaper than
//! maintaining an ANN index.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::handle::SurrealHandle;
use crate::schema::ExemplarRow;
use crate::storage_traits::{
    cosine_distance, IndexHit, IndexRecord, Metadata, MetadataFilter, StoreResult, VectorIndex,
};

/// Exemplar index persisted in SurrealDB.
#[derive(Clone)]
pub struct SurrealExemplarIndex {
    handle: SurrealHandle,
    collection: String,
}

impl SurrealExemplarIndex {
    pub fn new(handle: SurrealHandle, collection: impl Into<String>) -> Self {
        Self {
            handle,
            collection: collection.into(),
        }
    }

    /// Collection this index reads and writes
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn load_rows(&self, section: Option<&str>) -> StoreResult<Vec<ExemplarRow>> {
        let collection = self.collection.clone();
        let mut response = match section {
            Some(section) => {
                self.handle
                    .db()
                    .query(
                        "SELECT * FROM exemplars WHERE collection = $collection AND section = $section ORDER BY created_at",
                    )
                    .bind(("collection", collection))
                    .bind(("section", section.to_string()))
                    .await?
            }
            None => {
                self.handle
                    .db()
                    .query("SELECT * FROM exemplars WHERE collection = $collection ORDER BY created_at")
                    .bind(("collection", collection))
                    .await?
            }
        };

        let rows: Vec<ExemplarRow> = response.take(0)?;
        Ok(rows)
    }
}

#[async_trait]
impl VectorIndex for SurrealExemplarIndex {
    #[instrument(skip(self, embedding), fields(collection = %self.collection, top_k))]
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<IndexHit>> {
        // `section` is a real column, every other field is filtered in process.
        let section = filter
            .filter(|f| f.field == "section")
            .map(|f| f.value.as_str());
        let rows = self.load_rows(section).await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata = row.metadata_map();
            if let Some(filter) = filter {
                if !filter.matches(&metadata) {
                    continue;
                }
            }
            // Rows written under a different embedding model are not comparable.
            let distance = match cosine_distance(embedding, &row.embedding) {
                Ok(distance) => distance,
                Err(e) => {
                    warn!(id = %row.exemplar_id, error = %e, "skipping row with mismatched embedding");
                    continue;
                }
            };
            hits.push(IndexHit {
                id: row.exemplar_id,
                document: row.document,
                metadata,
                distance,
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);
        debug!(hits = hits.len(), "exemplar query complete");
        Ok(hits)
    }

    async fn scan_all(&self) -> StoreResult<Vec<Metadata>> {
        let rows = self.load_rows(None).await?;
        Ok(rows.iter().map(ExemplarRow::metadata_map).collect())
    }

    #[instrument(skip(self, record), fields(collection = %self.collection, id = %record.id))]
    async fn upsert(&self, record: IndexRecord) -> StoreResult<()> {
        let row = ExemplarRow::from_record(&self.collection, record);

        self.handle
            .db()
            .query("DELETE exemplars WHERE collection = $collection AND exemplar_id = $id")
            .bind(("collection", self.collection.clone()))
            .bind(("id", row.exemplar_id.clone()))
            .await?
            .check()?;

        let _created: Option<ExemplarRow> =
            self.handle.db().create("exemplars").content(row).await?;
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        let mut response = self
            .handle
            .db()
            .query("SELECT count() AS total FROM exemplars WHERE collection = $collection GROUP ALL")
            .bind(("collection", self.collection.clone()))
            .await?;

        let total: Option<usize> = response.take((0, "total"))?;
        Ok(total.unwrap_or(0))
    }

    async fn clear(&self) -> StoreResult<()> {
        self.handle
            .db()
            .query("DELETE exemplars WHERE collection = $collection")
            .bind(("collection", self.collection.clone()))
            .await?
            .check()?;
        Ok(())
    }
}
