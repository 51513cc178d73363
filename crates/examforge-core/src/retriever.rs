//! Exemplar retrieval.
//!
//! Two modes:
//! - section-scoped: one filtered query, ranked by stored relevance
//! - diversity-seeking: one section-scoped query per populous section, so a
//!   dominant section cannot crowd the others out of the exemplar set
//!
//! Retrieval never fails outward. Embedding or index failures degrade to an
//! empty result for the affected query.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use exemplar_store::{metadata_str, Embedder, MetadataFilter, VectorIndex};
use tracing::{debug, instrument, warn};

use crate::domain::{Difficulty, ExamForgeError, ExemplarRecord, Result, SectionCount};

/// Sections consulted by diversity-seeking retrieval.
pub const MAX_DIVERSE_SECTIONS: usize = 8;
/// Cap on the divisor used for the per-section quota.
pub const QUOTA_DIVISOR_CAP: usize = 5;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Query text for a section at a difficulty.
pub fn section_query(section: &str, difficulty: Difficulty) -> String {
    format!("Section: {section} | {}", difficulty.query_descriptor())
}

/// Items requested from each section in diversity mode.
pub fn diversity_quota(count: usize, sections_available: usize) -> usize {
    let divisor = QUOTA_DIVISOR_CAP.min(sections_available).max(1);
    (count / divisor).max(1)
}

/// Stable sort by relevance (highest first), then keep `count`.
pub fn rank_by_relevance(records: &mut Vec<ExemplarRecord>, count: usize) {
    records.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    records.truncate(count);
}

/// Retrieves style exemplars from the vector index.
#[derive(Clone)]
pub struct ExemplarRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    call_timeout: Duration,
}

impl ExemplarRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build a retriever over a populated index.
    ///
    /// Fails with `Configuration` when the index is unreachable or empty;
    /// callers continue without exemplars in that case.
    pub async fn connect(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Result<Self> {
        let count = index
            .count()
            .await
            .map_err(|e| ExamForgeError::Configuration(format!("exemplar index unavailable: {e}")))?;
        if count == 0 {
            return Err(ExamForgeError::Configuration(
                "exemplar index is empty; run `examforge ingest` first".to_string(),
            ));
        }
        debug!(records = count, "exemplar index connected");
        Ok(Self::new(embedder, index))
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Nearest neighbours of `query`, optionally restricted to one section,
    /// dropping records below `min_relevance`.
    #[instrument(skip(self, query, section_filter), fields(section = section_filter.unwrap_or("*")))]
    pub async fn retrieve_by_query(
        &self,
        query: &str,
        n: usize,
        section_filter: Option<&str>,
        min_relevance: f64,
    ) -> Vec<ExemplarRecord> {
        if n == 0 {
            return Vec::new();
        }

        let embedding = match tokio::time::timeout(self.call_timeout, self.embedder.embed(query)).await {
            Ok(Ok(vector)) if !vector.is_empty() => vector,
            Ok(Ok(_)) => {
                warn!("embedding service returned an empty vector");
                return Vec::new();
            }
            Ok(Err(e)) => {
                warn!(error = %e, "query embedding failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout_ms = self.call_timeout.as_millis() as u64, "query embedding timed out");
                return Vec::new();
            }
        };

        let filter = section_filter.map(MetadataFilter::section);
        let hits = match tokio::time::timeout(
            self.call_timeout,
            self.index.query(&embedding, n, filter.as_ref()),
        )
        .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(error = %e, "exemplar index query failed");
                return Vec::new();
            }
            Err(_) => {
                warn!("exemplar index query timed out");
                return Vec::new();
            }
        };

        hits.into_iter()
            .map(ExemplarRecord::from_hit)
            .filter(|r| r.relevance_score >= min_relevance)
            .collect()
    }

    /// Best `count` exemplars from one section.
    pub async fn retrieve_for_section(
        &self,
        section: &str,
        count: usize,
        difficulty: Difficulty,
    ) -> Vec<ExemplarRecord> {
        let query = section_query(section, difficulty);
        let mut records = self
            .retrieve_by_query(&query, count.saturating_mul(2), Some(section), 0.0)
            .await;
        rank_by_relevance(&mut records, count);
        records
    }

    /// Section populations, most populous first (ties by name).
    pub async fn section_statistics(&self) -> Vec<SectionCount> {
        let all = match self.index.scan_all().await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "section statistics scan failed");
                return Vec::new();
            }
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for metadata in &all {
            let section = metadata_str(metadata, "section").unwrap_or("Unknown");
            *counts.entry(section.to_string()).or_insert(0) += 1;
        }

        let mut stats: Vec<SectionCount> = counts
            .into_iter()
            .map(|(section, count)| SectionCount { section, count })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.section.cmp(&b.section)));
        stats
    }

    /// Exemplars spread over the most populous sections.
    #[instrument(skip(self))]
    pub async fn retrieve_diverse(&self, difficulty: Difficulty, count: usize) -> Vec<ExemplarRecord> {
        if count == 0 {
            return Vec::new();
        }
        let stats = self.section_statistics().await;
        if stats.is_empty() {
            return Vec::new();
        }

        let quota = diversity_quota(count, stats.len());
        let mut pooled = Vec::new();
        for stat in stats.iter().take(MAX_DIVERSE_SECTIONS) {
            let records = self.retrieve_for_section(&stat.section, quota, difficulty).await;
            pooled.extend(records);
        }

        rank_by_relevance(&mut pooled, count);
        debug!(
            sections = stats.len().min(MAX_DIVERSE_SECTIONS),
            quota,
            returned = pooled.len(),
            "diverse retrieval complete"
        );
        pooled
    }

    /// Style exemplars for a run: section-scoped when a hint is given,
    /// diversity-seeking otherwise.
    pub async fn retrieve_style_examples(
        &self,
        difficulty: Difficulty,
        count: usize,
        section_hint: Option<&str>,
    ) -> Vec<ExemplarRecord> {
        match section_hint {
            Some(section) => self.retrieve_for_section(section, count, difficulty).await,
            None => self.retrieve_diverse(difficulty, count).await,
        }
    }
}
