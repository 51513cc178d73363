//! Exemplar retrieval over the in-memory index.

use std::collections::HashSet;
use std::sync::Arc;

use examforge_core::domain::{Difficulty, ExamForgeError};
use examforge_core::retriever::ExemplarRetriever;
use exemplar_store::fakes::{FailingEmbedder, FailingIndex, HashEmbedder, MemoryVectorIndex};
use exemplar_store::{Embedder, IndexRecord, Metadata, VectorIndex};
use serde_json::Value;

fn metadata(section: &str, relevance: f64, text: &str) -> Metadata {
    [
        ("section", section.to_string()),
        ("marks", "10".to_string()),
        ("relevance_score", relevance.to_string()),
        ("exam_date", "April 20, 2013".to_string()),
        ("text", text.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Value::String(v)))
    .collect()
}

async fn seed(index: &MemoryVectorIndex, embedder: &HashEmbedder, section: &str, relevances: &[f64]) {
    for (i, relevance) in relevances.iter().enumerate() {
        let text = format!("{section} question {i} about loops and values");
        let document = format!("Section: {section} | Question: {text}");
        let embedding = embedder.embed(&document).await.unwrap();
        let record = IndexRecord::new(
            format!("{section}-{i}"),
            embedding,
            document,
            metadata(section, *relevance, &text),
        );
        index.upsert(record).await.unwrap();
    }
}

fn retriever(embedder: Arc<HashEmbedder>, index: Arc<MemoryVectorIndex>) -> ExemplarRetriever {
    ExemplarRetriever::new(embedder, index)
}

fn sections_of(records: &[examforge_core::ExemplarRecord]) -> HashSet<String> {
    records.iter().map(|r| r.section.clone()).collect()
}

#[tokio::test]
async fn test_diverse_retrieval_spans_sections() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.9, 0.8, 0.7]).await;
    seed(&index, &embedder, "1D Arrays", &[0.3, 0.2, 0.1]).await;
    seed(&index, &embedder, "Robot Programming", &[0.5, 0.4, 0.6]).await;

    let records = retriever(embedder, index)
        .retrieve_diverse(Difficulty::Medium, 6)
        .await;

    assert_eq!(records.len(), 6);
    assert_eq!(sections_of(&records).len(), 3);
    // Ranked by stored relevance, highest first.
    assert!(records
        .windows(2)
        .all(|w| w[0].relevance_score >= w[1].relevance_score));
}

#[tokio::test]
async fn test_dominant_section_cannot_crowd_out_others() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Program Comprehension", &[0.95; 20]).await;
    seed(&index, &embedder, "Functions", &[0.2, 0.2]).await;
    seed(&index, &embedder, "2D Arrays", &[0.1, 0.1]).await;

    let records = retriever(embedder, index)
        .retrieve_diverse(Difficulty::Hard, 6)
        .await;

    assert_eq!(sections_of(&records).len(), 3);
    let dominant = records
        .iter()
        .filter(|r| r.section == "Program Comprehension")
        .count();
    assert_eq!(dominant, 2);
}

#[tokio::test]
async fn test_four_sections_quota_divides_by_four() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    for section in ["A", "B", "C", "D"] {
        seed(&index, &embedder, section, &[0.5, 0.4, 0.3]).await;
    }

    let records = retriever(embedder, index)
        .retrieve_diverse(Difficulty::Medium, 8)
        .await;

    assert_eq!(records.len(), 8);
    assert_eq!(sections_of(&records).len(), 4);
}

#[tokio::test]
async fn test_five_sections_quota_divides_by_five() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    for section in ["A", "B", "C", "D", "E"] {
        seed(&index, &embedder, section, &[0.5, 0.4, 0.3]).await;
    }

    let records = retriever(embedder, index)
        .retrieve_diverse(Difficulty::Medium, 8)
        .await;

    // 8 / 5 = 1 per section.
    assert_eq!(records.len(), 5);
    assert_eq!(sections_of(&records).len(), 5);
}

#[tokio::test]
async fn test_section_scoped_retrieval_filters_and_ranks() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.2, 0.9, 0.5, 0.7]).await;
    seed(&index, &embedder, "Algorithms", &[1.0, 1.0]).await;

    let records = retriever(embedder, index.clone())
        .retrieve_style_examples(Difficulty::Easy, 2, Some("Functions"))
        .await;

    assert!(records.iter().all(|r| r.section == "Functions"));
    let scores: Vec<f64> = records.iter().map(|r| r.relevance_score).collect();
    assert_eq!(scores, vec![0.9, 0.7]);
    assert_eq!(index.query_count(), 1);
}

#[tokio::test]
async fn test_min_relevance_drops_low_records() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.2, 0.9, 0.5]).await;

    let records = retriever(embedder, index)
        .retrieve_by_query("Section: Functions", 10, None, 0.5)
        .await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.relevance_score >= 0.5));
}

#[tokio::test]
async fn test_section_statistics_ordering() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.1, 0.1]).await;
    seed(&index, &embedder, "Algorithms", &[0.1, 0.1]).await;
    seed(&index, &embedder, "2D Arrays", &[0.1, 0.1, 0.1]).await;

    let stats = retriever(embedder, index).section_statistics().await;
    let order: Vec<(&str, usize)> = stats.iter().map(|s| (s.section.as_str(), s.count)).collect();
    assert_eq!(
        order,
        vec![("2D Arrays", 3), ("Algorithms", 2), ("Functions", 2)]
    );
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_empty() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.5, 0.5]).await;

    let retriever = ExemplarRetriever::new(Arc::new(FailingEmbedder), index);
    assert!(retriever
        .retrieve_diverse(Difficulty::Medium, 5)
        .await
        .is_empty());
    assert!(retriever
        .retrieve_for_section("Functions", 3, Difficulty::Medium)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_index_failure_degrades_to_empty() {
    let retriever = ExemplarRetriever::new(Arc::new(HashEmbedder::default()), Arc::new(FailingIndex));

    assert!(retriever
        .retrieve_for_section("Functions", 3, Difficulty::Medium)
        .await
        .is_empty());
    assert!(retriever
        .retrieve_by_query("Section: Functions | programming question", 5, None, 0.0)
        .await
        .is_empty());
    assert!(retriever
        .retrieve_diverse(Difficulty::Hard, 6)
        .await
        .is_empty());
    assert!(retriever
        .retrieve_style_examples(Difficulty::Easy, 4, None)
        .await
        .is_empty());
    assert!(retriever.section_statistics().await.is_empty());
}

#[tokio::test]
async fn test_connect_reports_unreachable_index() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index: Arc<dyn VectorIndex> = Arc::new(FailingIndex);

    let err = ExemplarRetriever::connect(embedder, index)
        .await
        .err()
        .expect("unreachable index must be rejected");
    assert!(matches!(err, ExamForgeError::Configuration(_)));
}

#[tokio::test]
async fn test_connect_rejects_empty_index() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new());

    let err = ExemplarRetriever::connect(embedder, index)
        .await
        .err()
        .expect("empty index must be rejected");
    assert!(matches!(err, ExamForgeError::Configuration(_)));
}

#[tokio::test]
async fn test_zero_count_makes_no_queries() {
    let embedder = Arc::new(HashEmbedder::default());
    let index = Arc::new(MemoryVectorIndex::new());
    seed(&index, &embedder, "Functions", &[0.5]).await;

    let records = retriever(embedder.clone(), index.clone())
        .retrieve_diverse(Difficulty::Medium, 0)
        .await;
    assert!(records.is_empty());
    assert_eq!(index.query_count(), 0);
}
