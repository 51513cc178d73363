//! Exemplar records surfaced by the retriever.

use exemplar_store::{metadata_f64, metadata_str, metadata_u32, IndexHit};
use serde::{Deserialize, Serialize};

/// A stored item returned as a style reference.
///
/// Transient copy of index contents; the index owns the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemplarRecord {
    pub id: String,
    pub text: String,
    pub section: String,
    pub marks: u32,
    pub relevance_score: f64,
    pub exam_date: String,
    pub course: String,
    pub question_number: String,
    pub document: String,
    pub distance: Option<f32>,
}

impl ExemplarRecord {
    /// Build a record from an index hit, tolerating missing or
    /// string-encoded metadata fields.
    pub fn from_hit(hit: IndexHit) -> Self {
        let meta = &hit.metadata;
        let text_of = |key: &str| metadata_str(meta, key).unwrap_or_default().to_string();
        Self {
            text: text_of("text"),
            section: text_of("section"),
            marks: metadata_u32(meta, "marks").unwrap_or(0),
            relevance_score: metadata_f64(meta, "relevance_score").unwrap_or(0.0),
            exam_date: text_of("exam_date"),
            course: text_of("course"),
            question_number: text_of("question_number"),
            distance: Some(hit.distance),
            document: hit.document,
            id: hit.id,
        }
    }
}

/// Population of one section in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCount {
    pub section: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_hit_reads_string_metadata() {
        let metadata = match json!({
            "section": "Functions",
            "marks": "12",
            "relevance_score": "0.73",
            "exam_date": "April 20, 2013",
            "text": "Write a function."
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let record = ExemplarRecord::from_hit(IndexHit {
            id: "exam_0_q_1".to_string(),
            document: "Section: Functions | Question: Write a function.".to_string(),
            metadata,
            distance: 0.25,
        });

        assert_eq!(record.marks, 12);
        assert!((record.relevance_score - 0.73).abs() < 1e-9);
        assert_eq!(record.section, "Functions");
        assert_eq!(record.course, "");
        assert_eq!(record.distance, Some(0.25));
    }
}
