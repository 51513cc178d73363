//! Bank entry schema and normalization of freshly accepted items

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::BankResult;

/// Fields that only make sense inside one generated exam.
const EXAM_ONLY_FIELDS: &[&str] = &["question_number", "questionNumber", "approved"];

/// One question stored in a bank file.
///
/// Unknown fields are carried through untouched so a bank written by another
/// tool survives a read/merge/write cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankEntry {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "marksValue", skip_serializing_if = "Option::is_none")]
    pub marks: Option<u32>,
    #[serde(default, alias = "difficultyTag", skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, alias = "qualityScore", skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, alias = "generatedDate", skip_serializing_if = "Option::is_none")]
    pub generated_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_choices: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BankEntry {
    pub fn new(section: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_marks(mut self, marks: u32) -> Self {
        self.marks = Some(marks);
        self
    }

    /// Whether this entry was produced by the generator rather than ingested
    /// from a past exam.
    pub fn is_generated(&self) -> bool {
        self.generated_date.as_deref().is_some_and(|d| !d.is_empty())
            || self.quality_score.is_some_and(|q| q != 0.0)
    }

    /// Entries without text or section cannot be indexed or reused.
    pub fn is_complete(&self) -> bool {
        !self.text.trim().is_empty() && !self.section.trim().is_empty()
    }
}

/// Stamp applied to every newly accepted item before it joins the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub difficulty: String,
    pub quality_score: Option<f64>,
    /// `YYYY-MM-DD`
    pub generated_date: String,
    /// Drop marks; the bank stores items independent of any exam's marking.
    pub marks_agnostic: bool,
}

impl NormalizeOptions {
    /// Options dated today (local time).
    pub fn today(difficulty: impl Into<String>) -> Self {
        Self {
            difficulty: difficulty.into(),
            quality_score: None,
            generated_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            marks_agnostic: false,
        }
    }

    pub fn with_quality_score(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn marks_agnostic(mut self, agnostic: bool) -> Self {
        self.marks_agnostic = agnostic;
        self
    }
}

/// Turn the serialized fields of an accepted exam item into a bank entry.
///
/// Exam-only fields are stripped, the difficulty/quality/date stamp is
/// attached, and marks are dropped when the bank is marks-agnostic.
pub fn normalize(mut fields: Map<String, Value>, options: &NormalizeOptions) -> BankResult<BankEntry> {
    for field in EXAM_ONLY_FIELDS {
        fields.remove(*field);
    }

    let mut entry: BankEntry = serde_json::from_value(Value::Object(fields))?;
    entry.difficulty = Some(options.difficulty.clone());
    if options.quality_score.is_some() {
        entry.quality_score = options.quality_score;
    }
    entry.generated_date = Some(options.generated_date.clone());
    if options.marks_agnostic {
        entry.marks = None;
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> NormalizeOptions {
        NormalizeOptions {
            difficulty: "hard".to_string(),
            quality_score: Some(8.5),
            generated_date: "2026-01-15".to_string(),
            marks_agnostic: false,
        }
    }

    fn item_fields() -> Map<String, Value> {
        let value = json!({
            "question_number": "3",
            "section": "Functions",
            "marks": 12,
            "text": "Write a function that reverses an array.",
            "approved": true
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_strips_exam_fields_and_stamps() {
        let entry = normalize(item_fields(), &options()).unwrap();
        assert_eq!(entry.section, "Functions");
        assert_eq!(entry.marks, Some(12));
        assert_eq!(entry.difficulty.as_deref(), Some("hard"));
        assert_eq!(entry.quality_score, Some(8.5));
        assert_eq!(entry.generated_date.as_deref(), Some("2026-01-15"));
        assert!(entry.extra.is_empty());

        let written = serde_json::to_value(&entry).unwrap();
        assert!(written.get("question_number").is_none());
        assert!(written.get("approved").is_none());
    }

    #[test]
    fn test_normalize_marks_agnostic_drops_marks() {
        let entry = normalize(item_fields(), &options().marks_agnostic(true)).unwrap();
        assert_eq!(entry.marks, None);
        let written = serde_json::to_value(&entry).unwrap();
        assert!(written.get("marks").is_none());
    }

    #[test]
    fn test_aliases_and_passthrough_fields() {
        let entry: BankEntry = serde_json::from_value(json!({
            "section": "2D Arrays",
            "text": "Sum each row.",
            "marksValue": 6,
            "difficultyTag": "easy",
            "qualityScore": 7.5,
            "generatedDate": "2025-11-02",
            "source_ids": ["a1"]
        }))
        .unwrap();

        assert_eq!(entry.marks, Some(6));
        assert_eq!(entry.difficulty.as_deref(), Some("easy"));
        assert_eq!(entry.quality_score, Some(7.5));
        assert!(entry.is_generated());
        assert_eq!(entry.extra.get("source_ids"), Some(&json!(["a1"])));
    }

    #[test]
    fn test_is_generated_and_complete() {
        let ingested = BankEntry::new("Algorithms", "Trace the loop.");
        assert!(!ingested.is_generated());
        assert!(ingested.is_complete());
        assert!(!BankEntry::new("", "text").is_complete());
    }
}
