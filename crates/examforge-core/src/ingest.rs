//! Building and extending the exemplar index.
//!
//! Historical exams are (re)ingested wholesale; generated bank entries are
//! appended so later runs can use them as style references.

use std::path::Path;

use bank_merge::BankEntry;
use chrono::NaiveDate;
use exemplar_store::{Embedder, IndexRecord, Metadata, VectorIndex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::{ExamForgeError, Result, SourceExam, DEFAULT_COURSE};
use crate::obs::emit_index_updated;
use crate::relevance::RelevanceScorer;
use crate::retriever::DEFAULT_CALL_TIMEOUT;
use crate::text::truncate_chars;

/// Characters of item text kept in index metadata.
pub const METADATA_TEXT_CHARS: usize = 200;
/// Relevance assigned to generated items.
pub const GENERATED_RELEVANCE: f64 = 0.5;
pub const GENERATED_DEFAULT_QUALITY: f64 = 7.0;

/// Counts from one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub considered: usize,
    pub added: usize,
    pub skipped: usize,
    /// Index size after the pass.
    pub total: usize,
}

/// Load historical exams. Exams that do not parse are skipped with a warning.
pub fn load_source_exams(path: &Path) -> Result<Vec<SourceExam>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ExamForgeError::Persistence(format!("read {}: {e}", path.display())))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| ExamForgeError::Persistence(format!("parse {}: {e}", path.display())))?;

    let Value::Array(items) = value else {
        return Err(ExamForgeError::Persistence(format!(
            "{}: expected an array of exams",
            path.display()
        )));
    };

    let mut exams = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<SourceExam>(item) {
            Ok(exam) => exams.push(exam),
            Err(e) => warn!(exam = idx, error = %e, "skipping malformed exam"),
        }
    }
    Ok(exams)
}

/// Text that gets embedded for one question.
pub fn embedding_text(
    section: &str,
    text: &str,
    description: Option<&str>,
    choices: Option<&[String]>,
) -> String {
    let mut parts = vec![format!("Section: {section}"), format!("Question: {text}")];
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        parts.push(format!("Description: {description}"));
    }
    if let Some(choices) = choices.filter(|c| !c.is_empty()) {
        parts.push(format!("Choices: {}", choices.join(" ")));
    }
    parts.join(" | ")
}

async fn embed(embedder: &dyn Embedder, text: &str) -> Option<Vec<f32>> {
    match tokio::time::timeout(DEFAULT_CALL_TIMEOUT, embedder.embed(text)).await {
        Ok(Ok(vector)) if !vector.is_empty() => Some(vector),
        Ok(Ok(_)) => {
            warn!("embedding service returned an empty vector");
            None
        }
        Ok(Err(e)) => {
            warn!(error = %e, "embedding failed");
            None
        }
        Err(_) => {
            warn!("embedding timed out");
            None
        }
    }
}

fn string_metadata(pairs: Vec<(&str, String)>) -> Metadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect()
}

/// Replace the index contents with every question of `exams`.
#[instrument(skip_all, fields(exams = exams.len()))]
pub async fn ingest_question_bank(
    exams: &[SourceExam],
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    now: NaiveDate,
) -> Result<IngestReport> {
    index.clear().await?;
    let scorer = RelevanceScorer::new(now);
    let mut report = IngestReport::default();

    for (exam_idx, exam) in exams.iter().enumerate() {
        let exam_total = exam.total_marks();
        debug!(exam = exam_idx, date = %exam.exam_metadata.date, "ingesting exam");

        for (q_idx, question) in exam.questions.iter().enumerate() {
            report.considered += 1;
            let document = embedding_text(
                &question.section,
                &question.text,
                question.content_description.as_deref(),
                question.answer_choices.as_deref(),
            );
            let Some(embedding) = embed(embedder, &document).await else {
                warn!(exam = exam_idx, question = q_idx + 1, "skipping question without embedding");
                report.skipped += 1;
                continue;
            };

            let relevance = scorer.score(question.marks, exam_total, &exam.exam_metadata.date);
            let metadata = string_metadata(vec![
                ("exam_date", exam.exam_metadata.date.clone()),
                ("course", exam.exam_metadata.course.clone()),
                ("section", question.section.clone()),
                ("marks", question.marks.to_string()),
                ("exam_total_marks", exam_total.to_string()),
                ("relevance_score", relevance.to_string()),
                ("question_number", question.question_number.clone()),
                ("text", truncate_chars(&question.text, METADATA_TEXT_CHARS).to_string()),
            ]);

            let record = IndexRecord::new(
                format!("exam_{exam_idx}_q_{q_idx}"),
                embedding,
                document,
                metadata,
            );
            match index.upsert(record).await {
                Ok(()) => report.added += 1,
                Err(e) => {
                    warn!(exam = exam_idx, question = q_idx + 1, error = %e, "index upsert failed");
                    report.skipped += 1;
                }
            }
        }
    }

    report.total = index.count().await?;
    info!(added = report.added, skipped = report.skipped, "question bank ingested");
    emit_index_updated(report.added, report.skipped, report.total);
    Ok(report)
}

/// Append generated bank entries to the index.
///
/// Only entries carrying a generation date or quality score are considered;
/// entries missing text or section are skipped.
#[instrument(skip_all, fields(entries = entries.len()))]
pub async fn add_generated_to_index(
    entries: &[BankEntry],
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    today: NaiveDate,
) -> Result<IngestReport> {
    let generated: Vec<&BankEntry> = entries.iter().filter(|e| e.is_generated()).collect();
    let offset = index.count().await?;
    let today = today.format("%Y-%m-%d").to_string();
    let mut report = IngestReport::default();

    for (idx, entry) in generated.iter().enumerate() {
        report.considered += 1;
        if !entry.is_complete() {
            warn!(entry = idx + 1, "skipping entry without text or section");
            report.skipped += 1;
            continue;
        }

        let document = embedding_text(
            &entry.section,
            &entry.text,
            entry.content_description.as_deref(),
            entry.answer_choices.as_deref(),
        );
        let Some(embedding) = embed(embedder, &document).await else {
            report.skipped += 1;
            continue;
        };

        let generated_date = entry
            .generated_date
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| today.clone());
        let id = format!("generated_{generated_date}_{idx}_{}", offset + report.added);
        let metadata = string_metadata(vec![
            ("exam_date", generated_date),
            ("course", DEFAULT_COURSE.to_string()),
            ("section", entry.section.clone()),
            ("marks", entry.marks.unwrap_or(0).to_string()),
            ("exam_total_marks", "0".to_string()),
            ("relevance_score", GENERATED_RELEVANCE.to_string()),
            ("question_number", (idx + 1).to_string()),
            ("text", truncate_chars(&entry.text, METADATA_TEXT_CHARS).to_string()),
            (
                "difficulty",
                entry.difficulty.clone().unwrap_or_else(|| "medium".to_string()),
            ),
            (
                "quality_score",
                entry
                    .quality_score
                    .unwrap_or(GENERATED_DEFAULT_QUALITY)
                    .to_string(),
            ),
            ("is_generated", "true".to_string()),
        ]);

        match index
            .upsert(IndexRecord::new(id, embedding, document, metadata))
            .await
        {
            Ok(()) => report.added += 1,
            Err(e) => {
                warn!(entry = idx + 1, error = %e, "index upsert failed");
                report.skipped += 1;
            }
        }
    }

    report.total = index.count().await?;
    info!(added = report.added, total = report.total, "generated items indexed");
    emit_index_updated(report.added, report.skipped, report.total);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_optional_parts() {
        assert_eq!(
            embedding_text("Functions", "Write f.", None, None),
            "Section: Functions | Question: Write f."
        );
        let choices = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            embedding_text("Functions", "Pick one.", Some("about f"), Some(&choices)),
            "Section: Functions | Question: Pick one. | Description: about f | Choices: a b"
        );
        assert_eq!(
            embedding_text("Functions", "Write f.", Some(""), Some(&[])),
            "Section: Functions | Question: Write f."
        );
    }
}
