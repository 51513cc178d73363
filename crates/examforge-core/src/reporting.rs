//! Human-readable verdicts and exam artifacts.

use std::path::Path;

use bank_merge::{normalize, BankEntry, NormalizeOptions};

use crate::domain::{ExamEvaluation, Item, ItemSet, Result, EXAM_APPROVAL_RATE};
use crate::feedback_loop::{LoopReport, LoopState};
use crate::text::truncate_chars;

/// Per-item feedback is cut to this many characters in rendered verdicts.
pub const ITEM_FEEDBACK_CHARS: usize = 200;

/// Render an exam verdict: headline numbers, reasons and per-item feedback.
pub fn render_feedback(evaluation: &ExamEvaluation) -> String {
    let mut out = vec![
        format!("Overall Score: {:.1}/10", evaluation.overall_score),
        format!("Approval Rate: {:.1}%", evaluation.approval_rate * 100.0),
        format!(
            "Approved Questions: {}/{}",
            evaluation.approved_count, evaluation.total_items
        ),
        format!("Total Marks: {}", evaluation.total_marks),
        String::new(),
    ];

    if evaluation.exam_approved {
        out.push("✓ Exam is APPROVED and ready for use".to_string());
    } else {
        out.push("✗ Exam needs improvements before use".to_string());
        if evaluation.approval_rate < EXAM_APPROVAL_RATE {
            out.push("  - Too many questions need improvement".to_string());
        }
        if !evaluation.mark_distribution_ok {
            out.push(format!(
                "  - Mark distribution needs adjustment ({} of {} target)",
                evaluation.total_marks, evaluation.target_marks
            ));
        }
    }

    out.push("\nPer-question feedback:".to_string());
    for (i, eval) in evaluation.item_evaluations.iter().enumerate() {
        let status = if eval.approved { "✓" } else { "✗" };
        out.push(format!(
            "\n{status} Question {} (Score: {:.1}/10):",
            i + 1,
            eval.score
        ));
        out.push(format!(
            "  {}...",
            truncate_chars(&eval.feedback, ITEM_FEEDBACK_CHARS)
        ));
    }

    out.join("\n")
}

/// One-line summary of a loop run.
pub fn render_loop_summary(report: &LoopReport) -> String {
    let outcome = match report.state {
        LoopState::Approved => "approved",
        LoopState::Exhausted => "best effort after max iterations",
        LoopState::Failed => "no candidate produced",
        LoopState::Init | LoopState::Iterating => "incomplete",
    };
    match (report.best_iteration, report.best_score()) {
        (Some(iteration), Some(score)) => format!(
            "{outcome}: best candidate from iteration {iteration} of {} (score {score:.1}/10)",
            report.iterations_run
        ),
        _ => format!("{outcome}: {} iteration(s) run", report.iterations_run),
    }
}

/// Write an exam as pretty JSON, replacing any previous file atomically.
pub fn write_exam(path: &Path, exam: &ItemSet) -> Result<()> {
    bank_merge::write_json_atomic(path, exam)?;
    Ok(())
}

/// Bank entries for accepted items. Each item keeps its own quality score.
pub fn to_bank_entries(items: &[Item], options: &NormalizeOptions) -> Result<Vec<BankEntry>> {
    items
        .iter()
        .map(|item| Ok(normalize(item.to_fields(), options)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Evaluation, Item};

    fn evaluation(scores: &[f64], target: u32) -> ExamEvaluation {
        let evals = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let item = Item::new("Functions", 25, format!("q{i}"), Difficulty::Medium);
                Evaluation::new(item, *s, "x".repeat(300))
            })
            .collect();
        ExamEvaluation::aggregate(evals, target)
    }

    #[test]
    fn test_render_approved_exam() {
        let text = render_feedback(&evaluation(&[8.0, 9.0, 7.5, 8.0], 100));
        assert!(text.starts_with("Overall Score: 8.1/10"));
        assert!(text.contains("Approval Rate: 100.0%"));
        assert!(text.contains("Approved Questions: 4/4"));
        assert!(text.contains("APPROVED and ready for use"));
        assert!(text.contains(&format!("  {}...", "x".repeat(200))));
        assert!(!text.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_render_rejection_reasons() {
        let text = render_feedback(&evaluation(&[5.0, 6.0], 100));
        assert!(text.contains("needs improvements"));
        assert!(text.contains("Too many questions need improvement"));
        assert!(text.contains("Mark distribution needs adjustment (50 of 100 target)"));
        assert!(text.contains("✗ Question 2 (Score: 6.0/10):"));
    }

    #[test]
    fn test_bank_entries_strip_exam_fields() {
        let items = vec![Item::new("Functions", 10, "Write f.", Difficulty::Hard)
            .with_number(3)
            .scored(8.5, true)];
        let options = NormalizeOptions {
            difficulty: "hard".to_string(),
            quality_score: None,
            generated_date: "2026-10-18".to_string(),
            marks_agnostic: true,
        };

        let entries = to_bank_entries(&items, &options).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quality_score, Some(8.5));
        assert_eq!(entries[0].marks, None);
        assert_eq!(entries[0].generated_date.as_deref(), Some("2026-10-18"));
        assert!(!entries[0].extra.contains_key("question_number"));
        assert!(!entries[0].extra.contains_key("approved"));
    }

    #[test]
    fn test_write_exam_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/exam.json");
        let exam = ItemSet::new(
            crate::domain::ExamMetadata::generated("APSC 142"),
            vec![Item::new("Functions", 10, "Write f.", Difficulty::Easy).with_number(1)],
        );

        write_exam(&path, &exam).unwrap();
        let back: ItemSet = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, exam);
    }
}
