//! Item and exam evaluations.

use serde::{Deserialize, Serialize};

use super::item::Item;

/// Score at or above which an item is approved (0-10 scale).
pub const APPROVAL_THRESHOLD: f64 = 7.0;
/// Fraction of approved items an exam needs.
pub const EXAM_APPROVAL_RATE: f64 = 0.7;
/// Allowed distance between an exam's total marks and the target.
pub const MARK_TOLERANCE: u32 = 10;

/// Verdict on one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
    pub approved: bool,
    pub item: Item,
}

impl Evaluation {
    pub fn new(item: Item, score: f64, feedback: impl Into<String>) -> Self {
        Self {
            approved: score >= APPROVAL_THRESHOLD,
            score,
            feedback: feedback.into(),
            item,
        }
    }

    /// Approved and at least `minimum`. Lets callers be stricter than the gate.
    pub fn passes(&self, minimum: f64) -> bool {
        self.approved && self.score >= minimum
    }
}

/// Aggregate verdict on a whole item set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamEvaluation {
    pub overall_score: f64,
    pub approval_rate: f64,
    pub approved_count: usize,
    pub total_items: usize,
    pub total_marks: u32,
    pub target_marks: u32,
    pub mark_distribution_ok: bool,
    pub exam_approved: bool,
    pub item_evaluations: Vec<Evaluation>,
}

impl ExamEvaluation {
    /// Aggregate per-item evaluations (in item order) against a mark target.
    pub fn aggregate(item_evaluations: Vec<Evaluation>, target_marks: u32) -> Self {
        let total_items = item_evaluations.len();
        let approved_count = item_evaluations.iter().filter(|e| e.approved).count();
        let total_marks: u32 = item_evaluations.iter().map(|e| e.item.marks).sum();

        let (overall_score, approval_rate) = if total_items == 0 {
            (0.0, 0.0)
        } else {
            let sum: f64 = item_evaluations.iter().map(|e| e.score).sum();
            (
                sum / total_items as f64,
                approved_count as f64 / total_items as f64,
            )
        };

        let mark_distribution_ok = total_marks.abs_diff(target_marks) <= MARK_TOLERANCE;

        Self {
            overall_score,
            approval_rate,
            approved_count,
            total_items,
            total_marks,
            target_marks,
            mark_distribution_ok,
            exam_approved: approval_rate >= EXAM_APPROVAL_RATE && mark_distribution_ok,
            item_evaluations,
        }
    }

    /// Items that clear the gate and `minimum`, carrying their scores.
    pub fn accepted_items(&self, minimum: f64) -> Vec<Item> {
        self.item_evaluations
            .iter()
            .filter(|e| e.passes(minimum))
            .map(|e| e.item.scored(e.score, e.approved))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn eval(marks: u32, score: f64) -> Evaluation {
        Evaluation::new(
            Item::new("Functions", marks, "q", Difficulty::Medium),
            score,
            "feedback",
        )
    }

    #[test]
    fn test_approval_threshold_inclusive() {
        assert!(eval(10, 7.0).approved);
        assert!(!eval(10, 6.99).approved);
    }

    #[test]
    fn test_aggregate_approved_exam() {
        let evals = vec![eval(25, 8.0), eval(25, 7.0), eval(25, 9.0), eval(25, 6.0)];
        let exam = ExamEvaluation::aggregate(evals, 100);
        assert!((exam.overall_score - 7.5).abs() < 1e-9);
        assert!((exam.approval_rate - 0.75).abs() < 1e-9);
        assert_eq!(exam.approved_count, 3);
        assert!(exam.mark_distribution_ok);
        assert!(exam.exam_approved);
    }

    #[test]
    fn test_mark_distribution_tolerance() {
        let exam = ExamEvaluation::aggregate(vec![eval(89, 9.0)], 100);
        assert!(!exam.mark_distribution_ok);
        assert!(!exam.exam_approved);

        let exam = ExamEvaluation::aggregate(vec![eval(110, 9.0)], 100);
        assert!(exam.mark_distribution_ok);
        assert!(exam.exam_approved);
    }

    #[test]
    fn test_aggregate_empty() {
        let exam = ExamEvaluation::aggregate(vec![], 100);
        assert_eq!(exam.overall_score, 0.0);
        assert_eq!(exam.approval_rate, 0.0);
        assert!(!exam.exam_approved);
    }

    #[test]
    fn test_accepted_items_respect_minimum() {
        let exam = ExamEvaluation::aggregate(vec![eval(50, 7.5), eval(50, 9.0), eval(0, 4.0)], 100);
        assert_eq!(exam.accepted_items(7.0).len(), 2);
        let strict = exam.accepted_items(8.0);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].quality_score, Some(9.0));
    }
}
