//! Quality gate: scores candidate items through the generation service.
//!
//! The critique is free text. A numeric score is pulled out of it by an
//! ordered list of patterns; the first pattern producing a value in [0,10]
//! wins. Evaluation never fails outward: service errors and timeouts produce
//! a conservative rejected verdict instead.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use llm_gateway::{CompletionRequest, GenerationService};
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::domain::{Evaluation, ExamEvaluation, ExemplarRecord, Item, ItemSet, APPROVAL_THRESHOLD};
use crate::feedback_loop::ExamJudge;
use crate::text::truncate_chars;

/// Score used when the critique carries no recognizable score.
pub const DEFAULT_SCORE: f64 = 7.0;
/// Score recorded when the critique could not be obtained.
pub const ERROR_SCORE: f64 = 5.0;

pub const CRITIC_TEMPERATURE: f32 = 0.3;
pub const CRITIC_MAX_TOKENS: u32 = 400;
pub const MAX_REFERENCES: usize = 2;
pub const REFERENCE_PREVIEW_CHARS: usize = 200;

const NUMBER: &str = r"(\d+(?:\.\d+)?)";

/// One named score extraction rule.
#[derive(Debug)]
pub struct ScorePattern {
    pub name: &'static str,
    regex: Regex,
}

impl ScorePattern {
    fn new(name: &'static str, pattern: &str) -> Option<Self> {
        Regex::new(pattern).ok().map(|regex| Self { name, regex })
    }

    /// First match whose value lies in [0,10].
    pub fn extract(&self, text: &str) -> Option<f64> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
            .find(|score| (0.0..=10.0).contains(score))
    }
}

/// Score patterns in priority order.
pub fn score_patterns() -> &'static [ScorePattern] {
    static PATTERNS: OnceLock<Vec<ScorePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                "labelled_fraction",
                format!(r"(?i)(?:score|quality|rating)[:\s]+{NUMBER}\s*(?:/|out of)\s*10"),
            ),
            ("out_of", format!(r"(?i){NUMBER}\s*out of\s*10")),
            ("bare_fraction", format!(r"{NUMBER}\s*/\s*10")),
            (
                "labelled_value",
                format!(r"(?i)(?:overall|quality|score)[:\s]+{NUMBER}"),
            ),
        ]
        .into_iter()
        .filter_map(|(name, pattern)| ScorePattern::new(name, &pattern))
        .collect()
    })
}

/// Score from a critique, if any pattern recognizes one.
pub fn parse_score(text: &str) -> Option<f64> {
    score_patterns().iter().find_map(|p| p.extract(text))
}

/// Score from a critique, defaulting to [`DEFAULT_SCORE`].
pub fn score_from_feedback(text: &str) -> f64 {
    parse_score(text).unwrap_or(DEFAULT_SCORE)
}

const CRITIC_SYSTEM_PROMPT: &str = "You are an expert at evaluating programming exam questions.
Evaluate questions based on:
1. Clarity and understandability
2. Appropriateness for first-year engineering students
3. Alignment with APSC 142 course content
4. Specificity and testability
5. Style consistency with reference examples";

/// Completion request asking for a critique of `item`.
pub fn critique_request(item: &Item, references: &[ExemplarRecord]) -> CompletionRequest {
    let mut lines = vec![
        "Evaluate this exam question:".to_string(),
        format!("Section: {}", item.section),
        format!("Text: {}", item.text),
        String::new(),
        "Provide:".to_string(),
        "1. Overall quality score (0-10)".to_string(),
        "2. Specific feedback on what works well".to_string(),
        "3. Specific suggestions for improvement".to_string(),
        "4. Whether the question is appropriate for first-year engineering students".to_string(),
    ];

    if !references.is_empty() {
        lines.push("\nReference questions for style comparison:".to_string());
        for (i, reference) in references.iter().take(MAX_REFERENCES).enumerate() {
            lines.push(format!("\nReference {}:", i + 1));
            lines.push(format!(
                "  {}",
                truncate_chars(&reference.text, REFERENCE_PREVIEW_CHARS)
            ));
        }
    }

    CompletionRequest::new(
        CRITIC_SYSTEM_PROMPT,
        lines.join("\n"),
        CRITIC_TEMPERATURE,
        CRITIC_MAX_TOKENS,
    )
}

/// Scores items and exams.
#[derive(Clone)]
pub struct QualityGate {
    service: Arc<dyn GenerationService>,
    call_timeout: Duration,
    minimum: f64,
}

impl QualityGate {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            call_timeout: Duration::from_secs(60),
            minimum: APPROVAL_THRESHOLD,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Stricter acceptance floor for callers. Never loosens the gate's own
    /// approval threshold.
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = minimum.max(APPROVAL_THRESHOLD);
        self
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Evaluate one item. Never errors.
    #[instrument(skip(self, item, references), fields(section = %item.section))]
    pub async fn evaluate(&self, item: &Item, references: &[ExemplarRecord]) -> Evaluation {
        let request = critique_request(item, references);

        let outcome = tokio::time::timeout(self.call_timeout, self.service.complete(&request)).await;
        match outcome {
            Ok(Ok(feedback)) => {
                let score = score_from_feedback(&feedback);
                debug!(score, "item evaluated");
                Evaluation::new(item.clone(), score, feedback)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "item evaluation failed");
                degraded(item, &e.to_string())
            }
            Err(_) => {
                warn!("item evaluation timed out");
                degraded(
                    item,
                    &format!("timed out after {} ms", self.call_timeout.as_millis()),
                )
            }
        }
    }

    /// Evaluate every item of an exam and aggregate against `target_marks`.
    pub async fn evaluate_exam(
        &self,
        exam: &ItemSet,
        target_marks: u32,
        references: &[ExemplarRecord],
    ) -> ExamEvaluation {
        let evaluations = join_all(
            exam.questions
                .iter()
                .map(|item| self.evaluate(item, references)),
        )
        .await;
        ExamEvaluation::aggregate(evaluations, target_marks)
    }

    /// Items of an evaluated exam that clear this gate's minimum.
    pub fn accepted_items(&self, evaluation: &ExamEvaluation) -> Vec<Item> {
        evaluation.accepted_items(self.minimum)
    }
}

fn degraded(item: &Item, reason: &str) -> Evaluation {
    Evaluation {
        score: ERROR_SCORE,
        feedback: format!("Evaluation error: {reason}"),
        approved: false,
        item: item.clone(),
    }
}

/// Judges drafts for the feedback loop.
pub struct GateJudge {
    gate: QualityGate,
    target_marks: u32,
    references: Vec<ExemplarRecord>,
}

impl GateJudge {
    pub fn new(gate: QualityGate, target_marks: u32, references: Vec<ExemplarRecord>) -> Self {
        Self {
            gate,
            target_marks,
            references,
        }
    }
}

#[async_trait]
impl ExamJudge for GateJudge {
    async fn judge(&self, candidate: &ItemSet) -> ExamEvaluation {
        self.gate
            .evaluate_exam(candidate, self.target_marks, &self.references)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labelled_fraction() {
        assert_eq!(parse_score("Overall quality score: 8/10"), Some(8.0));
        assert_eq!(parse_score("Rating: 6.5 out of 10"), Some(6.5));
    }

    #[test]
    fn test_parse_out_of_and_bare_fraction() {
        assert_eq!(parse_score("I would give this 9 out of 10."), Some(9.0));
        assert_eq!(parse_score("Verdict 7.5/10, solid."), Some(7.5));
    }

    #[test]
    fn test_parse_labelled_value() {
        assert_eq!(parse_score("Overall: 6"), Some(6.0));
    }

    #[test]
    fn test_no_pattern_defaults() {
        assert_eq!(parse_score("Looks fine to me."), None);
        assert_eq!(score_from_feedback("Looks fine to me."), DEFAULT_SCORE);
    }

    #[test]
    fn test_out_of_range_values_skipped() {
        // 42/10 is out of range; the next match in the same rule is used.
        assert_eq!(parse_score("Score: 42/10, revised score: 8/10"), Some(8.0));
        assert_eq!(score_from_feedback("Quality: 85"), DEFAULT_SCORE);
    }

    #[test]
    fn test_pattern_order() {
        let names: Vec<_> = score_patterns().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["labelled_fraction", "out_of", "bare_fraction", "labelled_value"]
        );
    }

    #[test]
    fn test_critique_request_limits_references() {
        let reference = |text: &str| ExemplarRecord {
            id: text.to_string(),
            text: text.to_string(),
            section: "Functions".to_string(),
            marks: 5,
            relevance_score: 0.5,
            exam_date: String::new(),
            course: String::new(),
            question_number: String::new(),
            document: String::new(),
            distance: None,
        };
        let item = Item::new("Functions", 10, "Write f.", crate::domain::Difficulty::Medium);
        let long = "y".repeat(500);
        let refs = vec![reference(&long), reference("second"), reference("third")];

        let request = critique_request(&item, &refs);
        assert!(request.user_prompt.contains("Reference 2:"));
        assert!(!request.user_prompt.contains("Reference 3:"));
        assert!(request.user_prompt.contains(&"y".repeat(200)));
        assert!(!request.user_prompt.contains(&"y".repeat(201)));
        assert_eq!(request.temperature, CRITIC_TEMPERATURE);
        assert_eq!(request.max_tokens, CRITIC_MAX_TOKENS);
    }
}
