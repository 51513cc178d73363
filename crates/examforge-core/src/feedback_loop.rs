//! Bounded generate → evaluate loop with best-candidate tracking.
//!
//! The controller owns no services. Drafting and judging are injected through
//! [`ExamDrafter`] and [`ExamJudge`], so the loop can be driven by scripted
//! collaborators in tests.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Instrument};

use crate::domain::{ExamEvaluation, ItemSet};
use crate::obs::{emit_iteration_evaluated, emit_run_finished, emit_run_started, RunSpan};

pub const DEFAULT_MAX_ITERATIONS: u32 = 2;

/// Produces one candidate exam per call, or nothing.
#[async_trait]
pub trait ExamDrafter: Send + Sync {
    async fn draft(&self, iteration: u32) -> Option<ItemSet>;
}

/// Scores a candidate exam.
#[async_trait]
pub trait ExamJudge: Send + Sync {
    async fn judge(&self, candidate: &ItemSet) -> ExamEvaluation;
}

/// Loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Init,
    Iterating,
    Approved,
    Exhausted,
    Failed,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Exhausted | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPolicy {
    pub max_iterations: u32,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl LoopPolicy {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

/// What happened in one iteration. `evaluation` is `None` when the drafter
/// produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub evaluation: Option<ExamEvaluation>,
    pub became_best: bool,
}

impl IterationRecord {
    pub fn skipped(&self) -> bool {
        self.evaluation.is_none()
    }
}

/// Outcome of one controller run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopReport {
    pub run_id: String,
    pub state: LoopState,
    pub best: Option<ItemSet>,
    pub best_evaluation: Option<ExamEvaluation>,
    /// Iteration (1-based) that produced `best`.
    pub best_iteration: Option<u32>,
    pub iterations_run: u32,
    pub history: Vec<IterationRecord>,
    pub finished_at: DateTime<Utc>,
}

impl LoopReport {
    pub fn best_score(&self) -> Option<f64> {
        self.best_evaluation.as_ref().map(|e| e.overall_score)
    }

    pub fn produced_candidate(&self) -> bool {
        self.best.is_some()
    }
}

/// Drives the bounded refinement loop.
#[derive(Debug, Clone)]
pub struct FeedbackLoopController {
    run_id: String,
    policy: LoopPolicy,
    state: LoopState,
}

impl FeedbackLoopController {
    pub fn new(policy: LoopPolicy) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            policy,
            state: LoopState::Init,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until a candidate is approved or iterations run out.
    ///
    /// The first evaluated candidate becomes best; later ones replace it only
    /// on a strictly higher overall score, or when approved.
    pub async fn run(&mut self, drafter: &dyn ExamDrafter, judge: &dyn ExamJudge) -> LoopReport {
        let run_span = RunSpan::new(&self.run_id);
        let started = Instant::now();
        emit_run_started(&self.run_id, self.policy.max_iterations);

        let report = self.iterate(drafter, judge).instrument(run_span.span()).await;

        emit_run_finished(
            &self.run_id,
            started.elapsed().as_millis() as u64,
            report.state,
            report.best_score(),
        );
        report
    }

    async fn iterate(&mut self, drafter: &dyn ExamDrafter, judge: &dyn ExamJudge) -> LoopReport {
        self.state = LoopState::Iterating;
        let mut best: Option<(u32, ItemSet, ExamEvaluation)> = None;
        let mut history = Vec::new();
        let mut iterations_run = 0;

        for iteration in 1..=self.policy.max_iterations {
            iterations_run = iteration;

            let Some(candidate) = drafter.draft(iteration).await else {
                warn!(iteration, "no candidate produced; skipping iteration");
                history.push(IterationRecord {
                    iteration,
                    evaluation: None,
                    became_best: false,
                });
                continue;
            };

            let evaluation = judge.judge(&candidate).await;
            emit_iteration_evaluated(
                &self.run_id,
                iteration,
                evaluation.overall_score,
                evaluation.approval_rate,
                evaluation.exam_approved,
            );

            let approved = evaluation.exam_approved;
            let improves = match &best {
                None => true,
                Some((_, _, current)) => evaluation.overall_score > current.overall_score,
            };
            let became_best = improves || approved;

            history.push(IterationRecord {
                iteration,
                evaluation: Some(evaluation.clone()),
                became_best,
            });
            if became_best {
                debug!(iteration, score = evaluation.overall_score, "new best candidate");
                best = Some((iteration, candidate, evaluation));
            }

            if approved {
                self.state = LoopState::Approved;
                break;
            }
        }

        if self.state == LoopState::Iterating {
            self.state = if best.is_some() {
                LoopState::Exhausted
            } else {
                LoopState::Failed
            };
        }

        let (best_iteration, best, best_evaluation) = match best {
            Some((iteration, set, evaluation)) => (Some(iteration), Some(set), Some(evaluation)),
            None => (None, None, None),
        };

        LoopReport {
            run_id: self.run_id.clone(),
            state: self.state,
            best,
            best_evaluation,
            best_iteration,
            iterations_run,
            history,
            finished_at: Utc::now(),
        }
    }
}
