//! Domain models for examforge.
//!
//! Canonical definitions for the core entities:
//! - `Item` / `ItemSet`: generated questions and exams
//! - `ExemplarRecord`: stored questions used as style references
//! - `GenerationRequest`: parameters for one run
//! - `Evaluation` / `ExamEvaluation`: quality verdicts

pub mod error;
pub mod evaluation;
pub mod exemplar;
pub mod item;
pub mod request;

// Re-export main types and errors
pub use error::{ExamForgeError, ParseDifficultyError, Result};
pub use evaluation::{
    Evaluation, ExamEvaluation, APPROVAL_THRESHOLD, EXAM_APPROVAL_RATE, MARK_TOLERANCE,
};
pub use exemplar::{ExemplarRecord, SectionCount};
pub use item::{Difficulty, ExamMetadata, Item, ItemSet, SourceExam, SourceQuestion};
pub use request::{GenerationRequest, DEFAULT_COURSE};
