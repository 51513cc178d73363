//! examforge Core Library
//!
//! Exemplar-guided exam generation: retrieve past questions as style
//! references, generate candidate items, score them, and refine the exam
//! over a bounded number of iterations.
//!
//! ## Layer 3 - Domain
//!
//! Focus: retrieval ranking, section allocation, candidate generation,
//! quality gating and the feedback loop.

pub mod allocator;
pub mod domain;
pub mod feedback_loop;
pub mod generator;
pub mod ingest;
pub mod obs;
pub mod quality_gate;
pub mod relevance;
pub mod reporting;
pub mod retriever;
pub mod text;

pub use domain::{
    Difficulty, Evaluation, ExamEvaluation, ExamForgeError, ExamMetadata, ExemplarRecord,
    GenerationRequest, Item, ItemSet, Result, SectionCount, SourceExam, SourceQuestion,
    APPROVAL_THRESHOLD, DEFAULT_COURSE,
};

pub use allocator::{allocate, allocate_seeded, distribute_marks};
pub use feedback_loop::{
    ExamDrafter, ExamJudge, FeedbackLoopController, IterationRecord, LoopPolicy, LoopReport,
    LoopState,
};
pub use generator::{Assignment, CandidateGenerator, GeneratorConfig, GeneratorDrafter};
pub use ingest::{add_generated_to_index, ingest_question_bank, load_source_exams, IngestReport};
pub use quality_gate::{parse_score, GateJudge, QualityGate};
pub use relevance::RelevanceScorer;
pub use reporting::{render_feedback, render_loop_summary, to_bank_entries, write_exam};
pub use retriever::ExemplarRetriever;
