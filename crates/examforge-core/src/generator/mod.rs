//! Candidate generation.
//!
//! Shapes requests to the generation service and parses its responses into
//! items. Items within one exam are generated concurrently (one task per
//! assignment, bounded by a semaphore) and reassembled in assignment order.

pub mod prompt;
pub mod sections;

pub use prompt::{parse_candidate, question_request, select_prompt_exemplars, PromptExemplars};
pub use sections::{section_description, topic_families, TopicFamily, DEFAULT_SECTIONS};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llm_gateway::GenerationService;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::allocator::{allocate, allocate_seeded, distribute_marks};
use crate::domain::{Difficulty, ExamMetadata, ExemplarRecord, GenerationRequest, Item, ItemSet};
use crate::feedback_loop::ExamDrafter;
use crate::retriever::ExemplarRetriever;

/// Sections taken from index statistics when the request names none.
pub const MAX_INDEX_SECTIONS: usize = 8;
/// Same-section exemplars needed before the retriever is consulted.
pub const MIN_SECTION_EXEMPLARS: usize = 2;
/// Exemplars passed to one item's prompt.
pub const ASSIGNMENT_EXEMPLARS: usize = 3;

/// Tuning for [`CandidateGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum number of concurrent generation calls.
    pub max_concurrent: usize,
    /// Per-call timeout; a timeout counts as a failed item.
    pub call_timeout: Duration,
    /// Seed for the section shuffle. `None` uses the thread RNG.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            call_timeout: Duration::from_secs(60),
            seed: None,
        }
    }
}

/// One slot of an exam: which section, how many marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub index: usize,
    pub section: String,
    pub marks: u32,
}

/// Builds candidate items and exams through a [`GenerationService`].
#[derive(Clone)]
pub struct CandidateGenerator {
    service: Arc<dyn GenerationService>,
    retriever: Option<ExemplarRetriever>,
    config: GeneratorConfig,
}

impl CandidateGenerator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            retriever: None,
            config: GeneratorConfig::default(),
        }
    }

    pub fn with_retriever(mut self, retriever: Option<ExemplarRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate one item for `section`. Service failures, timeouts and empty
    /// responses all yield `None`.
    #[instrument(skip(self, exemplars), fields(exemplar_count = exemplars.len()))]
    pub async fn generate_question(
        &self,
        section: &str,
        marks: u32,
        exemplars: &[ExemplarRecord],
        difficulty: Difficulty,
    ) -> Option<Item> {
        let picked = select_prompt_exemplars(section, exemplars);
        let request = question_request(section, marks, difficulty, &picked);

        let response = match tokio::time::timeout(self.config.call_timeout, self.service.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "question generation failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "question generation timed out"
                );
                return None;
            }
        };

        let item = parse_candidate(&response, section, marks, difficulty);
        if item.is_none() {
            warn!("generation response carried no question text");
        }
        item
    }

    /// Exemplars for one assignment.
    ///
    /// Two or more same-section style exemplars are used directly (up to
    /// three). Otherwise the retriever is asked for more from that section;
    /// if that still leaves fewer than two, the first two general style
    /// exemplars are used instead.
    pub async fn assignment_exemplars(
        &self,
        section: &str,
        style_examples: &[ExemplarRecord],
        difficulty: Difficulty,
    ) -> Vec<ExemplarRecord> {
        if style_examples.is_empty() {
            return Vec::new();
        }

        let mut chosen: Vec<ExemplarRecord> = style_examples
            .iter()
            .filter(|e| e.section == section)
            .cloned()
            .collect();
        if chosen.len() >= MIN_SECTION_EXEMPLARS {
            chosen.truncate(ASSIGNMENT_EXEMPLARS);
            return chosen;
        }

        if let Some(retriever) = &self.retriever {
            let extra = retriever
                .retrieve_for_section(section, ASSIGNMENT_EXEMPLARS, difficulty)
                .await;
            for record in extra {
                if !chosen.iter().any(|c| c.id == record.id) {
                    chosen.push(record);
                }
            }
            chosen.truncate(ASSIGNMENT_EXEMPLARS);
        }

        if chosen.len() < MIN_SECTION_EXEMPLARS {
            debug!(section, "few section exemplars; using general style set");
            return style_examples.iter().take(MIN_SECTION_EXEMPLARS).cloned().collect();
        }
        chosen
    }

    /// Sections for a request: as requested, else the most populous index
    /// sections, else the built-in defaults.
    pub async fn resolve_sections(&self, request: &GenerationRequest) -> Vec<String> {
        if let Some(sections) = request.sections.as_ref().filter(|s| !s.is_empty()) {
            return sections.clone();
        }
        if let Some(retriever) = &self.retriever {
            let stats = retriever.section_statistics().await;
            if !stats.is_empty() {
                return stats
                    .into_iter()
                    .take(MAX_INDEX_SECTIONS)
                    .map(|s| s.section)
                    .collect();
            }
        }
        DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
    }

    /// Section and marks for every slot of the exam.
    pub async fn plan_assignments(&self, request: &GenerationRequest) -> Vec<Assignment> {
        let item_count = request.resolved_item_count();
        let sections = self.resolve_sections(request).await;
        let allocated = match self.config.seed {
            Some(seed) => allocate_seeded(item_count, &sections, seed),
            None => allocate(item_count, &sections),
        };
        let marks = distribute_marks(request.target_marks, allocated.len());

        allocated
            .into_iter()
            .zip(marks)
            .enumerate()
            .map(|(index, (section, marks))| Assignment {
                index,
                section,
                marks,
            })
            .collect()
    }

    /// Generate a full exam. `None` when no item could be produced.
    #[instrument(skip(self, request, style_examples), fields(target_marks = request.target_marks, difficulty = %request.difficulty))]
    pub async fn generate_exam(
        &self,
        request: &GenerationRequest,
        style_examples: &[ExemplarRecord],
    ) -> Option<ItemSet> {
        let assignments = self.plan_assignments(request).await;
        info!(items = assignments.len(), "generating exam");

        let style = Arc::new(style_examples.to_vec());
        let sem = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let difficulty = request.difficulty;

        let mut tasks = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let generator = self.clone();
            let style = Arc::clone(&style);
            let sem = Arc::clone(&sem);

            tasks.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let exemplars = generator
                    .assignment_exemplars(&assignment.section, &style, difficulty)
                    .await;
                let item = generator
                    .generate_question(&assignment.section, assignment.marks, &exemplars, difficulty)
                    .await;
                (assignment, item)
            }));
        }

        // Awaiting in spawn order keeps items in assignment order.
        let mut questions = Vec::new();
        for task in tasks {
            match task.await {
                Ok((assignment, Some(item))) => questions.push(item.with_number(assignment.index + 1)),
                Ok((assignment, None)) => {
                    warn!(item = assignment.index + 1, section = %assignment.section, "item generation failed")
                }
                Err(e) => warn!(error = %e, "item generation task aborted"),
            }
        }

        if questions.is_empty() {
            warn!("no items generated");
            return None;
        }
        Some(ItemSet::new(ExamMetadata::generated(&request.course), questions))
    }
}

/// Drafts exams for the feedback loop from a fixed request and style set.
pub struct GeneratorDrafter {
    generator: CandidateGenerator,
    request: GenerationRequest,
    style_examples: Vec<ExemplarRecord>,
}

impl GeneratorDrafter {
    pub fn new(
        generator: CandidateGenerator,
        request: GenerationRequest,
        style_examples: Vec<ExemplarRecord>,
    ) -> Self {
        Self {
            generator,
            request,
            style_examples,
        }
    }
}

#[async_trait]
impl ExamDrafter for GeneratorDrafter {
    async fn draft(&self, iteration: u32) -> Option<ItemSet> {
        debug!(iteration, "drafting exam");
        self.generator
            .generate_exam(&self.request, &self.style_examples)
            .await
    }
}
