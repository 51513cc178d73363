//! examforge CLI
//!
//! The `examforge` command generates exams in the style of past papers.
//!
//! ## Commands
//!
//! - `generate`: run the generate / evaluate loop and save the best exam
//! - `ingest`: (re)build the exemplar index from a historical question bank
//! - `add-to-index`: index generated bank entries as future style exemplars
//! - `stats`: show section populations of the exemplar index

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bank_merge::NormalizeOptions;
use clap::{Args, Parser, Subcommand};
use exemplar_store::{open_index, Embedder, IndexConfig};
use llm_gateway::OpenAiClient;
use tracing::{info, warn, Level};

use examforge_core::domain::DEFAULT_COURSE;
use examforge_core::feedback_loop::{FeedbackLoopController, LoopPolicy};
use examforge_core::generator::{CandidateGenerator, GeneratorConfig, GeneratorDrafter};
use examforge_core::obs::emit_bank_merged;
use examforge_core::quality_gate::{GateJudge, QualityGate};
use examforge_core::{
    add_generated_to_index, ingest_question_bank, load_source_exams, render_feedback,
    render_loop_summary, to_bank_entries, write_exam, Difficulty, ExemplarRetriever,
    GenerationRequest,
};

#[derive(Parser)]
#[command(name = "examforge")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exemplar-guided exam question generator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an exam, evaluate it, and bank the accepted questions
    Generate(GenerateArgs),

    /// Rebuild the exemplar index from a historical question bank
    Ingest {
        /// JSON array of past exams
        #[arg(short, long, default_value = "data/question_bank.json")]
        file: PathBuf,
    },

    /// Add generated questions from a bank file to the exemplar index
    AddToIndex {
        /// Bank file (array, or object with `questions`/`items`)
        #[arg(short, long, default_value = "output/newquestionbank.json")]
        file: PathBuf,
    },

    /// Show how many exemplars each section holds
    Stats,
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Target total marks
    #[arg(long, default_value_t = 100)]
    marks: u32,

    /// easy, medium or hard
    #[arg(long, default_value = "medium")]
    difficulty: Difficulty,

    /// Number of questions (derived from marks when omitted)
    #[arg(long)]
    num_questions: Option<usize>,

    /// Sections to draw questions from
    #[arg(long, num_args = 1..)]
    sections: Vec<String>,

    /// Number of style exemplars to retrieve
    #[arg(long, default_value_t = 5)]
    style_examples: usize,

    /// Restrict style exemplars to one section
    #[arg(long)]
    style_section: Option<String>,

    /// Maximum generate / evaluate iterations
    #[arg(long, default_value_t = 2)]
    iterations: u32,

    /// Where the best exam is written
    #[arg(short, long, default_value = "output/new_exam_v1.json")]
    output: PathBuf,

    /// Question bank that accepted questions are merged into
    #[arg(long, default_value = "output/newquestionbank.json")]
    bank: PathBuf,

    /// Minimum quality score for a question to enter the bank
    #[arg(long, default_value_t = 7.0)]
    min_quality: f64,

    /// Store banked questions without marks
    #[arg(long)]
    marks_agnostic_bank: bool,

    /// Seed for section shuffling
    #[arg(long, env = "EXAMFORGE_SEED")]
    seed: Option<u64>,

    /// Course name stamped on the exam
    #[arg(long, default_value = DEFAULT_COURSE)]
    course: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    examforge_core::obs::init_tracing(cli.json, level);

    match cli.command {
        Commands::Generate(args) => cmd_generate(args).await,
        Commands::Ingest { file } => cmd_ingest(&file).await,
        Commands::AddToIndex { file } => cmd_add_to_index(&file).await,
        Commands::Stats => cmd_stats().await,
    }
}

fn gateway_client() -> Result<Arc<OpenAiClient>> {
    let client = OpenAiClient::from_env().context("Failed to build generation client")?;
    if !client.config().is_configured() {
        bail!("OPENAI_API_KEY is not set; add it to the environment or a .env file");
    }
    Ok(Arc::new(client))
}

/// Retriever over the configured index, or `None` when it is unavailable.
async fn connect_retriever(embedder: Arc<dyn Embedder>) -> Option<ExemplarRetriever> {
    let index = match open_index(&IndexConfig::from_env()).await {
        Ok((index, _)) => index,
        Err(e) => {
            warn!(error = %e, "exemplar index unavailable; continuing without style exemplars");
            return None;
        }
    };
    match ExemplarRetriever::connect(embedder, Arc::new(index)).await {
        Ok(retriever) => Some(retriever),
        Err(e) => {
            warn!(error = %e, "continuing without style exemplars");
            None
        }
    }
}

/// Run the feedback loop and persist its outcome.
async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let client = gateway_client()?;
    let call_timeout = client.config().timeout;

    let mut request = GenerationRequest::new(args.marks, args.difficulty)
        .with_sections(args.sections.clone())
        .with_exemplar_count(args.style_examples);
    request.course = args.course.clone();
    if let Some(count) = args.num_questions {
        request = request.with_item_count(count);
    }

    let retriever = connect_retriever(client.clone())
        .await
        .map(|r| r.with_call_timeout(call_timeout));
    let style_examples = match &retriever {
        Some(retriever) => {
            retriever
                .retrieve_style_examples(
                    args.difficulty,
                    args.style_examples,
                    args.style_section.as_deref(),
                )
                .await
        }
        None => Vec::new(),
    };
    info!(count = style_examples.len(), "style exemplars retrieved");

    let generator = CandidateGenerator::new(client.clone())
        .with_retriever(retriever)
        .with_config(GeneratorConfig {
            call_timeout,
            seed: args.seed,
            ..GeneratorConfig::default()
        });
    let gate = QualityGate::new(client)
        .with_call_timeout(call_timeout)
        .with_minimum(args.min_quality);

    let drafter = GeneratorDrafter::new(generator, request.clone(), style_examples.clone());
    let judge = GateJudge::new(gate.clone(), request.target_marks, style_examples);
    let mut controller = FeedbackLoopController::new(LoopPolicy::new(args.iterations));
    let report = controller.run(&drafter, &judge).await;

    for record in &report.history {
        match &record.evaluation {
            Some(evaluation) => {
                println!("\n=== Iteration {}/{} ===", record.iteration, args.iterations);
                println!("{}", render_feedback(evaluation));
            }
            None => println!(
                "\n=== Iteration {}/{} ===\nFailed to generate exam",
                record.iteration, args.iterations
            ),
        }
    }
    println!("\n{}", render_loop_summary(&report));

    let (Some(exam), Some(evaluation)) = (&report.best, &report.best_evaluation) else {
        bail!("failed to generate a valid exam");
    };

    write_exam(&args.output, exam)
        .with_context(|| format!("Failed to write exam to {}", args.output.display()))?;
    println!(
        "Exam saved to {} ({} questions, {} marks)",
        args.output.display(),
        exam.len(),
        exam.total_marks()
    );

    let accepted = gate.accepted_items(evaluation);
    if accepted.is_empty() {
        bail!(
            "no question reached the minimum quality of {:.1}; bank left unchanged",
            gate.minimum()
        );
    }

    let options = NormalizeOptions::today(args.difficulty.as_str())
        .marks_agnostic(args.marks_agnostic_bank);
    let entries = to_bank_entries(&accepted, &options).context("Failed to prepare bank entries")?;
    let added = entries.len();
    let total = bank_merge::merge_into_file(&args.bank, entries)
        .with_context(|| format!("Failed to update bank {}", args.bank.display()))?;
    emit_bank_merged(&args.bank.display().to_string(), added, total);
    println!(
        "Added {added} question(s) to {} ({total} total)",
        args.bank.display()
    );

    Ok(())
}

/// Rebuild the exemplar index from past exams.
async fn cmd_ingest(file: &Path) -> Result<()> {
    let exams = load_source_exams(file)
        .with_context(|| format!("Failed to load question bank {}", file.display()))?;
    info!(exams = exams.len(), "question bank loaded");

    let client = gateway_client()?;
    let (index, _) = open_index(&IndexConfig::from_env())
        .await
        .context("Failed to open exemplar index")?;

    let today = chrono::Local::now().date_naive();
    let report = ingest_question_bank(&exams, client.as_ref(), &index, today)
        .await
        .context("Ingestion failed")?;

    println!(
        "Ingested {} of {} questions from {} exams ({} skipped)",
        report.added,
        report.considered,
        exams.len(),
        report.skipped
    );
    Ok(())
}

/// Index generated questions so later runs can use them as exemplars.
async fn cmd_add_to_index(file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("file not found: {}", file.display());
    }
    let entries =
        bank_merge::read_bank(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let client = gateway_client()?;
    let (index, count) = open_index(&IndexConfig::from_env())
        .await
        .context("Failed to open exemplar index")?;
    if count == 0 {
        bail!("exemplar index is empty; run `examforge ingest` first");
    }

    let today = chrono::Local::now().date_naive();
    let report = add_generated_to_index(&entries, client.as_ref(), &index, today)
        .await
        .context("Indexing generated questions failed")?;

    if report.considered == 0 {
        println!("No generated questions found (entries need generated_date or quality_score)");
        return Ok(());
    }
    println!(
        "Added {} new question(s) to the index ({} total)",
        report.added, report.total
    );
    Ok(())
}

/// Print section populations.
async fn cmd_stats() -> Result<()> {
    let client = gateway_client()?;
    let (index, _) = open_index(&IndexConfig::from_env())
        .await
        .context("Failed to open exemplar index")?;
    let retriever = ExemplarRetriever::connect(client, Arc::new(index))
        .await
        .context("Exemplar index not ready")?;

    let stats = retriever.section_statistics().await;
    let total: usize = stats.iter().map(|s| s.count).sum();
    println!("{total} exemplars in {} sections", stats.len());
    for stat in stats {
        println!("  {:>5}  {}", stat.count, stat.section);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["examforge", "generate"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.marks, 100);
        assert_eq!(args.difficulty, Difficulty::Medium);
        assert_eq!(args.style_examples, 5);
        assert_eq!(args.iterations, 2);
        assert_eq!(args.output, PathBuf::from("output/new_exam_v1.json"));
        assert_eq!(args.bank, PathBuf::from("output/newquestionbank.json"));
        assert_eq!(args.min_quality, 7.0);
        assert!(!args.marks_agnostic_bank);
        assert!(args.sections.is_empty());
    }

    #[test]
    fn test_generate_options() {
        let cli = Cli::try_parse_from([
            "examforge",
            "--json",
            "generate",
            "--difficulty",
            "HARD",
            "--sections",
            "Functions",
            "2D Arrays",
            "--num-questions",
            "4",
            "--marks-agnostic-bank",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.difficulty, Difficulty::Hard);
        assert_eq!(args.sections, vec!["Functions", "2D Arrays"]);
        assert_eq!(args.num_questions, Some(4));
        assert!(args.marks_agnostic_bank);
    }

    #[test]
    fn test_invalid_difficulty_rejected() {
        assert!(Cli::try_parse_from(["examforge", "generate", "--difficulty", "brutal"]).is_err());
    }

    #[test]
    fn test_ingest_default_file() {
        let cli = Cli::try_parse_from(["examforge", "ingest"]).unwrap();
        let Commands::Ingest { file } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(file, PathBuf::from("data/question_bank.json"));
    }
}
