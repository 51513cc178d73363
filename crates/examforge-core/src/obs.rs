//! Structured observability hooks for examforge run lifecycle events.
//!
//! Events are emitted at `info!` level with an `event` field so they can be
//! filtered out of the JSON log stream (`--json`). [`init_tracing`] installs
//! the subscriber once at program start.

use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::feedback_loop::LoopState;

/// Crates whose logs follow the requested verbosity.
pub const WORKSPACE_TARGETS: &[&str] = &[
    "examforge",
    "examforge_core",
    "exemplar_store",
    "llm_gateway",
    "bank_merge",
];

/// Filter used when `RUST_LOG` is unset: workspace crates at `level`,
/// dependencies (SurrealDB, reqwest) at `warn`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(WORKSPACE_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. JSON lines go to stdout so they can be
/// piped; human-readable output goes to stderr and leaves stdout to command
/// output. Later calls are ignored.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

/// Run-scoped tracing span tagged with the run id.
///
/// Async work is attached with [`RunSpan::span`] and `Instrument`; a guard
/// from [`RunSpan::enter`] must not be held across an `.await`.
///
/// ```ignore
/// let run_span = RunSpan::new("run-12345");
/// controller_future.instrument(run_span.span()).await;
/// ```
#[derive(Debug, Clone)]
pub struct RunSpan {
    span: tracing::Span,
}

impl RunSpan {
    pub fn new(run_id: &str) -> Self {
        Self {
            span: tracing::info_span!("examforge.run", run_id = %run_id),
        }
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }

    /// Enter the span for a synchronous section.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Emit event: feedback loop started.
pub fn emit_run_started(run_id: &str, max_iterations: u32) {
    info!(event = "run.started", run_id = %run_id, max_iterations = max_iterations);
}

/// Emit event: one candidate exam evaluated.
pub fn emit_iteration_evaluated(
    run_id: &str,
    iteration: u32,
    overall_score: f64,
    approval_rate: f64,
    approved: bool,
) {
    info!(
        event = "iteration.evaluated",
        run_id = %run_id,
        iteration = iteration,
        overall_score = overall_score,
        approval_rate = approval_rate,
        approved = approved,
    );
}

/// Emit event: feedback loop finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, state: LoopState, best_score: Option<f64>) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        state = ?state,
        best_score = ?best_score,
    );
}

/// Emit event: accepted items merged into the question bank.
pub fn emit_bank_merged(path: &str, added: usize, total: usize) {
    info!(event = "bank.merged", path = %path, added = added, total = total);
}

/// Emit event: exemplar index (re)built or extended.
pub fn emit_index_updated(added: usize, skipped: usize, total: usize) {
    info!(event = "index.updated", added = added, skipped = skipped, total = total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let run_span = RunSpan::new("test-run-id");
        let _guard = run_span.enter();
        emit_run_started("test-run-id", 2);
        emit_run_finished("test-run-id", 5, LoopState::Failed, None);
    }

    #[test]
    fn test_default_directives_scope_workspace_crates() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("examforge_core=debug"));
        assert!(directives.contains("exemplar_store=debug"));
        assert!(!directives.contains("surrealdb"));
        assert_eq!(directives.split(',').count(), WORKSPACE_TARGETS.len() + 1);
        EnvFilter::try_new(&directives).unwrap();
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
