//! Domain-level error taxonomy for examforge.

use bank_merge::BankError;
use exemplar_store::{EmbedError, StoreError};
use llm_gateway::GatewayError;

/// Errors produced when parsing a difficulty tag.
#[derive(Debug, thiserror::Error)]
#[error("unknown difficulty '{0}' (expected easy, medium or hard)")]
pub struct ParseDifficultyError(pub String);

/// examforge domain errors.
///
/// Only `Configuration` and `Persistence` ever reach the entry point; the
/// other two are recovered locally by substituting a conservative default.
#[derive(Debug, thiserror::Error)]
pub enum ExamForgeError {
    #[error("service call failed: {0}")]
    TransientService(String),

    #[error("unparsable service response: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ExamForgeError {
    /// Whether the run can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExamForgeError::TransientService(_) | ExamForgeError::Parse(_)
        )
    }
}

impl From<GatewayError> for ExamForgeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingApiKey => ExamForgeError::Configuration(err.to_string()),
            GatewayError::Malformed(_) | GatewayError::Json(_) => {
                ExamForgeError::Parse(err.to_string())
            }
            other => ExamForgeError::TransientService(other.to_string()),
        }
    }
}

impl From<EmbedError> for ExamForgeError {
    fn from(err: EmbedError) -> Self {
        ExamForgeError::TransientService(err.to_string())
    }
}

impl From<StoreError> for ExamForgeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_)
            | StoreError::SchemaSetup(_)
            | StoreError::EmptyCollection(_) => {
                ExamForgeError::Configuration(err.to_string())
            }
            other => ExamForgeError::TransientService(other.to_string()),
        }
    }
}

impl From<BankError> for ExamForgeError {
    fn from(err: BankError) -> Self {
        ExamForgeError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for ExamForgeError {
    fn from(err: std::io::Error) -> Self {
        ExamForgeError::Persistence(err.to_string())
    }
}

impl From<ParseDifficultyError> for ExamForgeError {
    fn from(err: ParseDifficultyError) -> Self {
        ExamForgeError::Configuration(err.to_string())
    }
}

/// Result type for examforge domain operations.
pub type Result<T> = std::result::Result<T, ExamForgeError>;
