//! Error types for llm-gateway

use thiserror::Error;

/// Errors that can occur talking to the generation service
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No API key configured
    #[error("API key is not configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Service answered with a non-success status
    #[error("Service error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Call did not complete within the configured timeout
    #[error("Call timed out after {0} ms")]
    Timeout(u64),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GatewayError::Timeout(0);
        }
        GatewayError::Http(err.to_string())
    }
}
