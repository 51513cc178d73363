//! LLM-Gateway: Generation and Embedding Services for examforge
//!
//! This crate wraps the external text-generation service behind the
//! `GenerationService` trait and ships an OpenAI-compatible client that
//! also implements `exemplar_store::Embedder`.
//!
//! ## Layer 1 - External Services
//!
//! Focus: request shaping, transport errors, configuration from env.

pub mod config;
pub mod error;
pub mod fakes;
pub mod openai;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// One chat-style completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Free-text generation capability.
///
/// Output is non-deterministic and may be unparsable; callers own parsing.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<String>;
}
