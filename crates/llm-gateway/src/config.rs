//! Gateway configuration

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL, without a trailing slash (e.g. "https://api.openai.com/v1")
    pub base_url: String,
    /// Bearer token; `None` yields `GatewayError::MissingApiKey` on first call
    pub api_key: Option<String>,
    /// Chat completion model
    pub chat_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    /// Create config for a specific endpoint
    pub fn new(base_url: &str) -> Self {
        GatewayConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set authentication token
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.trim().to_string());
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - OPENAI_API_KEY (whitespace trimmed; empty counts as unset)
    /// - OPENAI_BASE_URL (optional)
    /// - EXAMFORGE_CHAT_MODEL (optional, default: "gpt-4o-mini")
    /// - EXAMFORGE_EMBED_MODEL (optional, default: "text-embedding-3-small")
    /// - EXAMFORGE_TIMEOUT_SECS (optional, default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let base_url = std::env::var("OPENAI_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let timeout = std::env::var("EXAMFORGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        GatewayConfig {
            base_url,
            api_key,
            chat_model: std::env::var("EXAMFORGE_CHAT_MODEL").unwrap_or(defaults.chat_model),
            embedding_model: std::env::var("EXAMFORGE_EMBED_MODEL")
                .unwrap_or(defaults.embedding_model),
            timeout,
        }
    }

    /// Whether an API key is present
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
