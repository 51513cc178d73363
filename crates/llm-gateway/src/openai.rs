//! OpenAI-compatible HTTP client
//!
//! Talks to `/chat/completions` for generation and `/embeddings` for the
//! exemplar embedder. Any server speaking the same wire format works.

use async_trait::async_trait;
use exemplar_store::{EmbedError, EmbedResult, Embedder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::{CompletionRequest, GatewayResult, GenerationService};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible API
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("examforge-llm-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(OpenAiClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    fn api_key(&self) -> GatewayResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingApiKey)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<reqwest::Response> {
        let key = self.api_key()?;
        let response = self
            .http_client
            .post(self.endpoint(path))
            .bearer_auth(key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    GatewayError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), path, "generation service returned error");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %self.config.chat_model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<String> {
        let body = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self.post_json("chat/completions", &body).await?;
        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Malformed("response carried no choices".to_string()))?;

        debug!(chars = content.len(), "completion received");
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    #[instrument(skip(self, text), fields(model = %self.config.embedding_model))]
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response = self
            .post_json("embeddings", &body)
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Malformed(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::Malformed("response carried no data".to_string()))?;
        if vector.is_empty() {
            return Err(EmbedError::Empty);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Section: Functions\nText: Write f."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Section: Functions\nText: Write f.")
        );
    }

    #[test]
    fn test_embedding_response_tolerates_missing_data() {
        let parsed: EmbeddingResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_endpoint_joins_path() {
        let client = OpenAiClient::new(GatewayConfig::new("http://localhost:9000/v1/")).unwrap();
        assert_eq!(
            client.endpoint("chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = OpenAiClient::new(GatewayConfig::new("http://127.0.0.1:9")).unwrap();
        let request = CompletionRequest::new("system", "user", 0.7, 500);
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingApiKey));

        let err = client.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbedError::Request(_)));
    }
}
