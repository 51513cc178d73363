//! In-memory fakes for [`GenerationService`] (testing only)

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::{CompletionRequest, GatewayResult, GenerationService};

type Responder = dyn Fn(&CompletionRequest) -> GatewayResult<String> + Send + Sync;

/// Generation service that replays scripted responses.
///
/// Queued responses are served first, in order. Once the queue is empty the
/// responder closure (if any) answers; otherwise calls fail with
/// `GatewayError::Malformed`. Every request is recorded.
#[derive(Default)]
pub struct ScriptedGeneration {
    queue: Mutex<VecDeque<GatewayResult<String>>>,
    responder: Option<Box<Responder>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the given texts in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scripted = Self::new();
        for response in responses {
            scripted.push_response(response);
        }
        scripted
    }

    /// Answer every request with a closure.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> GatewayResult<String> + Send + Sync + 'static,
    {
        ScriptedGeneration {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Sleep before answering (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.queue.lock().unwrap().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: GatewayError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queue.lock().unwrap().pop_front();
        match (queued, &self.responder) {
            (Some(result), _) => result,
            (None, Some(responder)) => responder(request),
            (None, None) => Err(GatewayError::Malformed(
                "scripted generation exhausted".to_string(),
            )),
        }
    }
}

/// Generation service whose every call fails.
#[derive(Debug, Default)]
pub struct FailingGeneration;

#[async_trait]
impl GenerationService for FailingGeneration {
    async fn complete(&self, _request: &CompletionRequest) -> GatewayResult<String> {
        Err(GatewayError::Status {
            status: 503,
            body: "generation service unavailable".to_string(),
        })
    }
}
