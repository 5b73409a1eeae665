//! Deterministic provider that replays a script of responses.
//!
//! Useful for tests and offline demos. Every request is recorded so callers
//! can assert on what the engine actually sent.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ModelProvider, ModelResponse, ProviderRequest};
use crate::error::BatonError;

type ResponseFn = dyn Fn(&ProviderRequest, usize) -> Result<ModelResponse, BatonError> + Send + Sync;

/// Provider that returns queued responses in order.
///
/// When the queue is exhausted it falls back to the function set with
/// [`ScriptedProvider::otherwise`], or fails with a provider error.
pub struct ScriptedProvider {
    name: String,
    queue: Mutex<VecDeque<Result<ModelResponse, BatonError>>>,
    fallback: Option<Arc<ResponseFn>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            queue: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue a successful response.
    pub fn respond(self, response: ModelResponse) -> Self {
        self.push(Ok(response))
    }

    /// Queue a failure.
    pub fn fail(self, error: BatonError) -> Self {
        self.push(Err(error))
    }

    /// Produce responses once the queue is empty. The second argument is the
    /// zero-based index of the call.
    pub fn otherwise<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProviderRequest, usize) -> Result<ModelResponse, BatonError> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(f));
        self
    }

    fn push(self, item: Result<ModelResponse, BatonError>) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("name", &self.name)
            .field("calls", &self.call_count())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, BatonError> {
        let index = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| BatonError::provider(&self.name, "request log poisoned"))?;
            requests.push(request.clone());
            requests.len() - 1
        };

        let next = self
            .queue
            .lock()
            .map_err(|_| BatonError::provider(&self.name, "script poisoned"))?
            .pop_front();

        match (next, &self.fallback) {
            (Some(item), _) => item,
            (None, Some(fallback)) => fallback(request, index),
            (None, None) => Err(BatonError::provider(
                &self.name,
                format!("script exhausted after {index} calls"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Usage;

    fn request() -> ProviderRequest {
        ProviderRequest {
            messages: vec![],
            model: "m".into(),
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn replays_queue_then_fallback() {
        let provider = ScriptedProvider::new()
            .respond(ModelResponse::new(Usage::new(1, 0)).message("first"))
            .otherwise(|_, idx| Ok(ModelResponse::default().message(format!("call {idx}"))));

        let first = provider.complete(&request()).await.unwrap();
        let second = provider.complete(&request()).await.unwrap();

        assert_eq!(first.usage.input_tokens, 1);
        assert_eq!(
            second.output,
            ModelResponse::default().message("call 1").output
        );
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let provider = ScriptedProvider::new();
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }
}
