//! Provider wrappers that add retries and rate limiting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ModelProvider, ModelResponse, ProviderRequest};
use crate::error::BatonError;
use crate::util::{RetryPolicy, TokenBucket};

/// Retries retryable provider failures according to a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ModelProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for RetryingProvider<P> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, BatonError> {
        self.policy.execute(|| self.inner.complete(request)).await
    }
}

/// Waits on a shared [`TokenBucket`] before every provider call.
///
/// Clone the `Arc<TokenBucket>` into several wrappers to share one budget
/// across providers.
#[derive(Debug)]
pub struct RateLimitedProvider<P> {
    inner: P,
    bucket: Arc<TokenBucket>,
    acquire_timeout: Option<Duration>,
}

impl<P: ModelProvider> RateLimitedProvider<P> {
    pub fn new(inner: P, bucket: Arc<TokenBucket>) -> Self {
        Self {
            inner,
            bucket,
            acquire_timeout: None,
        }
    }

    /// Fail with [`BatonError::Timeout`] instead of waiting longer than `timeout`.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub fn bucket(&self) -> &Arc<TokenBucket> {
        &self.bucket
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for RateLimitedProvider<P> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, BatonError> {
        self.bucket.acquire(self.acquire_timeout).await?;
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedProvider;
    use crate::types::Usage;

    fn request() -> ProviderRequest {
        ProviderRequest {
            messages: vec![],
            model: "test".into(),
            tools: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_provider_recovers_from_transient_failure() {
        let scripted = Arc::new(
            ScriptedProvider::new()
                .fail(BatonError::Network("reset".into()))
                .respond(ModelResponse::new(Usage::new(1, 1)).message("ok")),
        );
        let provider = RetryingProvider::new(scripted.clone(), RetryPolicy::default());

        let response = provider.complete(&request()).await.unwrap();

        assert_eq!(response.usage.total_tokens, 2);
        assert_eq!(scripted.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_provider_does_not_retry_authentication() {
        let scripted = Arc::new(
            ScriptedProvider::new().fail(BatonError::Authentication("bad key".into())),
        );
        let provider = RetryingProvider::new(scripted.clone(), RetryPolicy::default());

        let err = provider.complete(&request()).await.unwrap_err();

        assert!(matches!(err, BatonError::Authentication(_)));
        assert_eq!(scripted.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_provider_spaces_calls() {
        let bucket = Arc::new(TokenBucket::new(60, 1).unwrap());
        let provider = RateLimitedProvider::new(
            ScriptedProvider::new()
                .respond(ModelResponse::default())
                .respond(ModelResponse::default()),
            bucket,
        );

        let start = tokio::time::Instant::now();
        provider.complete(&request()).await.unwrap();
        provider.complete(&request()).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_provider_times_out() {
        let bucket = Arc::new(TokenBucket::new(1, 1).unwrap());
        let provider = RateLimitedProvider::new(
            ScriptedProvider::new().respond(ModelResponse::default()),
            bucket,
        )
        .with_acquire_timeout(Duration::from_millis(100));

        provider.complete(&request()).await.unwrap();
        let err = provider.complete(&request()).await.unwrap_err();

        assert!(matches!(err, BatonError::Timeout(100)));
    }
}
