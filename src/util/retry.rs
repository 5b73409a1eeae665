//! Retry with exponential backoff and jitter.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{BatonError, ErrorCategory};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Categories to retry. `None` defers to [`ErrorCategory::is_retryable`].
    pub retry_on: Option<HashSet<ErrorCategory>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            retry_on: None,
        }
    }
}

impl RetryPolicy {
    /// Restrict retries to the given categories.
    ///
    /// Authentication errors are dropped from the set; they never succeed on
    /// a second attempt.
    pub fn with_retry_on(mut self, categories: impl IntoIterator<Item = ErrorCategory>) -> Self {
        self.retry_on = Some(
            categories
                .into_iter()
                .filter(|c| *c != ErrorCategory::Authentication)
                .collect(),
        );
        self
    }

    /// Whether `error` should be retried under this policy.
    pub fn should_retry(&self, error: &BatonError) -> bool {
        let category = error.category();
        match &self.retry_on {
            Some(set) => set.contains(&category),
            None => category.is_retryable(),
        }
    }

    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, BatonError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BatonError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !self.should_retry(&e) || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        category = %e.category(),
                        error = %e,
                        "Retrying after error"
                    );

                    let sleep_duration = match &e {
                        BatonError::RateLimited {
                            retry_after_ms: Some(ms),
                        } => Duration::from_millis(*ms).min(self.max_backoff),
                        _ => jittered(backoff),
                    };
                    tokio::time::sleep(sleep_duration).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(BatonError::Timeout(0)))
    }
}

/// `backoff` scaled by a random factor in 75%..125%.
fn jittered(backoff: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.75..1.25);
    backoff.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_retry_set_never_includes_authentication() {
        let policy = RetryPolicy::default()
            .with_retry_on([ErrorCategory::Authentication, ErrorCategory::ContextTooLarge]);
        assert!(!policy.should_retry(&BatonError::Authentication("bad".into())));
        assert!(policy.should_retry(&BatonError::ContextTooLarge("big".into())));
        assert!(!policy.should_retry(&BatonError::Timeout(10)));
    }

    #[test]
    fn default_policy_follows_category_retryability() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&BatonError::provider("openai", "server overloaded")));
        assert!(!policy.should_retry(&BatonError::Validation("missing output".into())));
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_the_backoff() {
        let backoff = Duration::from_millis(400);
        for _ in 0..200 {
            let delay = jittered(backoff);
            assert!(delay >= Duration::from_millis(299), "{delay:?}");
            assert!(delay < Duration::from_millis(500), "{delay:?}");
        }
    }
}
