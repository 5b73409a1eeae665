//! Cooperative stop conditions, polled once per step boundary.
//!
//! A condition that reports `true` aborts the run with
//! [`BatonError::StopRequested`](crate::error::BatonError::StopRequested).

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::Usage;

/// Snapshot of a run handed to stop conditions.
#[derive(Debug, Clone)]
pub struct RunProgress {
    pub run_id: Uuid,
    /// Turns completed so far.
    pub turns: usize,
    pub current_agent: String,
    pub usage: Usage,
    pub message_count: usize,
}

/// Trait for conditions that can stop a run early.
#[async_trait]
pub trait StopCondition: Send + Sync {
    async fn should_stop(&self, progress: &RunProgress) -> bool;

    /// Reset internal state (for reuse across runs).
    async fn reset(&self) {}
}

/// Stop once a cancellation token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelStop {
    token: CancellationToken,
}

impl CancelStop {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[async_trait]
impl StopCondition for CancelStop {
    async fn should_stop(&self, _progress: &RunProgress) -> bool {
        self.token.is_cancelled()
    }
}

/// Stop once a wall-clock budget, measured from the first poll, is spent.
#[derive(Debug)]
pub struct DeadlineStop {
    deadline: Mutex<Option<Instant>>,
    duration: Duration,
}

impl DeadlineStop {
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: Mutex::new(None),
            duration,
        }
    }
}

#[async_trait]
impl StopCondition for DeadlineStop {
    async fn should_stop(&self, _progress: &RunProgress) -> bool {
        let mut deadline = self.deadline.lock().await;
        let dl = *deadline.get_or_insert_with(|| Instant::now() + self.duration);
        Instant::now() >= dl
    }

    async fn reset(&self) {
        *self.deadline.lock().await = None;
    }
}

/// Stop when a custom predicate returns true.
pub struct PredicateStop<F: Fn(&RunProgress) -> bool + Send + Sync> {
    predicate: F,
}

impl<F: Fn(&RunProgress) -> bool + Send + Sync> PredicateStop<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F: Fn(&RunProgress) -> bool + Send + Sync> StopCondition for PredicateStop<F> {
    async fn should_stop(&self, progress: &RunProgress) -> bool {
        (self.predicate)(progress)
    }
}

/// Stop when any inner condition says so.
#[derive(Default)]
pub struct AnyStop {
    conditions: Vec<Box<dyn StopCondition>>,
}

impl AnyStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: impl StopCondition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }
}

#[async_trait]
impl StopCondition for AnyStop {
    async fn should_stop(&self, progress: &RunProgress) -> bool {
        for condition in &self.conditions {
            if condition.should_stop(progress).await {
                return true;
            }
        }
        false
    }

    async fn reset(&self) {
        for condition in &self.conditions {
            condition.reset().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(turns: usize) -> RunProgress {
        RunProgress {
            run_id: Uuid::new_v4(),
            turns,
            current_agent: "A".into(),
            usage: Usage::new(10, 5),
            message_count: 3,
        }
    }

    #[tokio::test]
    async fn cancel_stop_follows_token() {
        let stop = CancelStop::default();
        assert!(!stop.should_stop(&progress(0)).await);
        stop.token().clone().cancel();
        assert!(stop.should_stop(&progress(0)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_starts_at_first_poll() {
        let stop = DeadlineStop::new(Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!stop.should_stop(&progress(0)).await);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(stop.should_stop(&progress(1)).await);

        stop.reset().await;
        assert!(!stop.should_stop(&progress(1)).await);
    }

    #[tokio::test]
    async fn predicate_and_any_combine() {
        let stop = AnyStop::new()
            .with(CancelStop::default())
            .with(PredicateStop::new(|p: &RunProgress| p.usage.total_tokens > 100 || p.turns >= 3));
        assert!(!stop.should_stop(&progress(2)).await);
        assert!(stop.should_stop(&progress(3)).await);
    }
}
