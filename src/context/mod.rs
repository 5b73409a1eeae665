//! Context window management.
//!
//! [`ContextWindowManager::trim`] runs before every provider call. It keeps the
//! leading system message (optionally) and the most recent messages, drops
//! history from the middle, and marks the gap with a single system notice or a
//! summary. Limits are soft: reserved messages are always kept even when they
//! alone exceed the budget.

pub mod estimator;
pub mod summarize;

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Message, Role};

pub use estimator::{CharEstimator, TokenEstimator};
pub use summarize::{ProviderSummarizer, Summarizer};

/// How history is reduced when it exceeds the configured limit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextStrategy {
    /// Keep as many recent messages as fit in `max_tokens`.
    #[default]
    TokenSlidingWindow,
    /// Keep at most `max_messages` messages.
    MessageCount,
    /// Like the sliding window, but dropped messages are replaced by a summary.
    Summarization,
}

/// Context window configuration, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    #[builder(default)]
    pub strategy: ContextStrategy,
    #[builder(default = 4000)]
    pub max_tokens: usize,
    #[builder(default = 50)]
    pub max_messages: usize,
    #[builder(default = true)]
    pub preserve_system: bool,
    #[builder(default = 4)]
    pub preserve_recent: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            strategy: ContextStrategy::default(),
            max_tokens: 4000,
            max_messages: 50,
            preserve_system: true,
            preserve_recent: 4,
        }
    }
}

/// Text of the notice inserted where messages were dropped.
pub fn truncation_notice(dropped: usize) -> String {
    if dropped == 1 {
        "1 earlier message was truncated".to_string()
    } else {
        format!("{dropped} earlier messages were truncated")
    }
}

/// Trims conversation history to the configured budget.
#[derive(Clone)]
pub struct ContextWindowManager {
    config: ContextConfig,
    estimator: Arc<dyn TokenEstimator>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ContextWindowManager {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            estimator: Arc::new(CharEstimator),
            summarizer: None,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Summarizer used by [`ContextStrategy::Summarization`].
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn estimate(&self, messages: &[Message]) -> usize {
        self.estimator.conversation_tokens(messages)
    }

    /// Whether `messages` are already within the limit for this strategy.
    pub fn fits(&self, messages: &[Message]) -> bool {
        match self.config.strategy {
            ContextStrategy::MessageCount => messages.len() <= self.config.max_messages,
            ContextStrategy::TokenSlidingWindow | ContextStrategy::Summarization => {
                self.estimate(messages) <= self.config.max_tokens
            }
        }
    }

    /// Trim `messages` to the budget, preserving chronological order.
    pub async fn trim(&self, messages: &[Message]) -> Vec<Message> {
        let n = messages.len();
        if n == 0 || self.fits(messages) || self.config.preserve_recent >= n {
            return messages.to_vec();
        }

        let head = usize::from(self.config.preserve_system && messages[0].is_system());
        let mut tail_start = (n - self.config.preserve_recent).max(head);
        // The reserved tail keeps the assistant turn behind any tool results it opens with.
        while tail_start > head && tail_start < n && messages[tail_start].role == Role::Tool {
            tail_start -= 1;
        }
        let middle = &messages[head..tail_start];
        if middle.is_empty() {
            return messages.to_vec();
        }

        let mut keep_from = match self.config.strategy {
            ContextStrategy::MessageCount => {
                // The notice takes one slot.
                let reserved = head + (n - tail_start) + 1;
                let room = self.config.max_messages.saturating_sub(reserved);
                middle.len().saturating_sub(room)
            }
            ContextStrategy::TokenSlidingWindow | ContextStrategy::Summarization => {
                self.token_window_start(&messages[..head], middle, &messages[tail_start..])
            }
        };

        // A kept block must not open with results whose call was dropped.
        while keep_from < middle.len() && middle[keep_from].role == Role::Tool {
            keep_from += 1;
        }
        if keep_from == 0 {
            return messages.to_vec();
        }

        let dropped = &middle[..keep_from];
        let marker = self.gap_marker(dropped).await;

        let mut out = Vec::with_capacity(n - keep_from + 1);
        out.extend_from_slice(&messages[..head]);
        out.push(marker);
        out.extend_from_slice(&middle[keep_from..]);
        out.extend_from_slice(&messages[tail_start..]);

        tracing::debug!(
            strategy = %self.config.strategy,
            before = n,
            after = out.len(),
            dropped = dropped.len(),
            "trimmed conversation"
        );
        out
    }

    /// Index into `middle` of the oldest message that still fits, walking
    /// backward from the newest and stopping at the first that does not.
    fn token_window_start(&self, head: &[Message], middle: &[Message], tail: &[Message]) -> usize {
        let notice = Message::system(truncation_notice(middle.len()));
        let mut used = self.estimator.conversation_overhead()
            + head
                .iter()
                .chain(tail)
                .map(|m| self.estimator.message_tokens(m))
                .sum::<usize>()
            + self.estimator.message_tokens(&notice);

        let mut keep_from = middle.len();
        for (idx, message) in middle.iter().enumerate().rev() {
            let cost = self.estimator.message_tokens(message);
            if used + cost > self.config.max_tokens {
                break;
            }
            used += cost;
            keep_from = idx;
        }
        keep_from
    }

    async fn gap_marker(&self, dropped: &[Message]) -> Message {
        if self.config.strategy != ContextStrategy::Summarization {
            return Message::system(truncation_notice(dropped.len()));
        }

        let Some(summarizer) = &self.summarizer else {
            tracing::warn!("summarization strategy has no summarizer; inserting truncation notice");
            return Message::system(truncation_notice(dropped.len()));
        };

        match summarizer.summarize(dropped).await {
            Ok(summary) => Message::system(format!(
                "Summary of {} earlier messages:\n{summary}",
                dropped.len()
            )),
            Err(e) => {
                tracing::warn!(error = %e, "summarizer failed; inserting truncation notice");
                Message::system(truncation_notice(dropped.len()))
            }
        }
    }
}

impl fmt::Debug for ContextWindowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextWindowManager")
            .field("config", &self.config)
            .field("summarizer", &self.summarizer.is_some())
            .finish()
    }
}
