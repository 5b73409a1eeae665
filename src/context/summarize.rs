//! Summaries that replace trimmed history.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BatonError;
use crate::provider::{ModelProvider, OutputItem, ProviderRequest};
use crate::types::Message;

const DEFAULT_PROMPT: &str = "Provide a concise summary of the conversation above, preserving:\n\
1. The user's original intent and requirements\n\
2. Key decisions, conclusions and action items\n\
3. Important constraints and technical details\n\
4. Errors encountered and how they were resolved\n\n\
Write the summary as a short narrative that keeps the conversation coherent.";

/// Produces a summary of messages that are about to be dropped.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[Message]) -> Result<String, BatonError>;
}

/// Summarizer that asks a model provider for the summary.
pub struct ProviderSummarizer {
    provider: Arc<dyn ModelProvider>,
    model: String,
    prompt: String,
}

impl ProviderSummarizer {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Summarizer for ProviderSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String, BatonError> {
        let mut request_messages = messages.to_vec();
        request_messages.push(Message::user(self.prompt.clone()));
        let request = ProviderRequest {
            messages: request_messages,
            model: self.model.clone(),
            tools: Vec::new(),
        };

        let response = self.provider.complete(&request).await?;
        let summary: String = response
            .output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content, .. } => Some(content.as_str()),
                OutputItem::FunctionCall { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if summary.trim().is_empty() {
            return Err(BatonError::Validation("summarizer returned no text".into()));
        }
        Ok(summary)
    }
}

impl std::fmt::Debug for ProviderSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSummarizer")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .finish()
    }
}
