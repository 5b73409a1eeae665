//! Model provider boundary.
//!
//! The engine talks to a model only through [`ModelProvider::complete`]. Wire
//! formats belong to adapters; [`format::parse_response`] normalizes the
//! common `{output, usage}` JSON shape for adapters that want it.

pub mod format;
pub mod layers;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BatonError;
use crate::types::{Message, Role, Usage};

pub use layers::{RateLimitedProvider, RetryingProvider};
pub use scripted::ScriptedProvider;

/// A request sent to a model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub tools: Vec<ToolDefinition>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One item of a provider's output, in the order the model produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        name: String,
        /// JSON-encoded arguments.
        arguments: String,
        call_id: String,
    },
}

/// Normalized response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    pub fn new(usage: Usage) -> Self {
        Self {
            output: Vec::new(),
            usage,
        }
    }

    /// Append an assistant message item.
    pub fn message(mut self, content: impl Into<String>) -> Self {
        self.output.push(OutputItem::Message {
            role: Role::Assistant,
            content: content.into(),
        });
        self
    }

    /// Append a function call item.
    pub fn function_call(
        mut self,
        name: impl Into<String>,
        arguments: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        self.output.push(OutputItem::FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
            call_id: call_id.into(),
        });
        self
    }
}

/// Core trait implemented by provider adapters.
///
/// Errors propagate unchanged through the engine; wrap an adapter in
/// [`RetryingProvider`] or [`RateLimitedProvider`] to add resilience.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, BatonError>;
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for Arc<P> {
    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, BatonError> {
        (**self).complete(request).await
    }
}
