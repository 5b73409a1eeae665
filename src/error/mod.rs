//! Error types for baton.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all baton operations.
///
/// Errors local to one tool call never escape a step: they are captured as
/// [`BatonError::ToolExecution`] and rendered into the conversation. Every
/// other variant propagates to the caller of `Runner::run` and names the
/// stage that failed.
#[derive(Error, Debug)]
pub enum BatonError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid provider response: {0}")]
    Validation(String),

    #[error("Tool execution error: {tool_name}({arguments}): {message}")]
    ToolExecution {
        tool_name: String,
        arguments: String,
        message: String,
    },

    #[error("Invalid handoff configuration: {0}")]
    HandoffConstruction(String),

    #[error("Handoff hook failed for {from} -> {to}: {message}")]
    HandoffHook {
        from: String,
        to: String,
        message: String,
    },

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded { max_turns: usize },

    #[error("Run stopped by caller")]
    StopRequested,

    #[error("Input guardrail '{guardrail}' triggered: {message}")]
    InputGuardrailTriggered { guardrail: String, message: String },

    #[error("Output guardrail '{guardrail}' triggered: {message}")]
    OutputGuardrailTriggered { guardrail: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Context too large: {0}")]
    ContextTooLarge(String),

    #[error("Model overloaded: {0}")]
    ModelOverloaded(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatonError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::ContextTooLarge(_) => ErrorCategory::ContextTooLarge,
            Self::ModelOverloaded(_) => ErrorCategory::ModelOverloaded,
            Self::Configuration(_)
            | Self::HandoffConstruction(_)
            | Self::AgentNotFound(_) => ErrorCategory::Configuration,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::ToolExecution { .. } | Self::HandoffHook { .. } => ErrorCategory::ToolExecution,
            Self::InputGuardrailTriggered { .. } | Self::OutputGuardrailTriggered { .. } => {
                ErrorCategory::Guardrail
            }
            Self::MaxTurnsExceeded { .. } => ErrorCategory::TurnLimit,
            Self::StopRequested => ErrorCategory::Cancelled,
            Self::Api { status, message } => match ErrorCategory::from_status(*status) {
                ErrorCategory::Unknown => ErrorCategory::classify_message(message),
                category => category,
            },
            Self::Provider { message, .. } => ErrorCategory::classify_message(message),
            Self::Io(_) => ErrorCategory::Network,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit
            | ErrorCategory::Network
            | ErrorCategory::Timeout
            | ErrorCategory::ModelOverloaded
            | ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::ContextTooLarge => RecoverySuggestion::ReduceInputSize,
            ErrorCategory::Configuration | ErrorCategory::Validation => {
                RecoverySuggestion::CheckConfiguration
            }
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::TurnLimit => RecoverySuggestion::IncreaseTurnBudget,
            ErrorCategory::Guardrail => RecoverySuggestion::ReviewInput,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BatonError>;
