//! Unified error classification and recovery.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Broad error category for routing recovery logic.
///
/// The provider-facing categories double as the retrier's vocabulary and
/// serialize as `rate_limit`, `timeout`, `context_too_large`,
/// `model_overloaded`, `network_error`, `authentication_error` and `unknown`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    RateLimit,
    Timeout,
    ContextTooLarge,
    ModelOverloaded,
    #[strum(to_string = "network_error")]
    #[serde(rename = "network_error")]
    Network,
    #[strum(to_string = "authentication_error")]
    #[serde(rename = "authentication_error")]
    Authentication,
    Server,
    Validation,
    Configuration,
    Serialization,
    ToolExecution,
    Guardrail,
    TurnLimit,
    Cancelled,
    Unknown,
}

impl ErrorCategory {
    /// Whether errors of this category are worth retrying unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::ModelOverloaded | Self::Network | Self::Server
        )
    }

    /// Classify free-form provider error text.
    ///
    /// Patterns are checked in order; the first match wins. Text that matches
    /// nothing is [`ErrorCategory::Unknown`].
    pub fn classify_message(message: &str) -> Self {
        for (regex, category) in message_patterns() {
            if regex.is_match(message) {
                return *category;
            }
        }
        Self::Unknown
    }

    /// Classify an HTTP status code returned by a provider.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            408 | 504 => Self::Timeout,
            413 => Self::ContextTooLarge,
            429 => Self::RateLimit,
            503 | 529 => Self::ModelOverloaded,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

fn message_patterns() -> &'static [(Regex, ErrorCategory)] {
    static PATTERNS: OnceLock<Vec<(Regex, ErrorCategory)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                r"(?i)(invalid api key|unauthori[sz]ed|authentication|\b401\b|\b403\b|forbidden)",
                ErrorCategory::Authentication,
            ),
            (
                r"(?i)(context.{0,12}(length|window|too (large|long))|maximum context|too many tokens|\b413\b)",
                ErrorCategory::ContextTooLarge,
            ),
            (
                r"(?i)(rate.?limit|too many requests|\b429\b|quota)",
                ErrorCategory::RateLimit,
            ),
            (
                r"(?i)(overloaded|capacity|\b503\b|\b529\b)",
                ErrorCategory::ModelOverloaded,
            ),
            (r"(?i)(timed? ?out|deadline exceeded|\b408\b|\b504\b)", ErrorCategory::Timeout),
            (
                r"(?i)(connection (reset|refused|closed)|network|dns|broken pipe|unreachable)",
                ErrorCategory::Network,
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, category)| Regex::new(pattern).ok().map(|re| (re, category)))
        .collect()
    })
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    ReduceInputSize,
    IncreaseTurnBudget,
    CheckToolImplementation,
    ReviewInput,
    ContactSupport,
}
