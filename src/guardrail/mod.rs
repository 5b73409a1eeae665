//! Input and output guardrails.
//!
//! Input guardrails of the entry agent see the run input before the first
//! turn and can veto the run. Output guardrails of the final agent see the
//! final text and can pass, rewrite or block it. Guardrails run in
//! descending priority order.

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::BatonError;

/// Outcome of an input check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub passed: bool,
    pub reason: Option<String>,
}

impl GuardrailResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome of an output check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCheck {
    Pass,
    Rewrite(String),
    Block(String),
}

#[async_trait]
pub trait InputGuardrail: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    async fn check(&self, input: &str) -> Result<GuardrailResult, BatonError>;
}

#[async_trait]
pub trait OutputGuardrail: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    async fn check(&self, output: &str) -> Result<OutputCheck, BatonError>;
}

/// Executes guardrails in descending priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardrailRunner;

impl GuardrailRunner {
    pub async fn check_input(
        guards: &[Arc<dyn InputGuardrail>],
        input: &str,
    ) -> Result<(), BatonError> {
        let mut guards = guards.to_vec();
        guards.sort_by_key(|g| Reverse(g.priority()));
        for guard in guards {
            let result = guard.check(input).await?;
            if !result.passed {
                let message = result.reason.unwrap_or_else(|| guard.name().to_string());
                tracing::warn!(guardrail = guard.name(), %message, "input guardrail triggered");
                return Err(BatonError::InputGuardrailTriggered {
                    guardrail: guard.name().to_string(),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Returns the output after any rewrites.
    pub async fn check_output(
        guards: &[Arc<dyn OutputGuardrail>],
        output: &str,
    ) -> Result<String, BatonError> {
        let mut guards = guards.to_vec();
        guards.sort_by_key(|g| Reverse(g.priority()));
        let mut out = output.to_string();
        for guard in guards {
            match guard.check(&out).await? {
                OutputCheck::Pass => {}
                OutputCheck::Rewrite(rewritten) => {
                    tracing::debug!(guardrail = guard.name(), "output rewritten");
                    out = rewritten;
                }
                OutputCheck::Block(message) => {
                    tracing::warn!(guardrail = guard.name(), %message, "output guardrail triggered");
                    return Err(BatonError::OutputGuardrailTriggered {
                        guardrail: guard.name().to_string(),
                        message,
                    });
                }
            }
        }
        Ok(out)
    }
}

/// Rejects text longer than a maximum number of characters.
#[derive(Debug, Clone)]
pub struct MaxLengthGuardrail {
    name: String,
    max_length: usize,
}

impl MaxLengthGuardrail {
    pub fn new(max_length: usize) -> Self {
        Self {
            name: format!("max_length_{max_length}"),
            max_length,
        }
    }

    fn violation(&self, text: &str) -> Option<String> {
        let len = text.chars().count();
        (len > self.max_length)
            .then(|| format!("{len} characters exceeds the limit of {}", self.max_length))
    }
}

#[async_trait]
impl InputGuardrail for MaxLengthGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, input: &str) -> Result<GuardrailResult, BatonError> {
        Ok(match self.violation(input) {
            Some(reason) => GuardrailResult::reject(reason),
            None => GuardrailResult::pass(),
        })
    }
}

#[async_trait]
impl OutputGuardrail for MaxLengthGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, output: &str) -> Result<OutputCheck, BatonError> {
        Ok(match self.violation(output) {
            Some(reason) => OutputCheck::Block(reason),
            None => OutputCheck::Pass,
        })
    }
}

/// Blocks text matching any of a set of case-insensitive patterns.
///
/// As an output guardrail it can instead redact matches with
/// [`PatternBlockGuardrail::redacting`].
#[derive(Debug, Clone)]
pub struct PatternBlockGuardrail {
    name: String,
    patterns: Vec<Regex>,
    replacement: Option<String>,
}

impl PatternBlockGuardrail {
    pub fn new<I, S>(name: impl Into<String>, patterns: I) -> Result<Self, BatonError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| BatonError::Configuration(format!("invalid guardrail pattern: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.into(),
            patterns,
            replacement: None,
        })
    }

    /// Replace matches in output instead of blocking it.
    pub fn redacting(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns
            .iter()
            .find_map(|re| re.find(text).map(|m| m.as_str()))
    }
}

#[async_trait]
impl InputGuardrail for PatternBlockGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, input: &str) -> Result<GuardrailResult, BatonError> {
        Ok(match self.first_match(input) {
            Some(hit) => GuardrailResult::reject(format!("blocked pattern found: '{hit}'")),
            None => GuardrailResult::pass(),
        })
    }
}

#[async_trait]
impl OutputGuardrail for PatternBlockGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, output: &str) -> Result<OutputCheck, BatonError> {
        let Some(hit) = self.first_match(output) else {
            return Ok(OutputCheck::Pass);
        };
        Ok(match &self.replacement {
            Some(replacement) => {
                let redacted = self.patterns.iter().fold(output.to_string(), |text, re| {
                    re.replace_all(&text, replacement.as_str()).into_owned()
                });
                OutputCheck::Rewrite(redacted)
            }
            None => OutputCheck::Block(format!("blocked pattern found: '{hit}'")),
        })
    }
}
