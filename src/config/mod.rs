//! Run configuration (layered: code > env > file).

use std::path::Path;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::context::{ContextConfig, ContextStrategy};
use crate::error::BatonError;

/// Turn budget used when neither the config nor the entry agent sets one.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Settings for one run. Immutable once the run starts.
///
/// ```
/// use baton::config::RunConfig;
///
/// let config: RunConfig = RunConfig::from_toml_str(r#"
///     max_turns = 6
///     [context]
///     strategy = "message_count"
///     max_messages = 20
/// "#).unwrap();
/// assert_eq!(config.max_turns, Some(6));
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Overrides the entry agent's `max_turns`.
    pub max_turns: Option<usize>,
    /// Run the tool calls of one turn concurrently.
    #[builder(default = true)]
    pub parallel_tool_calls: bool,
    /// Check tool arguments against each tool's schema before executing.
    #[builder(default)]
    pub validate_tool_arguments: bool,
    #[builder(default)]
    pub context: ContextConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: None,
            parallel_tool_calls: true,
            validate_tool_arguments: false,
            context: ContextConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from `BATON_*` environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self, BatonError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BatonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<usize, _>(&lookup, "BATON_MAX_TURNS")? {
            config.max_turns = Some(v);
        }
        if let Some(v) = parse_bool(&lookup, "BATON_PARALLEL_TOOL_CALLS")? {
            config.parallel_tool_calls = v;
        }
        if let Some(v) = parse_bool(&lookup, "BATON_VALIDATE_TOOL_ARGUMENTS")? {
            config.validate_tool_arguments = v;
        }
        if let Some(v) = parse_var::<ContextStrategy, _>(&lookup, "BATON_CONTEXT_STRATEGY")? {
            config.context.strategy = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "BATON_CONTEXT_MAX_TOKENS")? {
            config.context.max_tokens = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "BATON_CONTEXT_MAX_MESSAGES")? {
            config.context.max_messages = v;
        }
        if let Some(v) = parse_bool(&lookup, "BATON_CONTEXT_PRESERVE_SYSTEM")? {
            config.context.preserve_system = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "BATON_CONTEXT_PRESERVE_RECENT")? {
            config.context.preserve_recent = v;
        }

        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, BatonError> {
        toml::from_str(raw).map_err(|e| BatonError::Configuration(format!("invalid TOML: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BatonError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Turn budget for a run entered through `entry`.
    pub fn effective_max_turns(&self, entry: &Agent) -> usize {
        self.max_turns
            .or(entry.max_turns())
            .unwrap_or(DEFAULT_MAX_TURNS)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, BatonError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BatonError::Configuration(format!("{key}={raw:?}: {e}"))),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, BatonError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(BatonError::Configuration(format!(
            "{key}={raw:?}: expected a boolean"
        ))),
    }
}
