//! Tool-use behavior: whether a turn that ran tools ends the run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::types::{ToolCallRequest, ToolResult};
use crate::agent::Agent;
use crate::tools::output_to_string;
use crate::types::Message;

/// Builds the final output from a turn's tool results.
pub type FinalOutputExtractor = Arc<dyn Fn(&[ToolResult]) -> String + Send + Sync>;

/// Caller-supplied policy.
pub type CustomBehaviorFn = Arc<dyn Fn(&ToolUseContext<'_>) -> ToolUseVerdict + Send + Sync>;

/// Everything a policy can look at after a batch of tool calls.
#[derive(Debug, Clone, Copy)]
pub struct ToolUseContext<'a> {
    pub agent: &'a Agent,
    pub calls: &'a [ToolCallRequest],
    pub results: &'a [ToolResult],
    /// Conversation including this turn's tool results.
    pub conversation: &'a [Message],
}

/// Decision reached by a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolUseVerdict {
    Continue,
    /// End the run. Without an explicit output the last tool result's text
    /// becomes the final output.
    Done { final_output: Option<String> },
}

impl ToolUseVerdict {
    pub fn done(final_output: impl Into<String>) -> Self {
        Self::Done {
            final_output: Some(final_output.into()),
        }
    }

    /// Interpret a loosely typed policy answer.
    ///
    /// A boolean means "done". An object may carry `done`, `continue` and
    /// `final_output`. Anything else means continue.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(done) => Self::from(*done),
            Value::Object(obj) => {
                let done = match (obj.get("done"), obj.get("continue")) {
                    (Some(Value::Bool(done)), _) => *done,
                    (_, Some(Value::Bool(cont))) => !cont,
                    _ => false,
                };
                if !done {
                    return Self::Continue;
                }
                let final_output = match obj.get("final_output") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(output_to_string(v)),
                };
                Self::Done { final_output }
            }
            _ => Self::Continue,
        }
    }
}

impl From<bool> for ToolUseVerdict {
    fn from(done: bool) -> Self {
        if done {
            Self::Done { final_output: None }
        } else {
            Self::Continue
        }
    }
}

/// Policy applied after an agent's tool calls have run.
#[derive(Clone, Default)]
pub enum ToolUseBehavior {
    /// Always give the results back to the model.
    #[default]
    RunLlmAgain,
    /// End the run after the first batch; the first result is the output.
    StopOnFirstTool,
    /// End the run if any called tool is in the set.
    StopAtTools(HashSet<String>),
    /// End the run if any called tool is in the set, with the output built
    /// by the extractor.
    ToolsToFinalOutput {
        tools: HashSet<String>,
        extractor: FinalOutputExtractor,
    },
    Custom(CustomBehaviorFn),
}

impl ToolUseBehavior {
    pub fn stop_at_tools<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::StopAtTools(names.into_iter().map(Into::into).collect())
    }

    pub fn tools_to_final_output<I, S, F>(names: I, extractor: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[ToolResult]) -> String + Send + Sync + 'static,
    {
        Self::ToolsToFinalOutput {
            tools: names.into_iter().map(Into::into).collect(),
            extractor: Arc::new(extractor),
        }
    }

    pub fn custom<F>(policy: F) -> Self
    where
        F: Fn(&ToolUseContext<'_>) -> ToolUseVerdict + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(policy))
    }

    pub fn decide(&self, ctx: &ToolUseContext<'_>) -> ToolUseVerdict {
        match self {
            Self::RunLlmAgain => ToolUseVerdict::Continue,
            Self::StopOnFirstTool => match ctx.results.first() {
                Some(first) => ToolUseVerdict::done(first.content.clone()),
                None => ToolUseVerdict::Continue,
            },
            Self::StopAtTools(names) => ctx
                .results
                .iter()
                .find(|r| names.contains(&r.tool_name))
                .map_or(ToolUseVerdict::Continue, |hit| {
                    ToolUseVerdict::done(hit.content.clone())
                }),
            Self::ToolsToFinalOutput { tools, extractor } => {
                if ctx.calls.iter().any(|c| tools.contains(&c.name)) {
                    ToolUseVerdict::done(extractor(ctx.results))
                } else {
                    ToolUseVerdict::Continue
                }
            }
            Self::Custom(policy) => policy(ctx),
        }
    }
}

impl fmt::Debug for ToolUseBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunLlmAgain => f.write_str("RunLlmAgain"),
            Self::StopOnFirstTool => f.write_str("StopOnFirstTool"),
            Self::StopAtTools(names) => f.debug_tuple("StopAtTools").field(names).finish(),
            Self::ToolsToFinalOutput { tools, .. } => f
                .debug_struct("ToolsToFinalOutput")
                .field("tools", tools)
                .finish_non_exhaustive(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            call_id: id.into(),
            name: name.into(),
            arguments: "{}".into(),
        }
    }

    fn result(id: &str, name: &str, content: &str) -> ToolResult {
        ToolResult::success(&call(id, name), json!(content))
    }

    fn decide(behavior: &ToolUseBehavior) -> ToolUseVerdict {
        let agent = Agent::new("A");
        let calls = [call("c1", "search"), call("c2", "finish")];
        let results = [result("c1", "search", "found"), result("c2", "finish", "report")];
        behavior.decide(&ToolUseContext {
            agent: &agent,
            calls: &calls,
            results: &results,
            conversation: &[],
        })
    }

    #[test]
    fn default_runs_again() {
        assert_eq!(decide(&ToolUseBehavior::default()), ToolUseVerdict::Continue);
    }

    #[test]
    fn stop_on_first_tool_uses_first_result() {
        assert_eq!(
            decide(&ToolUseBehavior::StopOnFirstTool),
            ToolUseVerdict::done("found")
        );
    }

    #[test]
    fn stop_at_named_tools() {
        assert_eq!(
            decide(&ToolUseBehavior::stop_at_tools(["finish"])),
            ToolUseVerdict::done("report")
        );
        assert_eq!(
            decide(&ToolUseBehavior::stop_at_tools(["other"])),
            ToolUseVerdict::Continue
        );
    }

    #[test]
    fn tools_to_final_output_uses_extractor() {
        let behavior = ToolUseBehavior::tools_to_final_output(["search"], |results| {
            results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("+")
        });
        assert_eq!(decide(&behavior), ToolUseVerdict::done("found+report"));
    }

    #[test]
    fn custom_sees_calls_and_agent() {
        let behavior = ToolUseBehavior::custom(|ctx| {
            (ctx.agent.name() == "A" && ctx.calls.len() == 2).into()
        });
        assert_eq!(decide(&behavior), ToolUseVerdict::Done { final_output: None });
    }

    #[test]
    fn loose_values_are_interpreted() {
        assert_eq!(ToolUseVerdict::from_value(&json!(true)), ToolUseVerdict::Done { final_output: None });
        assert_eq!(ToolUseVerdict::from_value(&json!(false)), ToolUseVerdict::Continue);
        assert_eq!(
            ToolUseVerdict::from_value(&json!({"done": true, "final_output": {"n": 1}})),
            ToolUseVerdict::done(r#"{"n":1}"#)
        );
        assert_eq!(
            ToolUseVerdict::from_value(&json!({"continue": false})),
            ToolUseVerdict::Done { final_output: None }
        );
        assert_eq!(ToolUseVerdict::from_value(&json!("stop")), ToolUseVerdict::Continue);
        assert_eq!(ToolUseVerdict::from_value(&json!(42)), ToolUseVerdict::Continue);
    }
}
