//! Core run types for the agent loop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::BatonError;
use crate::handoff::HandoffContext;
use crate::provider::ModelResponse;
use crate::tools::output_to_string;
use crate::types::{Message, ToolCall, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// A tool call requested by the model, correlated to its result by `call_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments exactly as the model produced them.
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall::new(&self.call_id, &self.name, &self.arguments)
    }
}

/// Result of one tool call. Failures are results too, flagged `is_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    /// Value returned by the tool, or `{"error": ...}`.
    pub output: Value,
    /// Text placed in the conversation.
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCallRequest, output: Value) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.name.clone(),
            content: output_to_string(&output),
            output,
            is_error: false,
        }
    }

    pub fn failure(call: &ToolCallRequest, error: &BatonError) -> Self {
        let message = error.to_string();
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.name.clone(),
            output: json!({ "error": message }),
            content: format!("Error: {message}"),
            is_error: true,
        }
    }

    pub fn to_message(&self) -> Message {
        Message::tool_result(&self.call_id, &self.content)
    }
}

/// What the loop does after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStep {
    RunAgain,
    Handoff { target_agent: String },
    FinalOutput { value: String },
}

impl NextStep {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalOutput { .. })
    }
}

/// Immutable record of one step.
///
/// The conversation after the step is `original_input`, then
/// `pre_step_items`, then `new_step_items`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Agent that ran the step.
    pub agent: String,
    pub original_input: Vec<Message>,
    pub model_response: ModelResponse,
    pub pre_step_items: Vec<Message>,
    pub new_step_items: Vec<Message>,
    pub tool_results: Vec<ToolResult>,
    pub next_step: NextStep,
}

impl StepResult {
    /// Every item generated by the run up to and including this step.
    pub fn generated_items(&self) -> Vec<Message> {
        let mut items = self.pre_step_items.clone();
        items.extend(self.new_step_items.iter().cloned());
        items
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: RunId,
    /// Input followed by every generated item.
    pub messages: Vec<Message>,
    pub last_agent: String,
    pub usage: Usage,
    pub turns: usize,
    /// Final text after output guardrails.
    pub final_output: String,
    pub context: HandoffContext,
    /// Agent name to the tools it used, in first-use order.
    pub tool_use: BTreeMap<String, Vec<String>>,
    pub steps: Vec<StepResult>,
}
