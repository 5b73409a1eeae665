//! Response classification.

use std::collections::HashSet;

use super::types::ToolCallRequest;
use crate::error::BatonError;
use crate::handoff::HANDOFF_TOOL_PREFIX;
use crate::provider::{ModelResponse, OutputItem};
use crate::types::Message;

/// A provider response split by what the step executor must do with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedResponse {
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCallRequest>,
    /// Calls to generated `transfer_to_*` tools, in output order.
    pub handoff_calls: Vec<ToolCallRequest>,
}

impl ClassifiedResponse {
    /// Text of all message items, joined by newlines.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.tool_calls.is_empty() && self.handoff_calls.is_empty()
    }
}

/// Partition a response into messages, ordinary tool calls and handoff calls.
///
/// Function calls with an empty name or call id, or reusing a call id, are
/// rejected with [`BatonError::Validation`].
pub fn classify(response: &ModelResponse) -> Result<ClassifiedResponse, BatonError> {
    let mut classified = ClassifiedResponse::default();
    let mut seen_ids = HashSet::new();

    for item in &response.output {
        match item {
            OutputItem::Message { role, content } => {
                classified.messages.push(Message::new(*role, content.clone()))
            }
            OutputItem::FunctionCall {
                name,
                arguments,
                call_id,
            } => {
                if name.trim().is_empty() {
                    return Err(BatonError::Validation(format!(
                        "function call '{call_id}' has an empty name"
                    )));
                }
                if call_id.trim().is_empty() {
                    return Err(BatonError::Validation(format!(
                        "function call '{name}' has an empty call_id"
                    )));
                }
                if !seen_ids.insert(call_id.as_str()) {
                    return Err(BatonError::Validation(format!(
                        "duplicate call_id '{call_id}'"
                    )));
                }

                let call = ToolCallRequest {
                    call_id: call_id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                };
                if name.starts_with(HANDOFF_TOOL_PREFIX) {
                    classified.handoff_calls.push(call);
                } else {
                    classified.tool_calls.push(call);
                }
            }
        }
    }

    Ok(classified)
}
