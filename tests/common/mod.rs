//! Shared test helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use baton::agent_loop::{RunEvent, RunEventPayload, RunEventSink};
use baton::provider::{ModelResponse, ScriptedProvider};
use baton::tools::{FunctionTool, ToolParameters};
use baton::types::{Message, Usage};
use serde_json::json;

/// A response that only calls a handoff tool.
pub fn handoff_turn(tool_name: &str, call_id: &str, usage: Usage) -> ModelResponse {
    ModelResponse::new(usage).function_call(tool_name, "{}", call_id)
}

/// A response that only carries text.
pub fn final_turn(text: &str, usage: Usage) -> ModelResponse {
    ModelResponse::new(usage).message(text)
}

pub fn scripted(responses: impl IntoIterator<Item = ModelResponse>) -> Arc<ScriptedProvider> {
    let provider = responses
        .into_iter()
        .fold(ScriptedProvider::new(), ScriptedProvider::respond);
    Arc::new(provider)
}

/// `add(a, b)` over integers.
pub fn add_tool() -> FunctionTool {
    FunctionTool::new(
        "add",
        "Add two integers",
        ToolParameters::object()
            .integer("a", "left operand", true)
            .integer("b", "right operand", true)
            .build(),
        |args, _ctx| async move { Ok(json!(args.get_i64("a")? + args.get_i64("b")?)) },
    )
}

/// Collects run events for later inspection.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<RunEvent>>>);

impl EventLog {
    pub fn sink(&self) -> RunEventSink {
        let events = self.0.clone();
        Arc::new(move |event| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<RunEventPayload> {
        self.events().into_iter().map(|e| e.payload).collect()
    }
}

/// A system prompt followed by alternating user/assistant messages of 80
/// characters each, `len` messages in total.
pub fn long_conversation(len: usize) -> Vec<Message> {
    let mut messages = vec![Message::system("You answer questions about tides.")];
    for i in 1..len {
        let text = format!("{i:02} {}", "-".repeat(77));
        messages.push(if i % 2 == 1 {
            Message::user(text)
        } else {
            Message::assistant(text)
        });
    }
    messages
}

pub fn is_truncation_notice(message: &Message) -> bool {
    message.is_system()
        && (message.content.ends_with("were truncated") || message.content.ends_with("was truncated"))
}
