//! Normalization of raw provider JSON into [`ModelResponse`].
//!
//! Accepted shape:
//!
//! ```json
//! {
//!   "output": [
//!     {"type": "message", "role": "assistant", "content": "..."},
//!     {"type": "function_call", "name": "search", "arguments": "{}", "call_id": "c1"}
//!   ],
//!   "usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 15}
//! }
//! ```
//!
//! Message content may also be a list of `{"type": "output_text" | "text", "text": ...}`
//! parts, which are concatenated. Anything else is a [`BatonError::Validation`].

use serde_json::{Map, Value};

use super::{ModelResponse, OutputItem};
use crate::error::BatonError;
use crate::types::{Role, Usage};

/// Parse and validate a raw provider response.
pub fn parse_response(raw: &Value) -> Result<ModelResponse, BatonError> {
    let root = raw
        .as_object()
        .ok_or_else(|| invalid("response is not a JSON object"))?;
    let items = root
        .get("output")
        .ok_or_else(|| invalid("missing 'output'"))?
        .as_array()
        .ok_or_else(|| invalid("'output' is not an array"))?;

    let output = items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_item(idx, item))
        .collect::<Result<Vec<_>, _>>()?;

    let usage = match root.get("usage") {
        None | Some(Value::Null) => Usage::default(),
        Some(value) => parse_usage(value)?,
    };

    Ok(ModelResponse { output, usage })
}

/// Parse a response from its JSON text.
pub fn parse_response_str(raw: &str) -> Result<ModelResponse, BatonError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| invalid(format!("response is not JSON: {e}")))?;
    parse_response(&value)
}

fn parse_item(idx: usize, item: &Value) -> Result<OutputItem, BatonError> {
    let obj = item
        .as_object()
        .ok_or_else(|| invalid(format!("output[{idx}] is not an object")))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("output[{idx}] missing 'type'")))?;

    match kind {
        "message" => {
            let role = match obj.get("role").and_then(Value::as_str) {
                None => Role::Assistant,
                Some(role) => role
                    .parse::<Role>()
                    .map_err(|_| invalid(format!("output[{idx}] has unknown role '{role}'")))?,
            };
            let content = parse_content(idx, obj.get("content"))?;
            Ok(OutputItem::Message { role, content })
        }
        "function_call" => Ok(OutputItem::FunctionCall {
            name: required_str(idx, obj, "name")?,
            arguments: required_str(idx, obj, "arguments")?,
            call_id: required_str(idx, obj, "call_id")?,
        }),
        other => Err(invalid(format!("output[{idx}] has unknown type '{other}'"))),
    }
}

fn parse_content(idx: usize, content: Option<&Value>) -> Result<String, BatonError> {
    match content {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Array(parts)) => {
            let mut text = String::new();
            for (part_idx, part) in parts.iter().enumerate() {
                let kind = part.get("type").and_then(Value::as_str);
                match (kind, part.get("text").and_then(Value::as_str)) {
                    (Some("output_text" | "text"), Some(t)) => text.push_str(t),
                    (Some("refusal"), _) => {}
                    _ => {
                        return Err(invalid(format!(
                            "output[{idx}].content[{part_idx}] is not a text part"
                        )))
                    }
                }
            }
            Ok(text)
        }
        Some(_) => Err(invalid(format!("output[{idx}].content has unsupported type"))),
    }
}

fn required_str(idx: usize, obj: &Map<String, Value>, key: &str) -> Result<String, BatonError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(format!("output[{idx}].{key} must be a string"))),
        None => Err(invalid(format!("output[{idx}] missing '{key}'"))),
    }
}

fn parse_usage(value: &Value) -> Result<Usage, BatonError> {
    let mut usage: Usage = serde_json::from_value(value.clone())
        .map_err(|e| invalid(format!("malformed 'usage': {e}")))?;
    if usage.total_tokens == 0 {
        usage.total_tokens = usage.input_tokens.saturating_add(usage.output_tokens);
    }
    Ok(usage)
}

fn invalid(message: impl Into<String>) -> BatonError {
    BatonError::Validation(message.into())
}
