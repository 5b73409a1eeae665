//! Handoffs: declared transfers of control between agents.
//!
//! Each [`Handoff`] an agent declares becomes a `transfer_to_<target>` tool the
//! model can call. Calling that tool only stages the transfer; the step
//! executor resolves the target and the [`HandoffCoordinator`] applies it.

mod context;
mod coordinator;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::BatonError;
use crate::provider::ToolDefinition;
use crate::tools::validation::validate_value;
use crate::tools::{ToolArguments, ToolParameters};

pub use context::{HandoffContext, HandoffRecord};
pub use coordinator::{HandoffCoordinator, Resolution};

/// Name prefix reserved for generated handoff tools.
pub const HANDOFF_TOOL_PREFIX: &str = "transfer_to_";

/// Rewrites a payload before it is merged into shared context.
pub type InputFilter = Arc<dyn Fn(HandoffPayload) -> HandoffPayload + Send + Sync>;

/// Called after a handoff is applied. Errors abort the run.
pub type OnHandoff = Arc<dyn Fn(&HandoffPayload) -> Result<(), BatonError> + Send + Sync>;

/// A handoff target declared on an agent.
#[derive(Clone)]
pub struct Handoff {
    target: String,
    description: Option<String>,
    data_contract: Option<Value>,
    input_filter: Option<InputFilter>,
    on_handoff: Option<OnHandoff>,
}

impl Handoff {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            description: None,
            data_contract: None,
            input_filter: None,
            on_handoff: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// JSON schema describing the payload the target expects.
    ///
    /// Replaces the default `{data, reason}` tool schema. It is shown to the
    /// model but never enforced; use [`validate_payload`] inside an input
    /// filter for strict checking.
    pub fn with_data_contract(mut self, schema: Value) -> Self {
        self.data_contract = Some(schema);
        self
    }

    pub fn with_input_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(HandoffPayload) -> HandoffPayload + Send + Sync + 'static,
    {
        self.input_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_on_handoff<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandoffPayload) -> Result<(), BatonError> + Send + Sync + 'static,
    {
        self.on_handoff = Some(Arc::new(hook));
        self
    }

    /// Name of the target agent.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Name of the generated tool, `transfer_to_<snake_case(target)>`.
    pub fn tool_name(&self) -> String {
        format!("{HANDOFF_TOOL_PREFIX}{}", snake_case(&self.target))
    }

    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Transfer the conversation to the {} agent.", self.target))
    }

    pub fn data_contract(&self) -> Option<&Value> {
        self.data_contract.as_ref()
    }

    pub fn parameters(&self) -> ToolParameters {
        match &self.data_contract {
            Some(schema) => ToolParameters::from_schema(schema.clone()),
            None => ToolParameters::from_schema(default_schema()),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name(),
            description: self.description(),
            parameters: self.parameters().schema,
        }
    }

    /// Build the tool the model calls to request this handoff.
    pub fn to_tool(&self) -> HandoffTool {
        HandoffTool {
            handoff: self.clone(),
            name: self.tool_name(),
        }
    }

    pub(crate) fn filter(&self, payload: HandoffPayload) -> HandoffPayload {
        match &self.input_filter {
            Some(filter) => filter(payload),
            None => payload,
        }
    }

    pub(crate) fn notify(&self, payload: &HandoffPayload) -> Result<(), BatonError> {
        match &self.on_handoff {
            Some(hook) => hook(payload),
            None => Ok(()),
        }
    }
}

impl From<&str> for Handoff {
    fn from(target: &str) -> Self {
        Self::new(target)
    }
}

impl From<String> for Handoff {
    fn from(target: String) -> Self {
        Self::new(target)
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("target", &self.target)
            .field("description", &self.description)
            .field("data_contract", &self.data_contract)
            .field("input_filter", &self.input_filter.is_some())
            .field("on_handoff", &self.on_handoff.is_some())
            .finish()
    }
}

fn default_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "data": {
                "type": "object",
                "description": "Structured context for the receiving agent"
            },
            "reason": {
                "type": "string",
                "description": "Why the conversation is being transferred"
            }
        }
    })
}

/// Data carried across a handoff.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HandoffPayload {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HandoffPayload {
    /// Build a payload from decoded tool arguments.
    ///
    /// `{data: {...}, reason}` is taken apart as-is. Any other object (for
    /// instance arguments shaped by a data contract) becomes `data` whole,
    /// minus a string `reason` key.
    pub fn from_arguments(args: &Value) -> Self {
        let Some(obj) = args.as_object() else {
            return Self::default();
        };
        let reason = obj.get("reason").and_then(Value::as_str).map(str::to_string);

        if let Some(Value::Object(data)) = obj.get("data") {
            return Self {
                data: data.clone(),
                reason,
            };
        }

        let mut data = obj.clone();
        if reason.is_some() {
            data.remove("reason");
        }
        Self { data, reason }
    }
}

/// Tool form of a [`Handoff`]. Calling it always succeeds: it stages the
/// payload and acknowledges the transfer. Whether the target exists is
/// decided later by the coordinator.
#[derive(Debug, Clone)]
pub struct HandoffTool {
    handoff: Handoff,
    name: String,
}

impl HandoffTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }

    /// Tool result returned to the model for an applied handoff.
    pub fn acknowledge(&self) -> Value {
        json!({ "assistant": self.handoff.target })
    }

    /// Decode the payload the model supplied with a handoff call.
    ///
    /// Malformed JSON yields an empty payload; the transfer still happens.
    pub fn stage(&self, raw_arguments: &str) -> HandoffPayload {
        match ToolArguments::parse(raw_arguments) {
            Ok(args) => HandoffPayload::from_arguments(args.as_value()),
            Err(e) => {
                tracing::warn!(tool = %self.name, error = %e, "handoff arguments are not valid JSON");
                HandoffPayload::default()
            }
        }
    }
}

/// Check a payload against the handoff's data contract, if it has one.
pub fn validate_payload(handoff: &Handoff, payload: &HandoffPayload) -> Result<(), BatonError> {
    let Some(schema) = handoff.data_contract() else {
        return Ok(());
    };
    validate_value(&Value::Object(payload.data.clone()), schema).map_err(|violation| {
        BatonError::Validation(format!(
            "payload for handoff to '{}' violates its data contract: {violation}",
            handoff.target
        ))
    })
}

/// Convert an agent name into the snake_case form used in tool names.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !out.ends_with('_') {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
