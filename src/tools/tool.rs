//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::BatonError;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub run_id: Option<Uuid>,
    /// Agent that requested the call.
    pub agent_name: String,
    pub tool_call_id: String,
}

/// Core tool trait. Implement it to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema for the tool's input.
    ///
    /// Optional capability: tools that take no structured input keep the
    /// default, an empty object schema.
    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
    }

    /// Execute the tool with decoded arguments.
    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<Value, BatonError>;
}

/// Render a tool's return value as conversation text.
pub fn output_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

type ToolHandler = dyn Fn(ToolArguments, ToolContext) -> Pin<Box<dyn Future<Output = Result<Value, BatonError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool from an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BatonError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> ToolParameters {
        self.parameters.clone()
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<Value, BatonError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Clock;

    #[async_trait]
    impl Tool for Clock {
        fn name(&self) -> &str {
            "clock"
        }

        async fn execute(&self, _args: &ToolArguments, _ctx: &ToolContext) -> Result<Value, BatonError> {
            Ok(json!("12:00"))
        }
    }

    #[test]
    fn tools_without_schema_advertise_empty_object() {
        assert_eq!(Clock.parameters(), ToolParameters::empty());
        assert_eq!(Clock.description(), "");
    }

    #[test]
    fn string_outputs_are_not_quoted() {
        assert_eq!(output_to_string(&json!("plain")), "plain");
        assert_eq!(output_to_string(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(output_to_string(&json!(3.5)), "3.5");
    }

    #[tokio::test]
    async fn function_tool_forwards_arguments_and_context() {
        let tool = FunctionTool::new(
            "echo",
            "Echo the text back",
            ToolParameters::object().string("text", "Text", true).build(),
            |args, ctx| async move {
                Ok(json!(format!("{}:{}", ctx.agent_name, args.get_str("text")?)))
            },
        );
        let ctx = ToolContext {
            agent_name: "Primary".into(),
            ..Default::default()
        };
        let out = tool
            .execute(&ToolArguments::new(json!({"text": "hi"})), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!("Primary:hi"));
    }
}
