//! Tool dispatch.
//!
//! Every failure local to one call (unknown tool, undecodable or invalid
//! arguments, the tool returning an error) becomes an error [`ToolResult`]
//! so the agent can react to it on its next turn.

use futures::future::join_all;

use super::types::{ToolCallRequest, ToolResult};
use crate::error::BatonError;
use crate::tools::validation::validate_value;
use crate::tools::{Tool, ToolArguments, ToolContext, ToolRegistry};

/// Executes ordinary tool calls against an agent's registry.
#[derive(Debug)]
pub struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
    parallel: bool,
    validate_arguments: bool,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            parallel: true,
            validate_arguments: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_argument_validation(mut self, validate: bool) -> Self {
        self.validate_arguments = validate;
        self
    }

    /// Run `calls` and return one result per call, in call order.
    pub async fn dispatch(&self, calls: &[ToolCallRequest], ctx: &ToolContext) -> Vec<ToolResult> {
        if self.parallel {
            join_all(calls.iter().map(|call| self.dispatch_one(call, ctx))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch_one(call, ctx).await);
            }
            results
        }
    }

    async fn dispatch_one(&self, call: &ToolCallRequest, ctx: &ToolContext) -> ToolResult {
        let ctx = ToolContext {
            tool_call_id: call.call_id.clone(),
            ..ctx.clone()
        };

        let outcome = match self.registry.get(&call.name) {
            Some(tool) => self.invoke(tool.as_ref(), call, &ctx).await,
            None => Err(format!("unknown tool '{}'", call.name)),
        };

        match outcome {
            Ok(value) => {
                tracing::debug!(tool = %call.name, call_id = %call.call_id, "tool completed");
                ToolResult::success(call, value)
            }
            Err(message) => {
                let error = BatonError::ToolExecution {
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    message,
                };
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.call_id,
                    agent = %ctx.agent_name,
                    error = %error,
                    "tool call failed"
                );
                ToolResult::failure(call, &error)
            }
        }
    }

    async fn invoke(
        &self,
        tool: &dyn Tool,
        call: &ToolCallRequest,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, String> {
        let args = ToolArguments::parse(&call.arguments)
            .map_err(|e| format!("invalid arguments: {e}"))?;

        if self.validate_arguments {
            let schema = tool.parameters().schema;
            validate_value(args.as_value(), &schema)
                .map_err(|violation| format!("invalid arguments: {violation}"))?;
        }

        tool.execute(&args, ctx).await.map_err(|e| e.to_string())
    }
}
