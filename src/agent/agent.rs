//! Agent definition: instructions, model, tools and declared handoffs.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::agent_loop::behavior::ToolUseBehavior;
use crate::error::BatonError;
use crate::guardrail::{InputGuardrail, OutputGuardrail};
use crate::handoff::{Handoff, HANDOFF_TOOL_PREFIX};
use crate::provider::ToolDefinition;
use crate::tools::{Tool, ToolRegistry};

/// A named participant in a run.
///
/// Agents are read-only while a run is in progress. Change tools or
/// handoffs between runs with the explicit `add_*` / `reset_*` methods.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: Option<String>,
    model: String,
    tools: ToolRegistry,
    handoffs: Vec<Handoff>,
    max_turns: Option<usize>,
    input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    tool_use_behavior: ToolUseBehavior,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            model: String::new(),
            tools: ToolRegistry::new(),
            handoffs: Vec::new(),
            max_turns: None,
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            tool_use_behavior: ToolUseBehavior::default(),
        }
    }

    /// System instructions sent ahead of the conversation on every turn.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Model id passed to the provider. Empty lets the provider choose.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.register(Arc::new(tool));
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        for tool in tools {
            self.tools.register(tool);
        }
        self
    }

    pub fn with_handoff(mut self, handoff: impl Into<Handoff>) -> Self {
        self.handoffs.push(handoff.into());
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_input_guardrail(mut self, guardrail: impl InputGuardrail + 'static) -> Self {
        self.input_guardrails.push(Arc::new(guardrail));
        self
    }

    pub fn with_output_guardrail(mut self, guardrail: impl OutputGuardrail + 'static) -> Self {
        self.output_guardrails.push(Arc::new(guardrail));
        self
    }

    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = behavior;
        self
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    pub fn add_handoff(&mut self, handoff: impl Into<Handoff>) {
        self.handoffs.push(handoff.into());
    }

    pub fn reset_tools(&mut self) {
        self.tools = ToolRegistry::new();
    }

    pub fn reset_handoffs(&mut self) {
        self.handoffs.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    pub fn input_guardrails(&self) -> &[Arc<dyn InputGuardrail>] {
        &self.input_guardrails
    }

    pub fn output_guardrails(&self) -> &[Arc<dyn OutputGuardrail>] {
        &self.output_guardrails
    }

    pub fn tool_use_behavior(&self) -> &ToolUseBehavior {
        &self.tool_use_behavior
    }

    /// Ordinary tools followed by one generated tool per declared handoff.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = self.tools.definitions();
        defs.extend(self.handoffs.iter().map(Handoff::definition));
        defs
    }

    /// Reject handoff declarations that cannot work.
    ///
    /// A target missing from the agent set is not checked here; that is a
    /// normal outcome when the handoff is attempted.
    pub fn validate(&self) -> Result<(), BatonError> {
        let mut seen: HashSet<String> = HashSet::new();

        for tool_name in self.tools.names() {
            if tool_name.starts_with(HANDOFF_TOOL_PREFIX) {
                return Err(BatonError::HandoffConstruction(format!(
                    "agent '{}': tool '{tool_name}' uses the reserved '{HANDOFF_TOOL_PREFIX}' prefix",
                    self.name
                )));
            }
        }

        for handoff in &self.handoffs {
            let tool_name = handoff.tool_name();
            if tool_name.len() == HANDOFF_TOOL_PREFIX.len() {
                return Err(BatonError::HandoffConstruction(format!(
                    "agent '{}': handoff target name {:?} is empty",
                    self.name,
                    handoff.target()
                )));
            }
            if handoff.target() == self.name {
                return Err(BatonError::HandoffConstruction(format!(
                    "agent '{}' cannot hand off to itself",
                    self.name
                )));
            }
            if !seen.insert(tool_name.clone()) {
                return Err(BatonError::HandoffConstruction(format!(
                    "agent '{}': handoffs produce duplicate tool name '{tool_name}'",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field(
                "handoffs",
                &self.handoffs.iter().map(Handoff::target).collect::<Vec<_>>(),
            )
            .field("max_turns", &self.max_turns)
            .field("input_guardrails", &self.input_guardrails.len())
            .field("output_guardrails", &self.output_guardrails.len())
            .field("tool_use_behavior", &self.tool_use_behavior)
            .finish()
    }
}
