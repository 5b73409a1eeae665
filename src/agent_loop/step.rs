//! Step executor: one provider turn and everything it triggers.

use super::behavior::{ToolUseContext, ToolUseVerdict};
use super::classify::{classify, ClassifiedResponse};
use super::dispatch::ToolDispatcher;
use super::events::{RunEventEmitter, RunEventPayload};
use super::tracker::ToolUseTracker;
use super::types::{NextStep, RunId, StepResult, ToolCallRequest, ToolResult};
use crate::agent::{Agent, AgentSet};
use crate::config::RunConfig;
use crate::context::ContextWindowManager;
use crate::error::BatonError;
use crate::handoff::{HandoffContext, HandoffCoordinator, Resolution};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::ToolContext;
use crate::types::{Message, Usage};

/// Mutable state of one run, threaded through every step.
#[derive(Debug, Clone)]
pub struct RunState {
    run_id: RunId,
    original_input: Vec<Message>,
    generated: Vec<Message>,
    handoff_context: HandoffContext,
    tracker: ToolUseTracker,
    usage: Usage,
}

impl RunState {
    pub fn new(run_id: RunId, input: Vec<Message>, entry_agent: &str) -> Self {
        Self {
            run_id,
            original_input: input,
            generated: Vec::new(),
            handoff_context: HandoffContext::new(entry_agent),
            tracker: ToolUseTracker::new(),
            usage: Usage::default(),
        }
    }

    pub fn with_handoff_context(mut self, context: HandoffContext) -> Self {
        self.handoff_context = context;
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn original_input(&self) -> &[Message] {
        &self.original_input
    }

    pub fn generated(&self) -> &[Message] {
        &self.generated
    }

    /// Input followed by every generated item.
    pub fn conversation(&self) -> Vec<Message> {
        let mut all = self.original_input.clone();
        all.extend(self.generated.iter().cloned());
        all
    }

    pub fn handoff_context(&self) -> &HandoffContext {
        &self.handoff_context
    }

    pub fn tracker(&self) -> &ToolUseTracker {
        &self.tracker
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub(crate) fn into_parts(self) -> (Vec<Message>, HandoffContext, ToolUseTracker, Usage) {
        let mut messages = self.original_input;
        messages.extend(self.generated);
        (messages, self.handoff_context, self.tracker, self.usage)
    }
}

/// Runs single steps against a provider.
pub struct StepExecutor<'a> {
    provider: &'a dyn ModelProvider,
    window: &'a ContextWindowManager,
    config: &'a RunConfig,
    events: Option<&'a RunEventEmitter>,
    coordinator: HandoffCoordinator,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        provider: &'a dyn ModelProvider,
        window: &'a ContextWindowManager,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            provider,
            window,
            config,
            events: None,
            coordinator: HandoffCoordinator::new(),
        }
    }

    pub(crate) fn with_events(mut self, events: &'a RunEventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, payload: RunEventPayload) {
        if let Some(events) = self.events {
            events.emit(payload);
        }
    }

    /// Trim, call the provider, classify, then dispatch tools or resolve a
    /// handoff.
    ///
    /// Only the first handoff call of a turn is honored. Later handoff calls
    /// and any ordinary tool calls in that turn are dropped. An unresolved
    /// handoff leaves the agent in place and answers the call with an error
    /// result so the model can recover.
    pub async fn execute_step(
        &self,
        agent: &Agent,
        agents: &AgentSet,
        state: &mut RunState,
    ) -> Result<StepResult, BatonError> {
        let mut prompt = Vec::with_capacity(state.original_input.len() + state.generated.len() + 1);
        if let Some(instructions) = agent.instructions() {
            prompt.push(Message::system(instructions));
        }
        prompt.extend(state.original_input.iter().cloned());
        prompt.extend(state.generated.iter().cloned());
        let messages = self.window.trim(&prompt).await;

        let request = ProviderRequest {
            messages,
            model: agent.model().to_string(),
            tools: agent.tool_definitions(),
        };
        let response = self.provider.complete(&request).await?;
        let classified = classify(&response)?;

        if classified.is_empty() {
            return Err(BatonError::Validation(
                "response contained no output items".into(),
            ));
        }

        state.usage.merge(&response.usage);
        let pre_step_items = state.generated.clone();

        let (new_step_items, tool_results, next_step) = if !classified.handoff_calls.is_empty() {
            self.handle_handoff(agent, agents, &classified, state)?
        } else if !classified.tool_calls.is_empty() {
            self.handle_tools(agent, &classified, state).await
        } else {
            let text = classified.text();
            let items = classified
                .messages
                .into_iter()
                .map(|m| m.with_name(agent.name()))
                .collect();
            (items, Vec::new(), NextStep::FinalOutput { value: text })
        };

        state.generated.extend(new_step_items.iter().cloned());

        tracing::debug!(
            agent = agent.name(),
            items = new_step_items.len(),
            next = ?next_step,
            "step complete"
        );

        Ok(StepResult {
            agent: agent.name().to_string(),
            original_input: state.original_input.clone(),
            model_response: response,
            pre_step_items,
            new_step_items,
            tool_results,
            next_step,
        })
    }

    fn handle_handoff(
        &self,
        agent: &Agent,
        agents: &AgentSet,
        classified: &ClassifiedResponse,
        state: &mut RunState,
    ) -> Result<(Vec<Message>, Vec<ToolResult>, NextStep), BatonError> {
        let call = &classified.handoff_calls[0];
        let dropped = classified.handoff_calls.len() - 1 + classified.tool_calls.len();
        if dropped > 0 {
            tracing::debug!(
                agent = agent.name(),
                handoff = %call.name,
                dropped,
                "ignoring other calls in handoff turn"
            );
        }

        let assistant = Message::assistant_with_tool_calls(classified.text(), vec![call.to_tool_call()])
            .with_name(agent.name());

        let (result, next_step) = match self.coordinator.resolve(&call.name, agent, agents) {
            Resolution::Resolved { handoff, target } => {
                let tool = handoff.to_tool();
                let payload = tool.stage(&call.arguments);
                self.coordinator
                    .execute(agent, target, handoff, payload, &mut state.handoff_context)?;
                self.emit(RunEventPayload::HandoffCompleted {
                    from: agent.name().to_string(),
                    to: target.name().to_string(),
                });
                (
                    ToolResult::success(call, tool.acknowledge()),
                    NextStep::Handoff {
                        target_agent: target.name().to_string(),
                    },
                )
            }
            Resolution::NotFound { requested } => {
                tracing::warn!(
                    agent = agent.name(),
                    requested = %requested,
                    "handoff target not available"
                );
                self.emit(RunEventPayload::HandoffRejected {
                    agent: agent.name().to_string(),
                    requested: requested.clone(),
                });
                let error = BatonError::ToolExecution {
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    message: format!(
                        "handoff target '{requested}' is not available to agent '{}'",
                        agent.name()
                    ),
                };
                (ToolResult::failure(call, &error), NextStep::RunAgain)
            }
        };

        state.tracker.record(agent.name(), [call.name.as_str()]);
        let items = vec![assistant, result.to_message()];
        Ok((items, vec![result], next_step))
    }

    async fn handle_tools(
        &self,
        agent: &Agent,
        classified: &ClassifiedResponse,
        state: &mut RunState,
    ) -> (Vec<Message>, Vec<ToolResult>, NextStep) {
        let calls = &classified.tool_calls;
        let assistant = Message::assistant_with_tool_calls(
            classified.text(),
            calls.iter().map(ToolCallRequest::to_tool_call).collect(),
        )
        .with_name(agent.name());

        for call in calls {
            self.emit(RunEventPayload::ToolCalled {
                agent: agent.name().to_string(),
                call_id: call.call_id.clone(),
                tool_name: call.name.clone(),
            });
        }

        let ctx = ToolContext {
            run_id: Some(state.run_id),
            agent_name: agent.name().to_string(),
            tool_call_id: String::new(),
        };
        let results = ToolDispatcher::new(agent.tools())
            .with_parallel(self.config.parallel_tool_calls)
            .with_argument_validation(self.config.validate_tool_arguments)
            .dispatch(calls, &ctx)
            .await;

        for result in &results {
            self.emit(RunEventPayload::ToolCompleted {
                agent: agent.name().to_string(),
                call_id: result.call_id.clone(),
                tool_name: result.tool_name.clone(),
                is_error: result.is_error,
            });
        }
        state
            .tracker
            .record(agent.name(), calls.iter().map(|c| c.name.as_str()));

        let mut items = Vec::with_capacity(results.len() + 1);
        items.push(assistant);
        items.extend(results.iter().map(ToolResult::to_message));

        let mut conversation = state.conversation();
        conversation.extend(items.iter().cloned());
        let verdict = agent.tool_use_behavior().decide(&ToolUseContext {
            agent,
            calls,
            results: &results,
            conversation: &conversation,
        });

        let next_step = match verdict {
            ToolUseVerdict::Continue => NextStep::RunAgain,
            ToolUseVerdict::Done { final_output } => NextStep::FinalOutput {
                value: final_output
                    .or_else(|| results.last().map(|r| r.content.clone()))
                    .unwrap_or_default(),
            },
        };
        (items, results, next_step)
    }
}
