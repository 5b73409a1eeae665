//! Runner: drives steps until a final output, an error or the turn budget.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::events::{RunEventEmitter, RunEventPayload, RunEventSink};
use super::step::{RunState, StepExecutor};
use super::types::{NextStep, RunResult};
use crate::agent::AgentSet;
use crate::config::RunConfig;
use crate::context::{ContextWindowManager, Summarizer, TokenEstimator};
use crate::error::BatonError;
use crate::guardrail::GuardrailRunner;
use crate::handoff::HandoffContext;
use crate::provider::ModelProvider;
use crate::stop::{RunProgress, StopCondition};
use crate::types::{Message, Role};

/// Input to a run: plain text or a prepared message list.
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    Text(String),
    Messages(Vec<Message>),
}

impl RunInput {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Text(text) => vec![Message::user(text)],
            Self::Messages(messages) => messages,
        }
    }
}

impl From<&str> for RunInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RunInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Message>> for RunInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

/// Executes runs against one provider.
///
/// A runner holds no per-run state, so one instance can serve concurrent
/// runs.
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn ModelProvider>,
    config: RunConfig,
    estimator: Option<Arc<dyn TokenEstimator>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    stop: Option<Arc<dyn StopCondition>>,
    event_sink: Option<RunEventSink>,
}

impl Runner {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            config: RunConfig::default(),
            estimator: None,
            summarizer: None,
            stop: None,
            event_sink: None,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_token_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Polled once before every turn.
    pub fn with_stop_condition(mut self, stop: Arc<dyn StopCondition>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `input` starting at the entry agent of `agents`.
    pub async fn run(
        &self,
        agents: &AgentSet,
        input: impl Into<RunInput>,
    ) -> Result<RunResult, BatonError> {
        self.run_with_context(agents, input, HandoffContext::new(agents.entry().name()))
            .await
    }

    /// Like [`Runner::run`], seeding the run's shared handoff context.
    ///
    /// The run always starts at the entry agent, whatever agent the seeded
    /// context names.
    pub async fn run_with_context(
        &self,
        agents: &AgentSet,
        input: impl Into<RunInput>,
        context: HandoffContext,
    ) -> Result<RunResult, BatonError> {
        let run_id = Uuid::new_v4();
        let events = RunEventEmitter::new(run_id, self.event_sink.clone());
        events.emit(RunEventPayload::RunStarted {
            agent: agents.entry().name().to_string(),
        });

        let outcome = self
            .drive(run_id, agents, input.into(), context, &events)
            .await;
        match &outcome {
            Ok(result) => events.emit(RunEventPayload::RunCompleted {
                last_agent: result.last_agent.clone(),
                turns: result.turns,
            }),
            Err(e) => {
                tracing::debug!(run_id = %run_id, error = %e, "run failed");
                events.emit(RunEventPayload::RunFailed {
                    error: e.to_string(),
                });
            }
        }
        outcome
    }

    async fn drive(
        &self,
        run_id: Uuid,
        agents: &AgentSet,
        input: RunInput,
        context: HandoffContext,
        events: &RunEventEmitter,
    ) -> Result<RunResult, BatonError> {
        agents.validate()?;

        let input = input.into_messages();
        if input.is_empty() {
            return Err(BatonError::Configuration("run input is empty".into()));
        }

        let entry = agents.entry();
        let input_text = input
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        GuardrailRunner::check_input(entry.input_guardrails(), &input_text).await?;

        let max_turns = self.config.effective_max_turns(entry);
        let window = self.context_window();
        let executor = StepExecutor::new(self.provider.as_ref(), &window, &self.config)
            .with_events(events);
        let mut context = context;
        if context.current_agent() != entry.name() {
            tracing::debug!(
                run_id = %run_id,
                seeded = context.current_agent(),
                entry = entry.name(),
                "seeded context points at another agent; starting at entry"
            );
            context.set_current_agent(entry.name());
        }
        let mut state = RunState::new(run_id, input, entry.name()).with_handoff_context(context);
        let mut current = entry.name().to_string();
        let mut steps = Vec::new();
        let mut turns = 0usize;

        if let Some(stop) = &self.stop {
            stop.reset().await;
        }

        tracing::debug!(run_id = %run_id, agent = %current, max_turns, "run start");

        let final_output = loop {
            if turns >= max_turns {
                tracing::warn!(run_id = %run_id, max_turns, agent = %current, "turn budget exhausted");
                return Err(BatonError::MaxTurnsExceeded { max_turns });
            }
            if let Some(stop) = &self.stop {
                let progress = RunProgress {
                    run_id,
                    turns,
                    current_agent: current.clone(),
                    usage: state.usage(),
                    message_count: state.original_input().len() + state.generated().len(),
                };
                if stop.should_stop(&progress).await {
                    tracing::debug!(run_id = %run_id, turns, "stop condition met");
                    return Err(BatonError::StopRequested);
                }
            }

            let agent = agents
                .get(&current)
                .ok_or_else(|| BatonError::AgentNotFound(current.clone()))?;

            turns += 1;
            events.emit(RunEventPayload::TurnStarted {
                turn: turns,
                agent: current.clone(),
            });
            tracing::debug!(run_id = %run_id, turn = turns, agent = %current, "turn start");

            let step = executor.execute_step(agent, agents, &mut state).await?;
            let next = step.next_step.clone();
            steps.push(step);

            match next {
                NextStep::RunAgain => {}
                NextStep::Handoff { target_agent } => current = target_agent,
                NextStep::FinalOutput { value } => break value,
            }
        };

        let last = agents
            .get(&current)
            .ok_or_else(|| BatonError::AgentNotFound(current.clone()))?;
        let final_output = GuardrailRunner::check_output(last.output_guardrails(), &final_output).await?;

        let (messages, context, tracker, usage) = state.into_parts();
        Ok(RunResult {
            run_id,
            messages,
            last_agent: current,
            usage,
            turns,
            final_output,
            context,
            tool_use: tracker.summary(),
            steps,
        })
    }

    fn context_window(&self) -> ContextWindowManager {
        let mut window = ContextWindowManager::new(self.config.context.clone());
        if let Some(estimator) = &self.estimator {
            window = window.with_estimator(estimator.clone());
        }
        if let Some(summarizer) = &self.summarizer {
            window = window.with_summarizer(summarizer.clone());
        }
        window
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("provider", &self.provider.provider_name())
            .field("config", &self.config)
            .field("summarizer", &self.summarizer.is_some())
            .field("stop", &self.stop.is_some())
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}
