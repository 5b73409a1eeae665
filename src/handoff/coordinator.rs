use chrono::Utc;

use super::{Handoff, HandoffContext, HandoffPayload, HandoffRecord};
use crate::agent::{Agent, AgentSet};
use crate::error::BatonError;

/// Outcome of resolving a handoff call. An unknown target is a normal,
/// reportable outcome rather than an error.
#[derive(Debug)]
pub enum Resolution<'a> {
    Resolved {
        handoff: &'a Handoff,
        target: &'a Agent,
    },
    NotFound {
        requested: String,
    },
}

/// Resolves handoff calls and applies them to a run's [`HandoffContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HandoffCoordinator;

impl HandoffCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a handoff tool call made by `agent`.
    ///
    /// The call must name one of the agent's declared handoffs, and the
    /// declared target must exist in `agents` under exactly that name.
    pub fn resolve<'a>(
        &self,
        tool_name: &str,
        agent: &'a Agent,
        agents: &'a AgentSet,
    ) -> Resolution<'a> {
        let Some(handoff) = agent.handoffs().iter().find(|h| h.tool_name() == tool_name) else {
            return Resolution::NotFound {
                requested: tool_name.to_string(),
            };
        };
        match agents.get(handoff.target()) {
            Some(target) => Resolution::Resolved { handoff, target },
            None => Resolution::NotFound {
                requested: handoff.target().to_string(),
            },
        }
    }

    /// Apply a resolved handoff.
    ///
    /// Appends to the chain, filters the payload, merges it into shared
    /// context, switches the current agent, then runs the `on_handoff` hook.
    /// Hook failures propagate as [`BatonError::HandoffHook`].
    pub fn execute(
        &self,
        from: &Agent,
        to: &Agent,
        handoff: &Handoff,
        payload: HandoffPayload,
        context: &mut HandoffContext,
    ) -> Result<HandoffRecord, BatonError> {
        let record = HandoffRecord {
            from: from.name().to_string(),
            to: to.name().to_string(),
            timestamp: Utc::now(),
            reason: payload.reason.clone(),
        };
        context.push_record(record.clone());

        let payload = handoff.filter(payload);
        context.merge(payload.data.clone());
        context.set_current_agent(to.name());

        tracing::info!(
            from = %record.from,
            to = %record.to,
            keys = payload.data.len(),
            "handoff applied"
        );

        handoff.notify(&payload).map_err(|e| BatonError::HandoffHook {
            from: record.from.clone(),
            to: record.to.clone(),
            message: e.to_string(),
        })?;

        Ok(record)
    }
}
