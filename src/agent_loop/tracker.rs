//! Per-run record of which agents used which tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tool usage for one run, grouped by agent.
///
/// Names are deduplicated per agent and kept in first-use order. The tracker
/// only grows; start a new run for a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseTracker {
    agents: Vec<AgentToolUse>,
    calls: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AgentToolUse {
    agent: String,
    tools: Vec<String>,
}

impl ToolUseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record tool calls made by `agent`.
    pub fn record<I, S>(&mut self, agent: &str, tool_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let slot = match self.agents.iter().position(|a| a.agent == agent) {
            Some(slot) => slot,
            None => {
                self.agents.push(AgentToolUse {
                    agent: agent.to_string(),
                    tools: Vec::new(),
                });
                self.agents.len() - 1
            }
        };
        let entry = &mut self.agents[slot];
        for name in tool_names {
            let name = name.as_ref();
            self.calls += 1;
            if !entry.tools.iter().any(|t| t == name) {
                entry.tools.push(name.to_string());
            }
        }
    }

    pub fn has_used_tools(&self, agent: &str) -> bool {
        !self.tools_used_by(agent).is_empty()
    }

    pub fn tools_used_by(&self, agent: &str) -> &[String] {
        self.agents
            .iter()
            .find(|a| a.agent == agent)
            .map(|a| a.tools.as_slice())
            .unwrap_or(&[])
    }

    /// Number of tool calls recorded, counting repeats.
    pub fn total_usage(&self) -> usize {
        self.calls
    }

    /// Agent name to the distinct tools it used.
    pub fn summary(&self) -> BTreeMap<String, Vec<String>> {
        self.agents
            .iter()
            .filter(|a| !a.tools.is_empty())
            .map(|a| (a.agent.clone(), a.tools.clone()))
            .collect()
    }
}
