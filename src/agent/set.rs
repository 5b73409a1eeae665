use std::collections::HashMap;

use super::Agent;
use crate::error::BatonError;

/// The agents available to a run, looked up by exact name, plus the entry
/// agent that receives the input.
#[derive(Debug, Clone)]
pub struct AgentSet {
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
    entry: usize,
}

impl AgentSet {
    pub fn new(entry: Agent) -> Self {
        let mut index = HashMap::new();
        index.insert(entry.name().to_string(), 0);
        Self {
            agents: vec![entry],
            index,
            entry: 0,
        }
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.insert(agent);
        self
    }

    /// Add an agent, replacing any agent with the same name.
    pub fn insert(&mut self, agent: Agent) {
        match self.index.get(agent.name()) {
            Some(&slot) => self.agents[slot] = agent,
            None => {
                self.index.insert(agent.name().to_string(), self.agents.len());
                self.agents.push(agent);
            }
        }
    }

    /// Make another registered agent the entry point.
    pub fn set_entry(&mut self, name: &str) -> Result<(), BatonError> {
        let slot = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| BatonError::AgentNotFound(name.to_string()))?;
        self.entry = slot;
        Ok(())
    }

    pub fn entry(&self) -> &Agent {
        &self.agents[self.entry]
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.index.get(name).map(|&slot| &self.agents[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Validate every agent's handoff declarations.
    pub fn validate(&self) -> Result<(), BatonError> {
        self.agents.iter().try_for_each(Agent::validate)
    }
}

impl From<Agent> for AgentSet {
    fn from(agent: Agent) -> Self {
        Self::new(agent)
    }
}
