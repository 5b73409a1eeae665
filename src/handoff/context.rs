use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One applied handoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandoffRecord {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// State shared across the agents of a single run.
///
/// Owned by the run and passed explicitly into every step. Only the
/// [`HandoffCoordinator`](super::HandoffCoordinator) mutates it once a run
/// has started; the handoff chain only ever grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HandoffContext {
    shared_context: Map<String, Value>,
    handoff_chain: Vec<HandoffRecord>,
    current_agent: String,
}

impl HandoffContext {
    pub fn new(current_agent: impl Into<String>) -> Self {
        Self {
            current_agent: current_agent.into(),
            ..Self::default()
        }
    }

    /// Seed shared context before the run starts.
    pub fn with_shared_context(mut self, shared: Map<String, Value>) -> Self {
        self.shared_context = shared;
        self
    }

    pub fn shared_context(&self) -> &Map<String, Value> {
        &self.shared_context
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.shared_context.get(key)
    }

    pub fn handoff_chain(&self) -> &[HandoffRecord] {
        &self.handoff_chain
    }

    pub fn current_agent(&self) -> &str {
        &self.current_agent
    }

    pub(crate) fn push_record(&mut self, record: HandoffRecord) {
        self.handoff_chain.push(record);
    }

    /// Shallow merge; incoming keys overwrite existing ones.
    pub(crate) fn merge(&mut self, data: Map<String, Value>) {
        for (key, value) in data {
            self.shared_context.insert(key, value);
        }
    }

    pub(crate) fn set_current_agent(&mut self, name: impl Into<String>) {
        self.current_agent = name.into();
    }
}
