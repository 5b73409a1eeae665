//! Agent definitions and the set of agents a run can hand off between.

pub mod agent;
pub mod set;

pub use agent::Agent;
pub use set::AgentSet;
