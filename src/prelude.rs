//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentSet};
pub use crate::agent_loop::{NextStep, RunInput, RunResult, Runner, StepResult, ToolUseBehavior};
pub use crate::config::RunConfig;
pub use crate::context::{ContextConfig, ContextStrategy};
pub use crate::error::{BatonError, Result};
pub use crate::handoff::{Handoff, HandoffContext};
pub use crate::provider::ModelProvider;
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolParameters};
pub use crate::types::{Message, Role, Usage};
