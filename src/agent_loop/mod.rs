//! Agent loop: the per-turn state machine and its collaborators.

pub mod behavior;
pub mod classify;
pub mod dispatch;
pub mod events;
pub mod runner;
pub mod step;
pub mod tracker;
pub mod types;

pub use behavior::{ToolUseBehavior, ToolUseContext, ToolUseVerdict};
pub use classify::{classify, ClassifiedResponse};
pub use dispatch::ToolDispatcher;
pub use events::{RunEvent, RunEventPayload, RunEventSink};
pub use runner::{RunInput, Runner};
pub use step::{RunState, StepExecutor};
pub use tracker::ToolUseTracker;
pub use types::{NextStep, RunId, RunResult, StepResult, ToolCallRequest, ToolResult};
