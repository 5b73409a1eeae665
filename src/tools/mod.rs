//! Tool system for function calling.

pub mod arguments;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use tool::{output_to_string, FunctionTool, Tool, ToolContext};
pub use types::ToolParameters;
