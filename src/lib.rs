//! Baton: a multi-agent run loop.
//!
//! Hands a request to one agent and lets control move between agents through
//! handoffs, run tools mid-conversation, and stop on a final answer, an error
//! or the turn budget. Conversation history is trimmed to a token or message
//! budget before every provider call.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use baton::prelude::*;
//! use baton::provider::{ModelResponse, ScriptedProvider};
//!
//! # async fn example() -> baton::error::Result<()> {
//! let provider = ScriptedProvider::new()
//!     .respond(ModelResponse::new(Usage::new(40, 10)).function_call("transfer_to_writer", "{}", "c1"))
//!     .respond(ModelResponse::new(Usage::new(60, 20)).message("Here is your draft."));
//!
//! let agents = AgentSet::new(Agent::new("Triage").with_handoff("Writer"))
//!     .with_agent(Agent::new("Writer").with_instructions("Write clearly."));
//!
//! let result = Runner::new(Arc::new(provider)).run(&agents, "Draft a memo").await?;
//! assert_eq!(result.last_agent, "Writer");
//! assert_eq!(result.usage.total_tokens, 130);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod handoff;
pub mod prelude;
pub mod provider;
pub mod stop;
pub mod tools;
pub mod types;
pub mod util;
