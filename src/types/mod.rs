//! Core types for baton.

pub mod message;
pub mod usage;

pub use message::*;
pub use usage::*;
