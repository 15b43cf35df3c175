//! Core logic including the agent loop, tool execution and conversation
//! management.
//!
//! An [`Agent`] is an actor: it owns its conversation and reacts to
//! messages one at a time, while model requests and tool calls run as
//! separate tasks that report back to it.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod actor;
mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentError, TranscriptSource};
