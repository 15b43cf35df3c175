//! Task assistants built on the sidekick agent runtime: weather, research,
//! personal finance, code review, customer support and a multi-agent
//! orchestrator.
//!
//! The crate includes a CLI for using them in the terminal. Each assistant
//! can also be assembled as a library from [`assistants`], given a
//! [`SessionBuilder`] carrying the model provider of your choice.

#[macro_use]
extern crate tracing;

pub mod assistants;
mod clock;
pub mod config;
pub mod finance;
pub mod orchestrator;
pub mod research;
pub mod review;
mod session;
pub mod support;
pub mod weather;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`sidekick_core`] crate.
pub mod core {
    pub use sidekick_core::*;
}
