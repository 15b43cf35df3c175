//! Provider-neutral types shared by the agent runtime and model providers.
//!
//! The agent only ever talks to a model through the types in this crate,
//! so a provider can be swapped (a hosted OpenAI-compatible endpoint, a
//! scripted fake in tests) without touching the agent loop or the tools.
//!
//! Nothing here performs I/O. Implementors of [`ModelProvider`] decide how
//! a [`ModelRequest`] is sent and how the streamed answer is decoded into
//! [`ModelResponseEvent`]s.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
