use std::error::Error;
use std::fmt::{self, Display};

use sidekick_model::ErrorKind;

/// The error returned when a turn could not be completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentError {
    /// The model provider failed, after retrying if the failure allowed it.
    Model {
        /// Kind reported by the provider.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
    /// The model kept calling tools past the step limit.
    StepLimitExceeded(usize),
    /// The conversation was reset before the turn completed.
    Reset,
    /// The agent is no longer running.
    Stopped,
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Model { message, .. } => f.write_str(message),
            AgentError::StepLimitExceeded(limit) => {
                write!(f, "gave up after {limit} model calls in one turn")
            }
            AgentError::Reset => f.write_str("the conversation was reset"),
            AgentError::Stopped => f.write_str("the agent has stopped"),
        }
    }
}

impl Error for AgentError {}
