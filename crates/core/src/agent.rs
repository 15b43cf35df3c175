mod builder;
mod error;
mod state;
#[cfg(test)]
mod tests;

use tokio::sync::oneshot;

use crate::actor::Actor;
pub use builder::AgentBuilder;
pub use error::AgentError;
use state::{AgentState, EnqueueUserInput, PendingInput, Reset};

/// Who produced a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Text the user sent.
    User,
    /// Text the assistant answered, including apologies for failed turns.
    Assistant,
}

/// An agent instance, which maintains a conversation, a model client, its
/// tools and internal state.
///
/// Messages dispatched to the agent are handled immediately, no matter
/// what stage this agent is in. For example, if the agent is currently
/// running a tool, it still accepts new user input: instead of calling the
/// model, the agent enqueues the input and handles it when it becomes
/// idle.
///
/// Cloning an `Agent` returns another handle to the same agent.
#[derive(Clone)]
pub struct Agent {
    handle: Actor<AgentState>,
}

impl Agent {
    /// Enqueues a user input for processing, without waiting for the
    /// answer. Use the transcript callback to observe the result.
    pub fn enqueue_user_input<S: Into<String>>(&self, input: S) {
        let input = PendingInput {
            text: input.into(),
            reply: None,
        };
        if self.handle.send(EnqueueUserInput(input)).is_err() {
            warn!("agent has stopped, dropping user input");
        }
    }

    /// Sends a user input and waits for the final answer of its turn.
    ///
    /// If other inputs are queued, this one is answered after them.
    pub async fn query<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<String, AgentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let input = PendingInput {
            text: input.into(),
            reply: Some(reply_tx),
        };
        self.handle
            .send(EnqueueUserInput(input))
            .map_err(|_| AgentError::Stopped)?;
        reply_rx.await.map_err(|_| AgentError::Stopped)?
    }

    /// Starts a new conversation.
    ///
    /// Work still running for the old conversation is cancelled, and
    /// queued inputs are dropped. Pending [`Agent::query`] calls resolve
    /// to [`AgentError::Reset`]. Inputs sent after this call see an
    /// empty history.
    pub fn reset(&self) {
        if self.handle.send(Reset).is_err() {
            warn!("agent has stopped, nothing to reset");
        }
    }

    fn spawn_from_builder(builder: AgentBuilder) -> Self {
        let label = builder.label.clone();
        let state = AgentState::from_builder(builder);
        Self {
            handle: Actor::spawn(state, &label),
        }
    }
}
