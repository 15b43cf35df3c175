use sidekick_core::tool::ToolRegistry;
use sidekick_core::{Agent, AgentBuilder, AgentError, TranscriptSource};
use sidekick_model::ModelProvider;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self { agent_builder }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the tools the agent may call.
    #[inline]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.agent_builder = self.agent_builder.with_tools(tools);
        self
    }

    /// Keeps at most `turns` user turns of history.
    #[inline]
    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.agent_builder = self.agent_builder.with_max_history_turns(turns);
        self
    }

    /// Names the session in logs.
    #[inline]
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.agent_builder = self.agent_builder.with_label(label);
        self
    }

    /// Attaches a callback to be invoked when the agent is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Attaches a callback receiving the answer as it streams in.
    #[inline]
    pub fn on_message_delta(
        mut self,
        on_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_message_delta(on_delta);
        self
    }

    /// Builds a new session.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Session {
        Session {
            agent: self.agent_builder.build(),
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// The session holds a fully configured agent and is basically a wrapper
/// around [`Agent`]. Cloning returns another handle to the same session.
#[derive(Clone)]
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Sends a message without waiting for the answer.
    #[inline]
    pub fn send_message(&self, message: &str) {
        self.agent.enqueue_user_input(message);
    }

    /// Sends a message and waits for the answer.
    #[inline]
    pub async fn query(&self, message: &str) -> Result<String, AgentError> {
        self.agent.query(message).await
    }

    /// Forgets the conversation so far.
    #[inline]
    pub fn reset(&self) {
        self.agent.reset();
    }
}
