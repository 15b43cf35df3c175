use std::sync::Arc;
use std::time::Duration;

use sidekick_model::ModelProvider;

use super::{Agent, TranscriptSource};
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolRegistry};

pub(crate) type IdleFn = Box<dyn Fn() + Send + Sync>;
pub(crate) type TranscriptFn = Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) tools: ToolRegistry,
    pub(crate) system_prompt: Option<String>,
    pub(crate) max_history_turns: Option<usize>,
    pub(crate) max_steps: usize,
    pub(crate) max_retries: u32,
    pub(crate) initial_retry_delay: Duration,
    pub(crate) label: String,
    pub(crate) on_idle: Option<IdleFn>,
    pub(crate) on_transcript: Option<TranscriptFn>,
    pub(crate) on_message_delta: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: ToolRegistry::new(),
            system_prompt: None,
            max_history_turns: None,
            max_steps: 16,
            max_retries: 1,
            initial_retry_delay: Duration::from_millis(500),
            label: "agent".to_owned(),
            on_idle: None,
            on_transcript: None,
            on_message_delta: None,
        }
    }

    /// Sets the system instructions sent first in every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Replaces the toolset with a prepared registry.
    #[inline]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Keeps at most `turns` user turns of history, dropping the oldest.
    #[inline]
    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = Some(turns.max(1));
        self
    }

    /// Sets how many model calls a single turn may make.
    #[inline]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps.max(1);
        self
    }

    /// Sets how many times a retryable provider failure is retried.
    #[inline]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the first delay of the exponential retry backoff.
    #[inline]
    pub fn with_initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    /// Names the agent in log spans.
    #[inline]
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    /// Attaches a callback to be invoked when the agent is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback invoked with every completed user or assistant
    /// message.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Attaches a callback invoked with assistant text as it streams in.
    #[inline]
    pub fn on_message_delta(
        mut self,
        on_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_message_delta = Some(Arc::new(on_delta));
        self
    }

    /// Builds the agent.
    ///
    /// Must be called within a Tokio runtime.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::spawn_from_builder(self)
    }
}
