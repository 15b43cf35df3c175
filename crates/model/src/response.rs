use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::ModelProviderError;

/// A streamed answer to one [`ModelRequest`](crate::ModelRequest).
pub trait ModelResponse: Sized + Send + 'static {
    /// Error raised mid-stream.
    type Error: ModelProviderError;

    /// Polls for the next streamed event.
    ///
    /// Yields `Ok(Some(_))` for each event and `Ok(None)` once the stream
    /// is exhausted, including on every poll after that. An `Err` ends
    /// the response; the agent decides whether to retry the request.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped producing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// Tool results are expected before the turn can continue.
    ToolCalls,
    /// The answer is complete.
    Stop,
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Echoed back in the matching [`ToolCallResult`](crate::ToolCallResult).
    pub id: String,
    /// Name of a tool offered in the request.
    pub name: String,
    /// JSON object matching the tool's parameter schema.
    pub arguments: Value,
}

/// One item of a streamed response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// Always the last event of a successful response.
    Completed(ModelFinishReason),
    /// A chunk of assistant text.
    MessageDelta(String),
    /// A complete tool call; arguments are never streamed partially.
    ToolCall(ToolCallRequest),
}
