use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use sidekick_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ApiError, ChatCompletionChunk, ToolCall};

struct StreamState {
    sse: Sse,
    // Tool calls arrive in fragments, they are only emitted once the
    // stream has finished and every argument string is complete.
    tool_calls: Vec<ToolCall>,
    pending_events: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl StreamState {
    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let existing = match fragment.index {
            Some(index) => self
                .tool_calls
                .iter_mut()
                .find(|call| call.index == Some(index)),
            // Without an index every fragment is a complete call.
            None => None,
        };
        let Some(call) = existing else {
            self.tool_calls.push(fragment);
            return;
        };

        if let Some(id) = fragment.id {
            call.id.get_or_insert_default().push_str(&id);
        }
        let Some(function) = fragment.function else {
            return;
        };
        match &mut call.function {
            Some(partial) => {
                if let Some(name) = function.name {
                    partial.name.get_or_insert_default().push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    partial
                        .arguments
                        .get_or_insert_default()
                        .push_str(&arguments);
                }
            }
            None => call.function = Some(function),
        }
    }

    fn finish(&mut self, reason: Option<&str>) {
        if self.finished {
            return;
        }
        self.finished = true;

        // Some compatible servers report `stop` even when calling tools.
        let has_tool_calls = !self.tool_calls.is_empty();
        for call in self.tool_calls.drain(..) {
            self.pending_events
                .push_back(ModelResponseEvent::ToolCall(call.into_request()));
        }
        let reason = if has_tool_calls || reason == Some("tool_calls") {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        self.pending_events
            .push_back(ModelResponseEvent::Completed(reason));
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, StreamState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let state = StreamState {
            sse,
            tool_calls: Default::default(),
            pending_events: Default::default(),
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(next_event_fut.as_mut().poll(cx));
        match result {
            Ok((Some(event), state)) => {
                *this.next_event_fut = Some(Box::pin(next_event(state)));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, _)) => {
                *this.next_event_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_event_fut = None;
                Poll::Ready(Err(err))
            }
        }
    }
}

fn api_error(error: ApiError) -> Error {
    let rate_limited = match &error.code {
        Some(Value::Number(code)) => code.as_u64() == Some(429),
        Some(Value::String(code)) => {
            code == "429" || code == "rate_limit_exceeded"
        }
        _ => false,
    };
    let kind = if rate_limited {
        ErrorKind::RateLimitExceeded
    } else {
        ErrorKind::Other
    };
    Error::new(format!("stream error: {}", error.message), kind)
}

async fn next_event(mut state: StreamState) -> NextEvent {
    loop {
        // The order of events is important: message deltas in arrival
        // order, then tool calls, and finally the finish reason.
        if let Some(event) = state.pending_events.pop_front() {
            return Ok((Some(event), state));
        }
        if state.finished {
            return Ok((None, state));
        }

        let data = match state.sse.next_event().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                state.finish(None);
                continue;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {data}");
        if data == "[DONE]" {
            state.finish(None);
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&data)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(error) = chunk.error {
            return Err(api_error(error));
        }

        // A usage-only chunk carries no choice.
        for choice in chunk.choices {
            if let Some(content) =
                choice.delta.content.filter(|content| !content.is_empty())
            {
                state
                    .pending_events
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
            for fragment in choice.delta.tool_calls.into_iter().flatten() {
                state.merge_tool_call(fragment);
            }
            if let Some(reason) = choice.finish_reason {
                state.finish(Some(&reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use sidekick_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(chunks: Chunks) -> Result<Vec<ModelResponseEvent>, Error> {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let chunks = Chunks::from_static_split(
            include_bytes!("../fixtures/stream_tool_calls.txt"),
            37,
        );
        let events = collect(chunks).await.unwrap();
        let text: String = events
            .iter()
            .filter_map(|event| match event {
                ModelResponseEvent::MessageDelta(delta) => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Let me check both cities.");

        let calls: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ModelResponseEvent::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "get_current_weather");
        assert_eq!(calls[0].arguments, json!({ "location": "Oslo" }));
        assert_eq!(calls[1].arguments, json!({ "location": "Bergen" }));

        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Completed(ModelFinishReason::ToolCalls))
        );
    }

    #[tokio::test]
    async fn test_text_with_finish_in_same_chunk() {
        let chunks = Chunks::from_static_split(
            include_bytes!("../fixtures/stream_text.txt"),
            16,
        );
        let events = collect(chunks).await.unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("It is sunny ".to_owned()),
                ModelResponseEvent::MessageDelta("in Oslo.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error() {
        let chunks = Chunks::from_static_split(
            b"data: {\"error\":{\"message\":\"quota\",\"code\":429}}\n\n",
            64,
        );
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }
}
