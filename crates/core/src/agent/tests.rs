use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use sidekick_model::{ErrorKind, ModelMessage, ToolCallRequest};
use sidekick_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, AgentError, TranscriptSource};

static ANY_SCHEMA: Value = Value::Null;

#[derive(Deserialize)]
struct LookupInput {
    key: String,
    #[serde(default)]
    delay_ms: u64,
}

/// Answers `value of {key}`, optionally after a delay.
struct LookupTool;

impl Tool for LookupTool {
    type Input = LookupInput;

    fn name(&self) -> &str {
        "lookup"
    }

    fn description(&self) -> &str {
        "Looks up a key"
    }

    fn parameter_schema(&self) -> &Value {
        &ANY_SCHEMA
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            sleep(Duration::from_millis(input.delay_ms)).await;
            Ok(format!("value of {}", input.key))
        }
    }
}

fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    })
}

fn builder(provider: &TestModelProvider) -> AgentBuilder {
    AgentBuilder::with_model_provider(provider.clone())
        .with_tool(LookupTool)
        .with_initial_retry_delay(Duration::from_millis(1))
}

type Transcripts = Arc<Mutex<Vec<(String, TranscriptSource)>>>;

fn recording(builder: AgentBuilder) -> (AgentBuilder, Transcripts) {
    let transcripts = Transcripts::default();
    let builder = builder.on_transcript({
        let transcripts = Arc::clone(&transcripts);
        move |text, source| {
            transcripts.lock().unwrap().push((text.to_owned(), source))
        }
    });
    (builder, transcripts)
}

fn tool_contents(messages: &[ModelMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => Some(result.content.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_simple_message() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::text("Hi, what can I do for you?"));

    let (idle_tx, mut idle_rx) = watch::channel::<bool>(false);

    let agent = builder(&provider)
        .on_idle(move || {
            idle_tx.send(true).unwrap();
        })
        .build();
    agent.enqueue_user_input("Hello");

    timeout(Duration::from_millis(500), idle_rx.wait_for(|v| *v))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_query_and_transcripts() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::text("Sunny and 21 degrees."));
    let (builder, transcripts) = recording(
        builder(&provider).with_system_prompt("You are a weather assistant."),
    );
    let agent = builder.build();

    let answer = agent.query("Weather in Lisbon?").await.unwrap();
    assert_eq!(answer, "Sunny and 21 degrees.");
    assert_eq!(
        *transcripts.lock().unwrap(),
        [
            ("Weather in Lisbon?".to_owned(), TranscriptSource::User),
            ("Sunny and 21 degrees.".to_owned(), TranscriptSource::Assistant),
        ]
    );

    let request = &provider.requests()[0];
    assert_eq!(
        request.messages[0],
        ModelMessage::System("You are a weather assistant.".to_owned())
    );
    assert_eq!(request.tools[0].name, "lookup");
}

#[tokio::test]
async fn test_tool_results_in_request_order() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([
            tool_call("a", "lookup", json!({ "key": "slow", "delay_ms": 30 })),
            tool_call("b", "lookup", json!({ "key": "fast" })),
        ]))
        .with_response(PresetResponse::text("Both found."));
    let agent = builder(&provider).build();

    assert_eq!(agent.query("Find both").await.unwrap(), "Both found.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let messages = &requests[1].messages;
    assert!(matches!(
        &messages[1],
        ModelMessage::Assistant(msg) if msg.tool_calls.len() == 2
    ));
    assert_eq!(
        tool_contents(messages),
        ["value of slow", "value of fast"]
    );
}

#[tokio::test]
async fn test_tool_errors_are_fed_back() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([
            tool_call("a", "fly", json!({})),
            tool_call("b", "lookup", json!({ "wrong": true })),
        ]))
        .with_response(PresetResponse::text("Sorry."));
    let agent = builder(&provider).build();

    assert_eq!(agent.query("Go").await.unwrap(), "Sorry.");
    let contents = tool_contents(&provider.requests()[1].messages);
    assert_eq!(contents[0], "Error: Unknown tool: fly");
    assert!(contents[1].starts_with("Error: missing field `key`"));
}

#[tokio::test]
async fn test_retryable_failure_is_retried_once() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::text("Recovered.").with_failures(1));
    let agent = builder(&provider).build();

    assert_eq!(agent.query("Hi").await.unwrap(), "Recovered.");
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_retry_gives_up_after_one_attempt() {
    let provider = TestModelProvider::default().with_response(
        PresetResponse::text("Never.")
            .with_failures(2)
            .with_failure_kind(ErrorKind::SessionExpired),
    );
    let (builder, transcripts) = recording(builder(&provider));
    let agent = builder.build();

    let err = agent.query("Hi").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::Model {
            kind: ErrorKind::SessionExpired,
            ..
        }
    ));
    assert_eq!(provider.requests().len(), 2);

    let transcripts = transcripts.lock().unwrap();
    let (apology, source) = transcripts.last().unwrap();
    assert_eq!(*source, TranscriptSource::Assistant);
    assert!(apology.starts_with("I apologize, but I encountered an error: "));
}

#[tokio::test]
async fn test_failed_turn_is_rolled_back() {
    let provider = TestModelProvider::default().with_response(
        PresetResponse::text("Hello again.")
            .with_failures(1)
            .with_failure_kind(ErrorKind::Other),
    );
    let agent = builder(&provider).build();

    assert!(agent.query("first").await.is_err());
    // Not retried.
    assert_eq!(provider.requests().len(), 1);

    assert_eq!(agent.query("second").await.unwrap(), "Hello again.");
    let requests = provider.requests();
    assert_eq!(
        requests[1].messages,
        [ModelMessage::User("second".to_owned())]
    );
}

#[tokio::test]
async fn test_inputs_queue_while_busy() {
    let mut provider = TestModelProvider::default()
        .with_response(PresetResponse::text("first"))
        .with_response(PresetResponse::text("second"));
    provider.set_delay(Duration::from_millis(5));
    let agent = builder(&provider).build();

    agent.enqueue_user_input("one");
    assert_eq!(agent.query("two").await.unwrap(), "second");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[0], ModelMessage::User("one".to_owned()));
}

#[tokio::test]
async fn test_reset_starts_fresh_context() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::text("first"));
    let agent = builder(&provider).with_system_prompt("prompt").build();

    agent.query("one").await.unwrap();
    agent.reset();
    assert_eq!(agent.query("two").await.unwrap(), "first");

    let requests = provider.requests();
    assert_eq!(
        requests[1].messages,
        [
            ModelMessage::System("prompt".to_owned()),
            ModelMessage::User("two".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_reset_cancels_running_turn() {
    let mut provider = TestModelProvider::default()
        .with_response(PresetResponse::text("too late"));
    provider.set_delay(Duration::from_millis(100));
    let agent = builder(&provider).build();

    let (result, _) = tokio::join!(agent.query("slow"), async {
        sleep(Duration::from_millis(10)).await;
        agent.reset();
    });
    assert_eq!(result.unwrap_err(), AgentError::Reset);
}

#[tokio::test]
async fn test_step_limit() {
    let looping = PresetResponse::with_events([tool_call(
        "a",
        "lookup",
        json!({ "key": "again" }),
    )]);
    let provider = TestModelProvider::default()
        .with_response(looping.clone())
        .with_response(looping.clone())
        .with_response(looping);
    let agent = builder(&provider).with_max_steps(2).build();

    let err = agent.query("Loop").await.unwrap_err();
    assert_eq!(err, AgentError::StepLimitExceeded(2));
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_history_window() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::text("a"))
        .with_response(PresetResponse::text("b"));
    let agent = builder(&provider).with_max_history_turns(2).build();

    agent.query("one").await.unwrap();
    agent.query("two").await.unwrap();
    agent.query("three").await.unwrap();

    let last = provider.requests().pop().unwrap();
    assert_eq!(last.messages.len(), 3);
    assert_eq!(last.messages[0], ModelMessage::User("two".to_owned()));
    assert_eq!(last.messages[2], ModelMessage::User("three".to_owned()));
}
