#![allow(dead_code)]

use std::path::Path;

use serde_json::Value;
use sidekick::config::AppConfig;
use sidekick_model::{ModelMessage, ToolCallRequest};
use sidekick_test_model::PresetEvent;

/// Offline configuration keeping all data under `data_dir`.
pub fn config(data_dir: &Path) -> AppConfig {
    let data_dir = data_dir.to_string_lossy().into_owned();
    AppConfig::from_lookup(|var| match var {
        "OPENAI_API_KEY" => Some("test-key".to_owned()),
        "SIDEKICK_DATA_DIR" => Some(data_dir.clone()),
        "SIDEKICK_RESEARCH_OFFLINE" => Some("true".to_owned()),
        _ => None,
    })
    .unwrap()
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    })
}

/// Contents of the tool results in a request, in order.
pub fn tool_contents(messages: &[ModelMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => Some(result.content.clone()),
            _ => None,
        })
        .collect()
}
