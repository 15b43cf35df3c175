use serde::{Deserialize, Serialize};
use serde_json::Value;
use sidekick_model::{
    AssistantMessage, ModelMessage, ModelRequest, ModelTool, ToolCallRequest,
};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionToolCall>,
}

impl ToolCall {
    /// Converts an accumulated call into a request.
    ///
    /// Arguments that are not valid JSON are passed on as a string so the
    /// tool can report the problem back to the model.
    pub fn into_request(self) -> ToolCallRequest {
        let function = self.function.unwrap_or(FunctionToolCall {
            name: None,
            arguments: None,
        });
        let raw_args = function.arguments.unwrap_or_default();
        let arguments = if raw_args.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&raw_args).unwrap_or(Value::String(raw_args))
        };
        ToolCallRequest {
            id: self.id.unwrap_or_default(),
            name: function.name.unwrap_or_default(),
            arguments,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub error: Option<ApiError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    pub code: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: true,
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(msg) => create_assistant_message(msg),
        ModelMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            content: result.content.clone(),
        },
    }
}

fn create_assistant_message(msg: &AssistantMessage) -> Message {
    let tool_calls: Vec<_> = msg
        .tool_calls
        .iter()
        .map(|call| ToolCall {
            index: None,
            id: Some(call.id.clone()),
            r#type: Some("function".to_owned()),
            function: Some(FunctionToolCall {
                name: Some(call.name.clone()),
                arguments: Some(call.arguments.to_string()),
            }),
        })
        .collect();
    Message::Assistant {
        content: (!msg.content.is_empty()).then(|| msg.content.clone()),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sidekick_model::ToolCallResult;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are a weather assistant.".to_owned()),
                ModelMessage::User("Weather in Oslo?".to_owned()),
            ],
            tools: vec![ModelTool {
                name: "get_current_weather".to_owned(),
                description: "Gets the current weather.".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": { "location": { "type": "string" } }
                }),
            }],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let value =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "custom",
                "messages": [
                    { "role": "system", "content": "You are a weather assistant." },
                    { "role": "user", "content": "Weather in Oslo?" }
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "get_current_weather",
                        "description": "Gets the current weather.",
                        "parameters": {
                            "type": "object",
                            "properties": { "location": { "type": "string" } }
                        }
                    }
                }],
                "stream": true
            })
        );
    }

    #[test]
    fn test_replay_tool_calls() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::Assistant(AssistantMessage {
                    content: String::new(),
                    tool_calls: vec![ToolCallRequest {
                        id: "call_1".to_owned(),
                        name: "get_forecast".to_owned(),
                        arguments: json!({ "location": "Oslo" }),
                    }],
                }),
                ModelMessage::Tool(ToolCallResult {
                    id: "call_1".to_owned(),
                    content: "Sunny".to_owned(),
                }),
            ],
            tools: vec![],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let value =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            value["messages"],
            json!([
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_forecast",
                            "arguments": "{\"location\":\"Oslo\"}"
                        }
                    }]
                },
                { "role": "tool", "tool_call_id": "call_1", "content": "Sunny" }
            ])
        );
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_malformed_arguments() {
        let call = ToolCall {
            index: Some(0),
            id: Some("c".to_owned()),
            r#type: None,
            function: Some(FunctionToolCall {
                name: Some("get_ticket".to_owned()),
                arguments: Some("{\"ticket_id\":".to_owned()),
            }),
        };
        let req = call.into_request();
        assert_eq!(req.arguments, json!("{\"ticket_id\":"));

        let empty = ToolCall {
            index: None,
            id: None,
            r#type: None,
            function: None,
        };
        assert_eq!(empty.into_request().arguments, json!({}));
    }
}
