use std::collections::BTreeMap;
use std::future::ready;
use std::sync::Arc;

use sidekick_model::{ModelTool, ToolCallRequest};

use super::object::{BoxedToolFuture, ToolObject, into_object};
use super::{Error, Tool};

/// A set of tools the model can call, keyed by name.
///
/// The registry knows nothing about models or agents: it describes its tools
/// and dispatches calls. The same registry can therefore be shared by
/// several agents or exercised directly in tests.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register<T: Tool>(&mut self, tool: T) -> &mut Self {
        let name = tool.name().to_owned();
        if self.tools.insert(name.clone(), into_object(tool)).is_some() {
            warn!("tool {name} was registered twice, keeping the last one");
        }
        self
    }

    /// Builder-style variant of [`ToolRegistry::register`].
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Returns `true` if a tool with this name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Describes every tool for the model, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Starts a tool call.
    ///
    /// The returned future does not borrow the registry. Unknown tools and
    /// malformed arguments resolve to an error result instead of failing
    /// early, so every request gets an answer.
    pub fn call(&self, req: &ToolCallRequest) -> BoxedToolFuture {
        let Some(tool) = self.tools.get(&req.name) else {
            warn!("tool not found: {}", req.name);
            return Box::pin(ready(Err(Error::unknown_tool(&req.name))));
        };
        trace!("calling {} ({}) with {}", req.name, req.id, req.arguments);
        tool.execute(req.arguments.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{ErrorKind, ToolResult};

    static ADD_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        })
    });

    static NULL_SCHEMA: Value = Value::Null;

    #[derive(Deserialize)]
    struct AddInput {
        a: f64,
        b: f64,
    }

    struct AddTool;

    impl Tool for AddTool {
        type Input = AddInput;

        fn name(&self) -> &str {
            "add"
        }

        fn description(&self) -> &str {
            "Adds two numbers"
        }

        fn parameter_schema(&self) -> &Value {
            &ADD_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(format!("{}", input.a + input.b)))
        }
    }

    struct EchoTool;

    impl Tool for EchoTool {
        type Input = Value;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn parameter_schema(&self) -> &Value {
            &NULL_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.to_string()))
        }
    }

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_definitions_sorted() {
        let registry = ToolRegistry::new().with_tool(EchoTool).with_tool(AddTool);
        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(names, ["add", "echo"]);
        assert_eq!(registry.definitions()[0].parameters, *ADD_SCHEMA);
    }

    #[tokio::test]
    async fn test_call() {
        let registry = ToolRegistry::new().with_tool(AddTool);
        let result = registry.call(&request("add", json!({ "a": 2, "b": 3.5 })));
        assert_eq!(result.await.unwrap(), "5.5");
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let registry = ToolRegistry::new().with_tool(AddTool);
        let err = registry
            .call(&request("add", json!({ "a": "two" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.call(&request("fly", json!({}))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
    }

    #[tokio::test]
    async fn test_future_outlives_registry() {
        let registry = ToolRegistry::new().with_tool(EchoTool);
        let fut = registry.call(&request("echo", json!({ "x": 1 })));
        drop(registry);
        assert_eq!(fut.await.unwrap(), r#"{"x":1}"#);
    }
}
