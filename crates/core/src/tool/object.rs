use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolResult};

pub type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Type-erased [`Tool`], so tools with different inputs share one map.
pub trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(&self, arguments: Value) -> BoxedToolFuture;
}

pub struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(&self, arguments: Value) -> BoxedToolFuture {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                debug!("rejecting arguments for {}: {err}", self.name());
                return Box::pin(ready(Err(
                    Error::invalid_input().with_reason(format!("{err}"))
                )));
            }
        };
        let span = debug_span!("tool execute", tool = self.name());
        Box::pin(self.0.execute(input).instrument(span))
    }
}

pub fn into_object<T: Tool>(tool: T) -> Arc<dyn ToolObject> {
    Arc::new(ToolObjectImpl(tool))
}
