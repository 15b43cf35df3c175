//! Tool call supports.

mod error;
mod object;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use registry::ToolRegistry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// Renders a tool result into the text the model will read.
#[inline]
pub fn render_result(result: &ToolResult) -> String {
    match result {
        Ok(output) => output.clone(),
        Err(err) => format!("Error: {}", err.reason()),
    }
}

/// A tool that can be called by the model.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as a database handle or the
/// current configuration. To do this, make the context an immutable state of
/// the tool (usually behind an `Arc`), which can be set during
/// initialization, and clone it when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
