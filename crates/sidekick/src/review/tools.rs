use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};
use tokio::task::spawn_blocking;

use super::{ReviewError, SourceFile};

/// Registers the code review tools.
pub fn registry() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(ReviewTool::new(
            "analyze_code",
            "Analyze code structure, get line counts, and identify functions and classes.",
            SourceFile::structure_report,
        ))
        .with_tool(ReviewTool::new(
            "check_code_metrics",
            "Check code complexity and quality metrics including cyclomatic complexity and function lengths.",
            SourceFile::metrics_report,
        ))
        .with_tool(ReviewTool::new(
            "detect_issues",
            "Detect common code issues, anti-patterns, and style violations.",
            SourceFile::issues_report,
        ))
}

#[derive(Deserialize, JsonSchema)]
pub struct FileInput {
    #[schemars(description = "Path to the code file.")]
    file_path: String,
}

/// Loads a file and renders one report over it.
pub struct ReviewTool {
    name: &'static str,
    description: &'static str,
    report: fn(&SourceFile) -> String,
    parameter_schema: Value,
}

impl ReviewTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        report: fn(&SourceFile) -> String,
    ) -> Self {
        Self {
            name,
            description,
            report,
            parameter_schema: schema_for!(FileInput).to_value(),
        }
    }
}

fn review_error(err: ReviewError) -> ToolError {
    let base = if err.is_invalid_input() {
        ToolError::invalid_input()
    } else {
        ToolError::execution_error()
    };
    base.with_reason(err.to_string())
}

impl Tool for ReviewTool {
    type Input = FileInput;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: FileInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let name = self.name;
        let report = self.report;
        async move {
            debug!("running {name} on {}", input.file_path);
            let path = input.file_path;
            spawn_blocking(move || SourceFile::load(&path).map(|file| report(&file)))
                .await
                .map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("could not run {name}: {err}"))
                })?
                .map_err(review_error)
        }
    }
}
