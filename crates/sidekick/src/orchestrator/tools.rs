use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};
use tokio::time::timeout;

use super::Specialist;
use crate::session::Session;

/// One delegation tool per specialist.
pub fn delegation_registry(
    specialists: &[(Specialist, Session)],
    timeout: Duration,
) -> ToolRegistry {
    specialists
        .iter()
        .fold(ToolRegistry::new(), |registry, (kind, session)| {
            registry.with_tool(DelegateTool::new(*kind, session.clone(), timeout))
        })
}

/// Tools of the analysis specialist.
pub fn analysis_registry() -> ToolRegistry {
    ToolRegistry::new().with_tool(StatisticsTool::new())
}

/// Tools of the report specialist.
pub fn report_registry() -> ToolRegistry {
    ToolRegistry::new().with_tool(FormatReportTool::new())
}

#[derive(Deserialize, JsonSchema)]
pub struct DelegateInput {
    #[schemars(description = "The subtask, with all context the specialist needs.")]
    task: String,
}

/// Hands a task to a specialist and returns its answer.
///
/// Delegations to one specialist share its session and run one after
/// another. A timed-out delegation resets the specialist only when no
/// other delegation to it is still waiting, so concurrent calls are not
/// cancelled by a slow neighbour.
pub struct DelegateTool {
    specialist: Specialist,
    session: Session,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
    description: String,
    parameter_schema: Value,
}

impl DelegateTool {
    pub fn new(specialist: Specialist, session: Session, timeout: Duration) -> Self {
        Self {
            specialist,
            session,
            timeout,
            in_flight: Arc::default(),
            description: format!(
                "Delegate a subtask to the {}. {}",
                specialist.title(),
                specialist.prompt()
            ),
            parameter_schema: schema_for!(DelegateInput).to_value(),
        }
    }
}

impl Tool for DelegateTool {
    type Input = DelegateInput;

    fn name(&self) -> &str {
        self.specialist.tool_name()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: DelegateInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let session = self.session.clone();
        let limit = self.timeout;
        let title = self.specialist.title();
        let in_flight = Arc::clone(&self.in_flight);
        async move {
            let task = input.task.trim();
            if task.is_empty() {
                return Err(ToolError::invalid_input().with_reason("task must not be empty"));
            }
            info!("delegating to {title}: {task}");
            let pending = Pending::enter(in_flight);
            match timeout(limit, session.query(task)).await {
                Ok(Ok(answer)) => Ok(answer),
                Ok(Err(err)) => Err(ToolError::execution_error()
                    .with_reason(format!("{title} failed: {err}"))),
                Err(_) => {
                    warn!("{title} timed out after {limit:?}");
                    if pending.leave() {
                        // Drop whatever the specialist was still doing.
                        session.reset();
                    }
                    Err(ToolError::execution_error().with_reason(format!(
                        "{title} did not finish within {} seconds",
                        limit.as_secs()
                    )))
                }
            }
        }
    }
}

/// Counts a delegation as waiting until dropped or left.
struct Pending(Option<Arc<AtomicUsize>>);

impl Pending {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Some(counter))
    }

    /// Returns `true` if no other delegation is still waiting.
    fn leave(mut self) -> bool {
        self.0
            .take()
            .is_some_and(|counter| counter.fetch_sub(1, Ordering::SeqCst) == 1)
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if let Some(counter) = self.0.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct StatisticsInput {
    #[schemars(description = "The numbers to analyze.")]
    values: Vec<f64>,
    #[schemars(description = "What the numbers measure, used in the output.")]
    label: Option<String>,
}

/// Descriptive statistics over a list of numbers.
pub struct StatisticsTool {
    parameter_schema: Value,
}

impl StatisticsTool {
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(StatisticsInput).to_value(),
        }
    }
}

impl Default for StatisticsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for StatisticsTool {
    type Input = StatisticsInput;

    fn name(&self) -> &str {
        "compute_statistics"
    }

    fn description(&self) -> &str {
        "Compute count, mean, median, range, standard deviation and trend of a list of numbers."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: StatisticsInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            if input.values.is_empty() {
                return Err(ToolError::invalid_input().with_reason("values must not be empty"));
            }
            if input.values.iter().any(|v| !v.is_finite()) {
                return Err(ToolError::invalid_input().with_reason("values must be finite numbers"));
            }
            Ok(describe_values(
                input.label.as_deref().unwrap_or("values"),
                &input.values,
            ))
        }
    }
}

fn describe_values(label: &str, values: &[f64]) -> String {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    // Compares the mean of the first and second halves, in input order.
    let trend = if values.len() < 2 {
        "not enough data"
    } else {
        let half = values.len() / 2;
        let first = values[..half].iter().sum::<f64>() / half as f64;
        let second =
            values[values.len() - half..].iter().sum::<f64>() / half as f64;
        let tolerance = mean.abs() * 0.05;
        if second - first > tolerance {
            "increasing"
        } else if first - second > tolerance {
            "decreasing"
        } else {
            "stable"
        }
    };

    let mut out = format!("Statistics for {label} ({} values):\n", values.len());
    let _ = writeln!(out, "  Mean: {mean:.2}");
    let _ = writeln!(out, "  Median: {median:.2}");
    let _ = writeln!(out, "  Min: {:.2}", sorted[0]);
    let _ = writeln!(out, "  Max: {:.2}", sorted[sorted.len() - 1]);
    let _ = writeln!(out, "  Standard Deviation: {:.2}", variance.sqrt());
    let _ = writeln!(out, "  Trend: {trend}");
    out
}

#[derive(Clone, Copy, Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Html,
    Text,
}

#[derive(Deserialize, JsonSchema)]
pub struct FormatReportInput {
    #[schemars(description = "Report title.")]
    title: String,
    #[schemars(description = "Report body. Paragraphs are separated by blank lines.")]
    content: String,
    #[schemars(description = "Output format: markdown (default), html or text.")]
    format: Option<ReportFormat>,
}

pub struct FormatReportTool {
    parameter_schema: Value,
}

impl FormatReportTool {
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(FormatReportInput).to_value(),
        }
    }
}

impl Default for FormatReportTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FormatReportTool {
    type Input = FormatReportInput;

    fn name(&self) -> &str {
        "format_report"
    }

    fn description(&self) -> &str {
        "Format content into a structured report (markdown, html, text)."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: FormatReportInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            Ok(format_report(
                input.title.trim(),
                &input.content,
                input.format.unwrap_or_default(),
            ))
        }
    }
}

fn format_report(title: &str, content: &str, format: ReportFormat) -> String {
    let paragraphs: Vec<&str> = content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match format {
        ReportFormat::Markdown => {
            format!("# {title}\n\n{}\n", paragraphs.join("\n\n"))
        }
        ReportFormat::Text => {
            let rule = "=".repeat(title.chars().count());
            format!("{title}\n{rule}\n\n{}\n", paragraphs.join("\n\n"))
        }
        ReportFormat::Html => {
            let mut out = format!("<h1>{}</h1>\n", escape_html(title));
            for paragraph in paragraphs {
                let _ = writeln!(out, "<p>{}</p>", escape_html(paragraph));
            }
            out
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
