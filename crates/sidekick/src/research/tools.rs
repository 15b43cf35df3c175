use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};

use super::{ContentExtractor, Finding, ResearchContext, WebSearch};

const DEFAULT_RESULTS: usize = 5;
const MAX_RESULTS: usize = 10;
/// Characters of an article shown to the model.
const ARTICLE_PREVIEW: usize = 3000;

/// Registers the research tools over one shared context.
pub fn registry(
    search: Arc<WebSearch>,
    extractor: Arc<ContentExtractor>,
    context: &ResearchContext,
) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(SearchWebTool::new(search, context.clone()))
        .with_tool(ExtractArticleTool::new(extractor))
        .with_tool(SaveFindingTool::new(context.clone()))
}

#[derive(Deserialize, JsonSchema)]
pub struct SearchWebInput {
    #[schemars(description = "The search query to look up.")]
    query: String,
    #[schemars(description = "Number of results to return, default 5.")]
    num_results: Option<usize>,
}

pub struct SearchWebTool {
    search: Arc<WebSearch>,
    context: ResearchContext,
    parameter_schema: Value,
}

impl SearchWebTool {
    pub fn new(search: Arc<WebSearch>, context: ResearchContext) -> Self {
        Self {
            search,
            context,
            parameter_schema: schema_for!(SearchWebInput).to_value(),
        }
    }
}

impl Tool for SearchWebTool {
    type Input = SearchWebInput;

    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns a list of results with titles, URLs and snippets."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchWebInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = Arc::clone(&self.search);
        let context = self.context.clone();
        async move {
            let query = input.query.trim();
            if query.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`query` must not be empty"));
            }
            let limit = input
                .num_results
                .unwrap_or(DEFAULT_RESULTS)
                .clamp(1, MAX_RESULTS);
            info!("searching for {query:?}");
            let results = search.search(query, limit).await;
            context.add_sources(&results);

            if results.is_empty() {
                return Ok("No search results found.".to_owned());
            }
            let mut out = format!("Found {} results:\n\n", results.len());
            for (i, result) in results.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, result.title));
                out.push_str(&format!("   URL: {}\n", result.url));
                out.push_str(&format!("   Summary: {}\n\n", result.snippet));
            }
            Ok(out)
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct ExtractArticleInput {
    #[schemars(description = "The URL of the web page to read.")]
    url: String,
}

pub struct ExtractArticleTool {
    extractor: Arc<ContentExtractor>,
    parameter_schema: Value,
}

impl ExtractArticleTool {
    pub fn new(extractor: Arc<ContentExtractor>) -> Self {
        Self {
            extractor,
            parameter_schema: schema_for!(ExtractArticleInput).to_value(),
        }
    }
}

impl Tool for ExtractArticleTool {
    type Input = ExtractArticleInput;

    fn name(&self) -> &str {
        "extract_article_content"
    }

    fn description(&self) -> &str {
        "Extract and read the full content of a web page. Returns the article title and content."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ExtractArticleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let extractor = Arc::clone(&self.extractor);
        async move {
            info!("extracting content from {}", input.url);
            let article = extractor.extract(&input.url).await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("could not extract {}: {err}", input.url))
            })?;
            let preview: String =
                article.content.chars().take(ARTICLE_PREVIEW).collect();
            Ok(format!(
                "Article: {}\nSource: {}\nContent length: {} characters\n\nContent:\n{preview}",
                article.title, article.source, article.length
            ))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct SaveFindingInput {
    #[schemars(description = "The finding or insight to save.")]
    finding: String,
    #[schemars(description = "The URL where this finding was discovered.")]
    source_url: Option<String>,
}

pub struct SaveFindingTool {
    context: ResearchContext,
    parameter_schema: Value,
}

impl SaveFindingTool {
    pub fn new(context: ResearchContext) -> Self {
        Self {
            context,
            parameter_schema: schema_for!(SaveFindingInput).to_value(),
        }
    }
}

impl Tool for SaveFindingTool {
    type Input = SaveFindingInput;

    fn name(&self) -> &str {
        "save_research_finding"
    }

    fn description(&self) -> &str {
        "Save an important finding or key insight. Saved findings are used in the final report."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SaveFindingInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let context = self.context.clone();
        async move {
            let finding = input.finding.trim();
            if finding.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`finding` must not be empty"));
            }
            let preview: String = finding.chars().take(100).collect();
            info!("saving finding: {preview}");
            let total = context.add_finding(Finding {
                finding: finding.to_owned(),
                source_url: input.source_url.filter(|url| !url.is_empty()),
            });
            Ok(format!(
                "Finding saved successfully. Total findings: {total}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sidekick_model::ToolCallRequest;

    use super::*;

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_tools_share_context() {
        let context = ResearchContext::new();
        let registry = registry(
            Arc::new(WebSearch::offline()),
            Arc::new(ContentExtractor::offline()),
            &context,
        );

        let found = registry
            .call(&request("search_web", json!({"query": "solar power", "num_results": 2})))
            .await
            .unwrap();
        assert!(found.starts_with("Found 2 results:\n\n1. Article 1: solar power\n"));
        assert!(found.contains("   URL: https://example.com/article-2-solar-power\n"));
        assert_eq!(context.sources().len(), 2);

        let saved = registry
            .call(&request(
                "save_research_finding",
                json!({"finding": "Panels are cheap", "source_url": "https://example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(saved, "Finding saved successfully. Total findings: 1");
        assert_eq!(
            context.findings()[0].source_url.as_deref(),
            Some("https://example.com")
        );

        let article = registry
            .call(&request(
                "extract_article_content",
                json!({"url": "https://example.com/article-1-solar-power"}),
            ))
            .await
            .unwrap();
        assert!(article.starts_with("Article: Article about article 1 solar power\nSource: example.com\n"));

        let err = registry
            .call(&request("extract_article_content", json!({"url": "nope"})))
            .await
            .unwrap_err();
        assert!(err.reason().contains("invalid URL"));
    }
}
