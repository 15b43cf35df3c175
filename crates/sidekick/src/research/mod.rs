//! Research assistant: web search, article extraction, saved findings and
//! report generation.

mod context;
mod error;
mod extract;
mod report;
mod search;
pub mod tools;

use std::path::PathBuf;

use url::Url;

pub use context::{Finding, ResearchContext};
pub use error::ResearchError;
pub use extract::{
    Article, ContentExtractor, MAX_CONTENT_LENGTH, MIN_CONTENT_LENGTH,
    parse_article, validate_url,
};
pub use report::{CitationFormat, ReportGenerator, ReportTemplate};
pub use search::{
    DuckDuckGoSearch, GoogleSearch, SearchBackend, WebSearch, simulated_results,
};

use crate::session::Session;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Sources requested when researching a report.
pub const DEFAULT_NUM_SOURCES: usize = 5;

/// A search result or any other cited page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Host name of `url`, empty if it has none.
    pub source: String,
}

impl Source {
    pub fn new(title: String, url: String, snippet: String) -> Self {
        let source = source_name(&url);
        Self {
            title,
            url,
            snippet,
            source,
        }
    }
}

pub(crate) fn source_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default()
}

/// A generated report, and where it was saved.
#[derive(Clone, Debug)]
pub struct ResearchReport {
    pub content: String,
    pub path: Option<PathBuf>,
}

/// A research session: the agent plus the sources and findings its tools
/// collect.
pub struct ResearchAssistant {
    session: Session,
    context: ResearchContext,
    reports: ReportGenerator,
}

impl ResearchAssistant {
    /// `context` must be the one the session's research tools write to.
    pub fn new(
        session: Session,
        context: ResearchContext,
        reports: ReportGenerator,
    ) -> Self {
        Self {
            session,
            context,
            reports,
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn context(&self) -> &ResearchContext {
        &self.context
    }

    pub async fn query(&self, message: &str) -> Result<String, ResearchError> {
        Ok(self.session.query(message).await?)
    }

    /// Clears collected research and starts a new conversation.
    pub fn reset(&self) {
        self.context.clear();
        self.session.reset();
    }

    /// Researches `topic` and assembles a report from the answer, the
    /// saved findings and the collected sources.
    ///
    /// Previously collected research is discarded first. With
    /// `output_file`, the report is also written to the output directory.
    pub async fn generate_report(
        &self,
        topic: &str,
        num_sources: usize,
        output_file: Option<&str>,
    ) -> Result<ResearchReport, ResearchError> {
        info!("generating report on {topic:?}");
        self.context.clear();

        let prompt = format!(
            "Please conduct comprehensive research on the topic: \"{topic}\"\n\n\
             Follow these steps:\n\
             1. Search for reliable sources on this topic (aim for {num_sources} sources)\n\
             2. Extract and read content from the most promising sources\n\
             3. Save key findings as you discover them using save_research_finding\n\
             4. After gathering information, provide a comprehensive summary\n\n\
             Focus on factual information from credible sources."
        );
        let summary = self.session.query(&prompt).await?;

        let findings: Vec<String> = self
            .context
            .findings()
            .into_iter()
            .map(|f| f.finding)
            .collect();
        let content = self.reports.generate_report(
            topic,
            &summary,
            &findings,
            &self.context.sources(),
            &[],
        );

        let path = match output_file {
            Some(name) => {
                let reports = self.reports.clone();
                let body = content.clone();
                let name = name.to_owned();
                let saved = tokio::task::spawn_blocking(move || {
                    reports.save_report(&body, &name)
                })
                .await
                .map_err(|err| ResearchError::Io(std::io::Error::other(err)))?;
                Some(saved?)
            }
            None => None,
        };
        Ok(ResearchReport { content, path })
    }
}
