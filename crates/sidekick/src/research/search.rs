//! Web search with fallbacks: Google Custom Search when configured, then
//! DuckDuckGo's HTML endpoint, then deterministic simulated results.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::{ResearchError, Source, USER_AGENT};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
/// Google returns at most this many results per request.
const GOOGLE_MAX_RESULTS: usize = 10;
const SIMULATED_MAX_RESULTS: usize = 5;

static RESULT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*>(.*?)</a>"#)
        .unwrap()
});
static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:a|div|span)\s[^>]*class="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|span)>"#,
    )
    .unwrap()
});
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bhref="([^"]*)""#).unwrap());
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A search engine.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Source>, ResearchError>;
}

/// Tries each backend in turn and falls back to simulated results, so a
/// search always produces an answer.
pub struct WebSearch {
    backends: Vec<Box<dyn SearchBackend>>,
}

impl WebSearch {
    /// Searches with Google (if credentials are given), then DuckDuckGo.
    pub fn online(
        google: Option<(String, String)>,
    ) -> Result<Self, ResearchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(SEARCH_TIMEOUT)
            .build()?;
        let mut search = Self::offline();
        if let Some((api_key, engine_id)) = google {
            search = search.with_backend(GoogleSearch::new(
                client.clone(),
                api_key,
                engine_id,
            ));
        }
        Ok(search.with_backend(DuckDuckGoSearch::new(client)))
    }

    /// Only returns simulated results.
    #[inline]
    pub fn offline() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    #[inline]
    pub fn with_backend<B: SearchBackend + 'static>(mut self, backend: B) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    pub async fn search(&self, query: &str, limit: usize) -> Vec<Source> {
        for backend in &self.backends {
            match backend.search(query, limit).await {
                Ok(results) => {
                    debug!(
                        "{} returned {} results for {query:?}",
                        backend.name(),
                        results.len()
                    );
                    return results;
                }
                Err(err) => warn!("{} search failed: {err}", backend.name()),
            }
        }
        info!("real search unavailable, returning simulated results");
        simulated_results(query, limit)
    }
}

pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    pub fn new(client: reqwest::Client, api_key: String, engine_id: String) -> Self {
        Self {
            client,
            api_key,
            engine_id,
        }
    }
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

fn parse_google(body: GoogleResponse) -> Vec<Source> {
    body.items
        .into_iter()
        .map(|item| Source::new(item.title, item.link, item.snippet))
        .collect()
}

#[async_trait]
impl SearchBackend for GoogleSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Source>, ResearchError> {
        if self.api_key.is_empty() || self.engine_id.is_empty() {
            return Err(ResearchError::NotConfigured("Google"));
        }
        let num = limit.clamp(1, GOOGLE_MAX_RESULTS).to_string();
        let body: GoogleResponse = self
            .client
            .get(GOOGLE_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_google(body))
    }
}

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    #[inline]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Source>, ResearchError> {
        let html = self
            .client
            .get(DUCKDUCKGO_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_duckduckgo(&html, limit))
    }
}

/// Extracts results from DuckDuckGo's HTML page. The snippet of a result
/// is the first snippet between its link and the next result link.
fn parse_duckduckgo(html: &str, limit: usize) -> Vec<Source> {
    let links: Vec<_> = RESULT_LINK.captures_iter(html).collect();
    let mut results = Vec::new();
    for (i, caps) in links.iter().enumerate() {
        if results.len() >= limit {
            break;
        }
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(href) = HREF
            .captures(whole.as_str())
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str()))
        else {
            continue;
        };
        let next_start = links
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map_or(html.len(), |m| m.start());
        let snippet = RESULT_SNIPPET
            .captures(&html[whole.end()..next_start])
            .and_then(|c| c.get(1))
            .map(|m| plain_text(m.as_str()))
            .unwrap_or_default();

        results.push(Source::new(
            plain_text(inner.as_str()),
            resolve_redirect(&href),
            snippet,
        ));
    }
    results
}

/// DuckDuckGo wraps result links in `//duckduckgo.com/l/?uddg=<target>`.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };
    let Ok(url) = Url::parse(&absolute) else {
        return absolute;
    };
    if url.path().starts_with("/l/") {
        if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
    }
    absolute
}

/// Strips tags and collapses whitespace.
pub(crate) fn plain_text(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, " ");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Placeholder results used when no search engine is reachable.
pub fn simulated_results(query: &str, limit: usize) -> Vec<Source> {
    let slug = query.replace(' ', "-");
    (1..=limit.min(SIMULATED_MAX_RESULTS))
        .map(|i| Source {
            title: format!("Article {i}: {query}"),
            url: format!("https://example.com/article-{i}-{slug}"),
            snippet: format!(
                "This is a sample article about {query}. It provides \
                 comprehensive information on the topic, including key \
                 concepts, recent developments, and practical applications. \
                 This is a simulated search result."
            ),
            source: "example.com".to_owned(),
        })
        .collect()
}
