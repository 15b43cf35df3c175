use sidekick_core::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("{0} search is not configured")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("insufficient content extracted ({0} characters)")]
    InsufficientContent(usize),
    #[error("cannot convert page to text: {0}")]
    Conversion(String),
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("research failed: {0}")]
    Agent(#[from] AgentError),
}
