//! Wiring of each assistant: prompt, tools and history window on top of a
//! caller-provided [`SessionBuilder`].
//!
//! The caller decides the model provider and the callbacks; everything
//! domain-specific is filled in here from the [`AppConfig`].

use std::sync::Arc;

use sidekick_model::ModelProvider;
use thiserror::Error;

use crate::config::AppConfig;
use crate::finance::tools::FinanceContext;
use crate::finance::{self, CategoryRules, FinanceError, Ledger};
use crate::orchestrator::{self, Orchestrator, Specialist};
use crate::research::{
    self, ContentExtractor, ReportGenerator, ResearchAssistant, ResearchContext,
    ResearchError, WebSearch,
};
use crate::review;
use crate::session::{Session, SessionBuilder};
use crate::support::{self, KnowledgeBase, SupportError, TicketStore};
use crate::weather::{self, OpenMeteoClient, WeatherError};

pub const WEATHER_HISTORY_TURNS: usize = 10;
pub const RESEARCH_HISTORY_TURNS: usize = 15;
pub const FINANCE_HISTORY_TURNS: usize = 20;
pub const REVIEW_HISTORY_TURNS: usize = 10;
pub const SUPPORT_HISTORY_TURNS: usize = 20;

const WEATHER_PROMPT: &str = include_str!("prompts/weather.md");
const RESEARCH_PROMPT: &str = include_str!("prompts/research.md");
const FINANCE_PROMPT: &str = include_str!("prompts/finance.md");
const REVIEW_PROMPT: &str = include_str!("prompts/review.md");
const SUPPORT_PROMPT: &str = include_str!("prompts/support.md");

/// Failures while preparing an assistant's resources.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not open the finance ledger: {0}")]
    Finance(#[from] FinanceError),
    #[error("could not set up research: {0}")]
    Research(#[from] ResearchError),
    #[error("could not set up the weather client: {0}")]
    Weather(#[from] WeatherError),
    #[error("could not open support data: {0}")]
    Support(#[from] SupportError),
}

pub fn weather(
    builder: SessionBuilder,
    config: &AppConfig,
) -> Result<Session, SetupError> {
    let tools = weather::tools::registry(OpenMeteoClient::new()?, config.weather_units);
    Ok(builder
        .with_system_prompt(WEATHER_PROMPT)
        .with_tools(tools)
        .with_max_history_turns(WEATHER_HISTORY_TURNS)
        .with_label("weather_assistant")
        .build())
}

pub fn finance(
    builder: SessionBuilder,
    config: &AppConfig,
) -> Result<Session, SetupError> {
    let ledger = Ledger::open(
        &config.finance_db(),
        CategoryRules::with_policy(config.category_policy),
    )?;
    let ctx = FinanceContext::new(Arc::new(ledger), &config.currency_symbol);
    Ok(builder
        .with_system_prompt(FINANCE_PROMPT)
        .with_tools(finance::tools::registry(&ctx))
        .with_max_history_turns(FINANCE_HISTORY_TURNS)
        .with_label("finance_assistant")
        .build())
}

fn research_backends(
    config: &AppConfig,
) -> Result<(Arc<WebSearch>, Arc<ContentExtractor>), SetupError> {
    if config.research_offline {
        info!("research runs offline with simulated results");
        return Ok((
            Arc::new(WebSearch::offline()),
            Arc::new(ContentExtractor::offline()),
        ));
    }
    let google = config
        .google_search
        .as_ref()
        .map(|google| (google.api_key.clone(), google.engine_id.clone()));
    Ok((
        Arc::new(WebSearch::online(google)?),
        Arc::new(ContentExtractor::online()?),
    ))
}

pub fn research(
    builder: SessionBuilder,
    config: &AppConfig,
) -> Result<ResearchAssistant, SetupError> {
    let (search, extractor) = research_backends(config)?;
    let context = ResearchContext::new();
    let session = builder
        .with_system_prompt(RESEARCH_PROMPT)
        .with_tools(research::tools::registry(search, extractor, &context))
        .with_max_history_turns(RESEARCH_HISTORY_TURNS)
        .with_label("research_assistant")
        .build();
    let reports = ReportGenerator::new(config.reports_dir())
        .with_template(config.report_template)
        .with_citation_format(config.citation_format);
    Ok(ResearchAssistant::new(session, context, reports))
}

pub fn review(builder: SessionBuilder) -> Session {
    builder
        .with_system_prompt(REVIEW_PROMPT)
        .with_tools(review::tools::registry())
        .with_max_history_turns(REVIEW_HISTORY_TURNS)
        .with_label("code_reviewer")
        .build()
}

pub fn support(
    builder: SessionBuilder,
    config: &AppConfig,
) -> Result<Session, SetupError> {
    let tickets = TicketStore::open(config.tickets_dir())?;
    let knowledge =
        KnowledgeBase::open(&config.knowledge_index(), config.knowledge_dir())?;
    Ok(builder
        .with_system_prompt(SUPPORT_PROMPT)
        .with_tools(support::tools::registry(
            Arc::new(tickets),
            Arc::new(knowledge),
        ))
        .with_max_history_turns(SUPPORT_HISTORY_TURNS)
        .with_label("support_assistant")
        .build())
}

/// Builds the coordinator from `coordinator` and every specialist from a
/// clone of `provider`.
pub fn orchestrator<M>(
    coordinator: SessionBuilder,
    provider: M,
    config: &AppConfig,
) -> Result<Orchestrator, SetupError>
where
    M: ModelProvider + Clone + 'static,
{
    let (search, extractor) = research_backends(config)?;
    let context = ResearchContext::new();
    Ok(Orchestrator::build(coordinator, |kind| {
        let tools = match kind {
            Specialist::Research => research::tools::registry(
                Arc::clone(&search),
                Arc::clone(&extractor),
                &context,
            ),
            Specialist::Analysis => orchestrator::tools::analysis_registry(),
            Specialist::Code => review::tools::registry(),
            Specialist::Report => orchestrator::tools::report_registry(),
        };
        SessionBuilder::with_model_provider(provider.clone()).with_tools(tools)
    }))
}
