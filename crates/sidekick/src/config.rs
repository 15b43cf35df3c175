//! Application configuration, read once from the environment at startup.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use sidekick_openai_model::{OpenAIConfig, OpenAIConfigBuilder};
use thiserror::Error;

use crate::finance::CategoryPolicy;
use crate::research::{CitationFormat, ReportTemplate};
use crate::weather::Units;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CURRENCY_SYMBOL: &str = "$";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY or GOOGLE_API_KEY must be set")]
    MissingApiKey,
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Credentials for the Google Custom Search API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoogleSearchConfig {
    pub api_key: String,
    pub engine_id: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub model: OpenAIConfig,
    /// Root of everything the assistants persist.
    pub data_dir: PathBuf,
    pub currency_symbol: String,
    pub category_policy: CategoryPolicy,
    pub google_search: Option<GoogleSearchConfig>,
    /// Use simulated search results and articles instead of the network.
    pub research_offline: bool,
    pub report_template: ReportTemplate,
    pub citation_format: CitationFormat,
    pub weather_units: Units,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration from `lookup`, which maps variable names to
    /// values. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = get("OPENAI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;
        let mut model = OpenAIConfigBuilder::with_api_key(api_key);
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            model = model.with_base_url(base_url);
        }
        if let Some(name) = get("OPENAI_MODEL") {
            model = model.with_model(name);
        }

        let google_search = match (
            get("GOOGLE_SEARCH_API_KEY"),
            get("GOOGLE_SEARCH_ENGINE_ID"),
        ) {
            (Some(api_key), Some(engine_id)) => {
                Some(GoogleSearchConfig { api_key, engine_id })
            }
            _ => None,
        };

        Ok(Self {
            model: model.build(),
            data_dir: get("SIDEKICK_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned())
                .into(),
            currency_symbol: get("SIDEKICK_CURRENCY_SYMBOL")
                .unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_owned()),
            category_policy: parse(&get, "SIDEKICK_CATEGORY_POLICY")?,
            google_search,
            research_offline: get("SIDEKICK_RESEARCH_OFFLINE")
                .map(|value| parse_flag("SIDEKICK_RESEARCH_OFFLINE", &value))
                .transpose()?
                .unwrap_or(false),
            report_template: parse(&get, "SIDEKICK_REPORT_TEMPLATE")?,
            citation_format: parse(&get, "SIDEKICK_CITATION_FORMAT")?,
            weather_units: parse(&get, "SIDEKICK_WEATHER_UNITS")?,
        })
    }

    pub fn finance_db(&self) -> PathBuf {
        self.data_dir.join("finance.db")
    }

    pub fn tickets_dir(&self) -> PathBuf {
        self.data_dir.join("tickets")
    }

    /// Where the knowledge base documents are read from.
    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join("knowledge")
    }

    pub fn knowledge_index(&self) -> PathBuf {
        self.data_dir.join("vectordb").join("knowledge.sqlite3")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

/// Parses an optional variable, falling back to the type's default.
fn parse<T, G>(get: &G, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr + Default,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            var,
            reason: err.to_string(),
        }),
        None => Ok(T::default()),
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("GOOGLE_API_KEY", "key")]).unwrap();
        assert_eq!(config.model.model(), "gemini-2.0-flash");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.finance_db(), PathBuf::from("data/finance.db"));
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.category_policy, CategoryPolicy::Lenient);
        assert_eq!(config.google_search, None);
        assert!(!config.research_offline);
        assert_eq!(config.report_template, ReportTemplate::Structured);
        assert_eq!(config.citation_format, CitationFormat::Markdown);
        assert_eq!(config.weather_units, Units::Metric);
        assert!(!format!("{config:?}").contains("key\""));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("SIDEKICK_DATA_DIR", "/tmp/sk"),
            ("SIDEKICK_CURRENCY_SYMBOL", "€"),
            ("SIDEKICK_CATEGORY_POLICY", "strict"),
            ("GOOGLE_SEARCH_API_KEY", "g"),
            ("GOOGLE_SEARCH_ENGINE_ID", "cx"),
            ("SIDEKICK_RESEARCH_OFFLINE", "yes"),
            ("SIDEKICK_REPORT_TEMPLATE", "detailed"),
            ("SIDEKICK_CITATION_FORMAT", "apa"),
            ("SIDEKICK_WEATHER_UNITS", "imperial"),
        ])
        .unwrap();
        assert_eq!(config.model.model(), "gpt-4o-mini");
        assert_eq!(config.tickets_dir(), PathBuf::from("/tmp/sk/tickets"));
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.category_policy, CategoryPolicy::Strict);
        assert_eq!(
            config.google_search,
            Some(GoogleSearchConfig {
                api_key: "g".to_owned(),
                engine_id: "cx".to_owned(),
            })
        );
        assert!(config.research_offline);
        assert_eq!(config.report_template, ReportTemplate::Detailed);
        assert_eq!(config.citation_format, CitationFormat::Apa);
        assert_eq!(config.weather_units, Units::Imperial);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            config(&[("OPENAI_API_KEY", "  ")]),
            Err(ConfigError::MissingApiKey)
        ));
        let err = config(&[("OPENAI_API_KEY", "k"), ("SIDEKICK_WEATHER_UNITS", "kelvin")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for SIDEKICK_WEATHER_UNITS: unknown units 'kelvin'"
        );
        assert!(matches!(
            config(&[("OPENAI_API_KEY", "k"), ("SIDEKICK_RESEARCH_OFFLINE", "maybe")]),
            Err(ConfigError::Invalid { var: "SIDEKICK_RESEARCH_OFFLINE", .. })
        ));
    }
}
