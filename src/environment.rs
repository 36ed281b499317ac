use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{DEFAULT_CATEGORIES, DEFAULT_CATEGORY};
use crate::error::{Error, Result};
use crate::llm::{ollama_client, openai_client};
use crate::pipeline::DEFAULT_ANALYSIS_CONCURRENCY;
use crate::research::{
    ResearchFinder, TavilyClient, DEFAULT_MAX_PAPERS, DEFAULT_RESEARCH_DOMAINS,
    DEFAULT_RESEARCH_TIMEOUT,
};
use crate::rss::{FeedSource, DEFAULT_CACHE_TIMEOUT, DEFAULT_MAX_ITEMS};
use crate::LLMParams;

pub const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Splits a delimited setting into trimmed, non-empty items.
fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The feeds the service was originally deployed against.
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "Reuters Sustainability",
            "https://www.reutersagency.com/feed/?taxonomy=best-topics&post_type=best",
            &["climate", "sustainability", "insurance", "risk"],
        ),
        FeedSource::new(
            "Insurance Journal",
            "https://www.insurancejournal.com/feed/",
            &["climate", "risk", "natural disaster", "sustainability"],
        ),
        FeedSource::new(
            "The Guardian Environment",
            "https://www.theguardian.com/environment/climate-crisis/rss",
            &[],
        ),
        FeedSource::new(
            "Science Daily Environment",
            "https://www.sciencedaily.com/rss/earth_climate/climate.xml",
            &["insurance", "risk", "economic"],
        ),
        FeedSource::new(
            "Nature Climate Change",
            "https://www.nature.com/nclimate.rss",
            &["insurance", "risk", "economic", "policy"],
        ),
    ]
}

/// Parse `name|url|kw1,kw2;name|url;...`. The keyword part is optional.
pub fn parse_sources(value: &str) -> Result<Vec<FeedSource>> {
    split_list(value, ';')
        .iter()
        .map(|entry| {
            let mut parts = entry.splitn(3, '|').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let url = parts.next().unwrap_or_default();
            if name.is_empty() || url.is_empty() {
                return Err(Error::Config(format!(
                    "feed source must look like name|url|keywords, got '{}'",
                    entry
                )));
            }
            let keywords = parts.next().map(|k| split_list(k, ',')).unwrap_or_default();

            Ok(FeedSource {
                name: name.to_string(),
                url: url.to_string(),
                keywords,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    OpenAI {
        api_key: String,
        api_base: String,
    },
    Ollama {
        host: String,
        port: u16,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<FeedSource>,
    pub categories: Vec<String>,
    pub default_category: String,
    pub research_domains: Vec<String>,
    pub cache_timeout: Duration,
    pub max_items: usize,
    pub max_research_papers: usize,
    pub research_timeout: Duration,
    pub update_interval: Duration,
    pub analysis_concurrency: usize,
    pub llm_backend: LlmBackend,
    pub llm_model: String,
    pub temperature: f32,
    pub tavily_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            default_category: DEFAULT_CATEGORY.to_string(),
            research_domains: DEFAULT_RESEARCH_DOMAINS.iter().map(|d| d.to_string()).collect(),
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            max_items: DEFAULT_MAX_ITEMS,
            max_research_papers: DEFAULT_MAX_PAPERS,
            research_timeout: DEFAULT_RESEARCH_TIMEOUT,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            analysis_concurrency: DEFAULT_ANALYSIS_CONCURRENCY,
            llm_backend: LlmBackend::OpenAI {
                api_key: String::new(),
                api_base: DEFAULT_LLM_API_BASE.to_string(),
            },
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.0,
            tavily_api_key: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment and validate them.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Settings::default();

        if let Some(value) = get("FEED_SOURCES") {
            settings.sources = parse_sources(&value)?;
        }
        if let Some(value) = get("CATEGORIES") {
            settings.categories = split_list(&value, ';');
        }
        if let Some(value) = get("DEFAULT_CATEGORY") {
            settings.default_category = value;
        }
        if let Some(value) = get("RESEARCH_DOMAINS") {
            settings.research_domains = split_list(&value, ';');
        }
        if let Some(value) = get("RSS_CACHE_TIMEOUT") {
            settings.cache_timeout = Duration::from_secs(parse_value("RSS_CACHE_TIMEOUT", &value)?);
        }
        if let Some(value) = get("MAX_RSS_ITEMS") {
            settings.max_items = parse_value("MAX_RSS_ITEMS", &value)?;
        }
        if let Some(value) = get("MAX_RESEARCH_PAPERS") {
            settings.max_research_papers = parse_value("MAX_RESEARCH_PAPERS", &value)?;
        }
        if let Some(value) = get("RESEARCH_TIMEOUT") {
            settings.research_timeout = Duration::from_secs(parse_value("RESEARCH_TIMEOUT", &value)?);
        }
        if let Some(value) = get("UPDATE_INTERVAL") {
            let minutes: u64 = parse_value("UPDATE_INTERVAL", &value)?;
            let seconds = minutes.checked_mul(60).ok_or_else(|| {
                Error::Config(format!("UPDATE_INTERVAL '{}' is too large", value))
            })?;
            settings.update_interval = Duration::from_secs(seconds);
        }
        if let Some(value) = get("ANALYSIS_CONCURRENCY") {
            settings.analysis_concurrency = parse_value("ANALYSIS_CONCURRENCY", &value)?;
        }
        if let Some(value) = get("LLM_TEMPERATURE") {
            settings.temperature = parse_value("LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("LLM_MODEL") {
            settings.llm_model = value;
        }

        let llm_type = get("LLM_TYPE").unwrap_or_else(|| "openai".to_string());
        settings.llm_backend = match llm_type.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI {
                api_key: get("LLM_API_KEY").unwrap_or_default(),
                api_base: get("LLM_API_BASE").unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string()),
            },
            "ollama" => LlmBackend::Ollama {
                host: get("OLLAMA_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: get("OLLAMA_PORT")
                    .map(|port| parse_value("OLLAMA_PORT", &port))
                    .transpose()?
                    .unwrap_or(11434),
            },
            other => {
                return Err(Error::Config(format!(
                    "LLM_TYPE must be 'openai' or 'ollama', got '{}'",
                    other
                )))
            }
        };

        settings.tavily_api_key = get("TAVILY_API_KEY");

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config("at least one category is required".to_string()));
        }
        if !self.categories.contains(&self.default_category) {
            return Err(Error::Config(format!(
                "default category '{}' is not one of: {}",
                self.default_category,
                self.categories.join(", ")
            )));
        }
        if self.max_items == 0 {
            return Err(Error::Config("MAX_RSS_ITEMS must be at least 1".to_string()));
        }
        if self.max_research_papers == 0 {
            return Err(Error::Config("MAX_RESEARCH_PAPERS must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(Error::Config(format!("duplicate feed source name '{}'", source.name)));
            }
        }

        Ok(())
    }

    pub fn source(&self, name: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn llm_params(&self) -> LLMParams {
        let llm_client = match &self.llm_backend {
            LlmBackend::OpenAI { api_key, api_base } => openai_client(api_key, Some(api_base)),
            LlmBackend::Ollama { host, port } => ollama_client(host, *port),
        };

        LLMParams {
            llm_client,
            model: self.llm_model.clone(),
            temperature: self.temperature,
        }
    }

    /// A Tavily-backed finder, or a disabled one when no API key is configured.
    pub fn research_finder(&self) -> Result<ResearchFinder> {
        let finder = match &self.tavily_api_key {
            Some(api_key) => {
                ResearchFinder::new(Arc::new(TavilyClient::new(api_key, self.research_timeout)?))
            }
            None => ResearchFinder::disabled(),
        };

        Ok(finder
            .with_domains(self.research_domains.clone())
            .with_max_results(self.max_research_papers)
            .with_timeout(self.research_timeout))
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("invalid {} '{}': {}", key, value, e)))
}
