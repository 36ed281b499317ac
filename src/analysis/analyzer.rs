use std::sync::Arc;
use tracing::{debug, info, warn};

use super::parsing::parse_analysis;
use super::types::{AnalyzedArticle, DEFAULT_CATEGORIES, DEFAULT_CATEGORY};
use crate::error::Result;
use crate::llm::CompletionClient;
use crate::prompt::{article_analysis_prompt, ANALYST_SYSTEM_PROMPT};
use crate::rss::RawArticle;
use crate::TARGET_LLM_REQUEST;

/// Sends articles to a completion endpoint and validates what comes back.
pub struct ArticleAnalyzer {
    client: Arc<dyn CompletionClient>,
    categories: Vec<String>,
    default_category: String,
}

impl ArticleAnalyzer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Replace the category enumeration. `default_category` should be one of `categories`.
    pub fn with_categories(mut self, categories: Vec<String>, default_category: &str) -> Self {
        self.categories = categories;
        self.default_category = default_category.to_string();
        self
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Analyze one article; every failure is logged and turned into `None`.
    pub async fn analyze(&self, article: &RawArticle) -> Option<AnalyzedArticle> {
        match self.try_analyze(article).await {
            Ok(analyzed) => Some(analyzed),
            Err(err) => {
                warn!(target: TARGET_LLM_REQUEST, "Error analyzing {}: {}", article.title, err);
                None
            }
        }
    }

    /// One completion request, no retries.
    pub async fn try_analyze(&self, article: &RawArticle) -> Result<AnalyzedArticle> {
        let prompt = article_analysis_prompt(article, &self.categories);
        debug!(target: TARGET_LLM_REQUEST, "Analyzing article: {}", article.title);

        let response = self.client.complete(ANALYST_SYSTEM_PROMPT, &prompt).await?;
        let analysis = parse_analysis(&response, &self.categories, &self.default_category)?;

        info!(
            target: TARGET_LLM_REQUEST,
            "Analyzed {} as {} (relevance {})",
            article.title,
            analysis.category,
            analysis.relevance_score
        );

        Ok(AnalyzedArticle::new(article.clone(), analysis))
    }
}
