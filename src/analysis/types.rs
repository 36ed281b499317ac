use serde::{Deserialize, Serialize};

use crate::rss::RawArticle;

pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Climate Risk",
    "InsureTech",
    "Policies",
    "Natural Disasters",
    "Market Trends",
    "Regulatory Changes",
];

/// Substituted when the model names a category outside the configured set.
pub const DEFAULT_CATEGORY: &str = "Climate Risk";

pub const MIN_RELEVANCE: u8 = 1;
pub const MAX_RELEVANCE: u8 = 10;

/// Validated model output for one article.
///
/// `category` is always a member of the configured set and `relevance_score`
/// always lies in `1..=10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub category: String,
    pub key_insights: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub relevance_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedArticle {
    pub article: RawArticle,
    pub analysis: Analysis,
    /// Mirrors `analysis.category` for grouping.
    pub category: String,
}

impl AnalyzedArticle {
    pub fn new(article: RawArticle, analysis: Analysis) -> Self {
        Self {
            category: analysis.category.clone(),
            article,
            analysis,
        }
    }
}
