//! Report aggregation and topic filtering over analyzed articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::AnalyzedArticle;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Pseudo-topic that disables topic filtering.
pub const ALL_TOPICS: &str = "All";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_articles: usize,
    pub categories: BTreeMap<String, usize>,
}

/// Snapshot of one batch. Built fresh each time and not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub articles: Vec<AnalyzedArticle>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn total_articles(&self) -> usize {
        self.summary.total_articles
    }

    pub fn category_count(&self, category: &str) -> usize {
        self.summary.categories.get(category).copied().unwrap_or(0)
    }
}

pub struct ReportBuilder {
    clock: fn() -> DateTime<Utc>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self { clock: Utc::now }
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different timestamp source, e.g. a fixed one.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }

    /// Aggregate articles into a report, keeping their order.
    pub fn build(&self, articles: Vec<AnalyzedArticle>) -> Report {
        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for article in &articles {
            let category = article.category.trim();
            let key = if category.is_empty() { UNCATEGORIZED } else { category };
            *categories.entry(key.to_string()).or_default() += 1;
        }

        Report {
            timestamp: (self.clock)(),
            summary: ReportSummary {
                total_articles: articles.len(),
                categories,
            },
            articles,
        }
    }
}

/// Distinct lower-cased key insights across `articles`, sorted.
pub fn topics(articles: &[AnalyzedArticle]) -> Vec<String> {
    articles
        .iter()
        .flat_map(|article| article.analysis.key_insights.iter())
        .map(|insight| insight.to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Articles carrying `topic` as one of their key insights, compared case-insensitively.
/// [`ALL_TOPICS`] keeps everything.
pub fn filter_by_topic<'a>(articles: &'a [AnalyzedArticle], topic: &str) -> Vec<&'a AnalyzedArticle> {
    if topic.eq_ignore_ascii_case(ALL_TOPICS) {
        return articles.iter().collect();
    }

    let topic = topic.to_lowercase();
    articles
        .iter()
        .filter(|article| {
            article
                .analysis
                .key_insights
                .iter()
                .any(|insight| insight.to_lowercase() == topic)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::rss::RawArticle;
    use chrono::TimeZone;

    fn analyzed(title: &str, category: &str, insights: &[&str]) -> AnalyzedArticle {
        AnalyzedArticle::new(
            RawArticle {
                title: title.to_string(),
                summary: String::new(),
                url: format!("https://example.com/{}", title),
                source_name: "Feed".to_string(),
                publish_date: String::new(),
                category_hints: vec![],
            },
            Analysis {
                category: category.to_string(),
                key_insights: insights.iter().map(|i| i.to_string()).collect(),
                risks: vec![],
                opportunities: vec![],
                relevance_score: 5,
            },
        )
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_category_counts() {
        let report = ReportBuilder::new().build(vec![
            analyzed("a", "Climate Risk", &[]),
            analyzed("b", "Climate Risk", &[]),
            analyzed("c", "InsureTech", &[]),
        ]);

        assert_eq!(report.total_articles(), 3);
        assert_eq!(report.summary.categories.len(), 2);
        assert_eq!(report.category_count("Climate Risk"), 2);
        assert_eq!(report.category_count("InsureTech"), 1);
        let titles: Vec<&str> = report.articles.iter().map(|a| a.article.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_input() {
        let report = ReportBuilder::new().build(vec![]);
        assert_eq!(report.total_articles(), 0);
        assert!(report.summary.categories.is_empty());
        assert!(report.articles.is_empty());
    }

    #[test]
    fn test_blank_category_counts_as_uncategorized() {
        let report = ReportBuilder::new().build(vec![analyzed("a", "  ", &[])]);
        assert_eq!(report.category_count(UNCATEGORIZED), 1);
    }

    #[test]
    fn test_build_is_deterministic_with_fixed_clock() {
        let builder = ReportBuilder::with_clock(fixed_clock);
        let articles = vec![analyzed("a", "Policies", &[]), analyzed("b", "InsureTech", &[])];

        let first = builder.build(articles.clone());
        let second = builder.build(articles);
        assert_eq!(first, second);
        assert_eq!(first.timestamp, fixed_clock());
    }

    #[test]
    fn test_summary_serializes_like_dashboard_report() {
        let report = ReportBuilder::with_clock(fixed_clock).build(vec![analyzed("a", "Policies", &[])]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["total_articles"], 1);
        assert_eq!(value["summary"]["categories"]["Policies"], 1);
        assert_eq!(value["articles"][0]["category"], "Policies");
    }

    #[test]
    fn test_topics_and_filtering() {
        let articles = vec![
            analyzed("a", "Climate Risk", &["Rising premiums", "Flood exposure"]),
            analyzed("b", "InsureTech", &["rising premiums"]),
            analyzed("c", "Policies", &["New disclosure rules"]),
        ];

        assert_eq!(
            topics(&articles),
            vec![
                "flood exposure".to_string(),
                "new disclosure rules".to_string(),
                "rising premiums".to_string()
            ]
        );

        let filtered = filter_by_topic(&articles, "rising premiums");
        let titles: Vec<&str> = filtered.iter().map(|a| a.article.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        assert_eq!(filter_by_topic(&articles, "all").len(), 3);
        assert!(filter_by_topic(&articles, "premiums").is_empty());
    }
}
