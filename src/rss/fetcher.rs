//! Per-source feed fetching: cache lookup, item cap, keyword filter, normalization.

use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::cache::FeedCache;
use super::client::FeedClient;
use super::types::{
    FeedSource, RawArticle, RawFeedEntry, DEFAULT_CACHE_TIMEOUT, DEFAULT_MAX_ITEMS, UNTITLED,
};
use super::util::{collapse_whitespace, first_non_empty, is_valid_url, matches_keywords, strip_html};
use crate::error::{Error, Result};
use crate::TARGET_WEB_REQUEST;

pub struct FeedFetcher {
    client: Arc<dyn FeedClient>,
    cache: Arc<FeedCache>,
    freshness: Duration,
    max_items: usize,
}

impl FeedFetcher {
    pub fn new(client: Arc<dyn FeedClient>, cache: Arc<FeedCache>) -> Self {
        Self {
            client,
            cache,
            freshness: DEFAULT_CACHE_TIMEOUT,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    /// Fetch and normalize the articles of one source.
    ///
    /// A failing source yields an empty list so that it never blocks the others.
    pub async fn fetch(&self, source: &FeedSource) -> Vec<RawArticle> {
        match self.try_fetch(source).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Error fetching RSS feed from {}: {}", source.name, err);
                Vec::new()
            }
        }
    }

    /// Like [`FeedFetcher::fetch`] but reports a feed-level failure to the caller.
    /// Individual unusable entries are still skipped silently.
    pub async fn try_fetch(&self, source: &FeedSource) -> Result<Vec<RawArticle>> {
        let entries = self
            .cache
            .get_or_fetch(&source.url, self.freshness, || self.fetch_entries(&source.url))
            .await?;

        let articles: Vec<RawArticle> = entries
            .iter()
            .take(self.max_items)
            .filter(|entry| {
                matches_keywords(
                    entry.title.as_deref().unwrap_or_default(),
                    entry.description.as_deref().unwrap_or_default(),
                    &source.keywords,
                )
            })
            .filter_map(|entry| match normalize_entry(entry, &source.name) {
                Ok(article) => Some(article),
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Skipping entry from {}: {}", source.name, err);
                    None
                }
            })
            .collect();

        info!(
            target: TARGET_WEB_REQUEST,
            "Fetched {} articles from {} ({} entries in feed)",
            articles.len(),
            source.name,
            entries.len()
        );

        Ok(articles)
    }

    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawFeedEntry>> {
        if !is_valid_url(url) {
            return Err(Error::fetch(url, "invalid feed URL"));
        }

        let document = self.client.fetch(url).await?;
        if !document.is_success() {
            return Err(Error::fetch(url, format!("HTTP status {}", document.status)));
        }

        debug!(target: TARGET_WEB_REQUEST, "Received {} entries from {}", document.entries.len(), url);
        Ok(document.entries)
    }
}

/// Turn a raw entry into an article, filling defaults for missing fields.
pub fn normalize_entry(entry: &RawFeedEntry, source_name: &str) -> Result<RawArticle> {
    let title = first_non_empty([entry.title.as_deref()]);
    let url = first_non_empty([entry.link.as_deref()]);
    let description = first_non_empty([entry.description.as_deref()]);

    if title.is_none() && url.is_none() && description.is_none() {
        return Err(Error::InvalidEntry(
            "entry has no title, link or description".to_string(),
        ));
    }

    Ok(RawArticle {
        title: title.map(collapse_whitespace).unwrap_or_else(|| UNTITLED.to_string()),
        summary: description.map(strip_html).unwrap_or_default(),
        url: url.unwrap_or_default().to_string(),
        source_name: source_name.to_string(),
        publish_date: first_non_empty([entry.published.as_deref(), entry.updated.as_deref()])
            .unwrap_or_default()
            .to_string(),
        category_hints: entry
            .categories
            .iter()
            .map(|category| category.trim())
            .filter(|category| !category.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
