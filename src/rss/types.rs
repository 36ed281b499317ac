//! Type definitions for the RSS module.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// A configured syndication endpoint with its keyword filter.
///
/// An empty keyword list means every entry is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// One entry as exposed by the feed document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Description or summary, possibly containing HTML.
    pub description: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// What the feed collaborator hands back for one request.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    pub status: u16,
    pub content_type: Option<String>,
    pub entries: Vec<RawFeedEntry>,
}

impl FeedDocument {
    /// 2xx and redirect statuses count as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// A normalized feed item ready for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    /// Visible text of the entry description, whitespace collapsed.
    pub summary: String,
    pub url: String,
    pub source_name: String,
    /// Best-effort publish date as the feed gave it, empty if unknown.
    pub publish_date: String,
    pub category_hints: Vec<String>,
}

/// Diagnostic status codes for RSS feed testing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RssFeedStatus {
    Success,
    InvalidUrl,
    HttpError,
    NotRssOrAtom,
    RequestFailed,
    ParseError,
    RequestTimeout,
}

/// Detailed results from probing a single feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedProbe {
    pub status: RssFeedStatus,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub entries_found: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub entries: Vec<RawFeedEntry>,
}

/// JSON feed structure for parsing
#[derive(Debug, Deserialize)]
pub struct JsonFeed {
    #[serde(default)]
    pub items: Vec<JsonFeedItem>,
}

/// JSON feed item structure
#[derive(Debug, Deserialize)]
pub struct JsonFeedItem {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("riskfeed/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const UNTITLED: &str = "Untitled";
