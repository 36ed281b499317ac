//! Single-feed diagnostics that bypass the cache.

use reqwest::header;
use tokio::time::timeout;

use super::client::create_http_client;
use super::parser::parse_feed;
use super::types::{FeedProbe, RssFeedStatus, DEFAULT_USER_AGENT, REQUEST_TIMEOUT};
use super::util::is_valid_url;

/// Fetch `url` once and describe what came back.
pub async fn probe_feed(url: &str) -> FeedProbe {
    let mut result = FeedProbe {
        status: RssFeedStatus::Success,
        http_status: None,
        content_type: None,
        entries_found: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
        entries: Vec::new(),
    };

    if !is_valid_url(url) {
        result.status = RssFeedStatus::InvalidUrl;
        result.errors.push(format!("Invalid URL format: {}", url));
        return result;
    }

    let client = match create_http_client(DEFAULT_USER_AGENT) {
        Ok(client) => client,
        Err(err) => {
            result.status = RssFeedStatus::RequestFailed;
            result.errors.push(err.to_string());
            return result;
        }
    };

    let response = match timeout(REQUEST_TIMEOUT, client.get(url).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            result.status = RssFeedStatus::RequestFailed;
            result.errors.push(format!("Request failed: {}", err));
            return result;
        }
        Err(_) => {
            result.status = RssFeedStatus::RequestTimeout;
            result.errors.push(format!(
                "Request timed out after {} seconds",
                REQUEST_TIMEOUT.as_secs()
            ));
            return result;
        }
    };

    result.http_status = Some(response.status().as_u16());
    result.content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());

    if !response.status().is_success() {
        result.status = RssFeedStatus::HttpError;
        result
            .errors
            .push(format!("HTTP error: {}", response.status()));
        return result;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            result.status = RssFeedStatus::RequestFailed;
            result
                .errors
                .push(format!("Failed to read response body: {}", err));
            return result;
        }
    };

    if !(body.trim_start().starts_with("<?xml") || body.contains("<rss") || body.contains("<feed"))
        && !result.content_type.as_deref().is_some_and(|ct| ct.contains("json"))
    {
        result
            .warnings
            .push("Body does not start like an RSS or Atom document".to_string());
    }

    match parse_feed(&body, result.content_type.as_deref(), url) {
        Ok(entries) => {
            result.entries_found = entries.len();
            if entries.is_empty() {
                result.warnings.push("Feed parsed but contains no entries".to_string());
            }
            result.entries = entries;
        }
        Err(err) => {
            result.status = if body.contains("<rss") || body.contains("<feed") {
                RssFeedStatus::ParseError
            } else {
                RssFeedStatus::NotRssOrAtom
            };
            result.errors.push(err.to_string());
        }
    }

    result
}
