//! HTTP client creation and request handling for RSS feeds.

use async_trait::async_trait;
use reqwest::header;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::parser::parse_feed;
use super::types::{FeedDocument, DEFAULT_USER_AGENT, REQUEST_TIMEOUT};
use crate::error::{Error, Result};
use crate::TARGET_WEB_REQUEST;

/// Retrieves the raw entries behind a feed URL.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one feed. A non-success HTTP status is returned in the document,
    /// transport and decoding problems as [`Error::Fetch`].
    async fn fetch(&self, url: &str) -> Result<FeedDocument>;
}

/// Create the shared client used for feed requests
pub fn create_http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: create_http_client(user_agent)?,
        })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        debug!(target: TARGET_WEB_REQUEST, "Loading feed from {}", url);

        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9")
            .send();

        let response = match timeout(REQUEST_TIMEOUT, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(Error::fetch(url, err)),
            Err(_) => {
                return Err(Error::fetch(
                    url,
                    format!("request timed out after {} seconds", REQUEST_TIMEOUT.as_secs()),
                ))
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_lowercase());

        if !(status.is_success() || status.is_redirection()) {
            warn!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, url);
            return Ok(FeedDocument {
                status: status.as_u16(),
                content_type,
                entries: Vec::new(),
            });
        }

        let body = match timeout(REQUEST_TIMEOUT, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(err)) => {
                return Err(Error::fetch(url, format!("failed to read response body: {}", err)))
            }
            Err(_) => return Err(Error::fetch(url, "timed out reading response body")),
        };
        debug!(target: TARGET_WEB_REQUEST, "First 500 characters of response body: {}", &body.chars().take(500).collect::<String>());

        let entries = parse_feed(&body, content_type.as_deref(), url)?;
        debug!(target: TARGET_WEB_REQUEST, "Parsed {} entries from {}", entries.len(), url);

        Ok(FeedDocument {
            status: status.as_u16(),
            content_type,
            entries,
        })
    }
}
