//! Related research lookup through a web-search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::TARGET_RESEARCH_REQUEST;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
pub const DEFAULT_MAX_PAPERS: usize = 3;
pub const DEFAULT_RESEARCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RESEARCH_DOMAINS: [&str; 4] = [
    "arxiv.org",
    "scholar.google.com",
    "researchgate.net",
    "sciencedirect.com",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_depth: String,
    pub max_results: usize,
    pub include_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A paper or report related to a topic, as ranked by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPaper {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Provider-supplied, passed through unclamped.
    pub relevance_score: f64,
}

impl From<SearchResult> for ResearchPaper {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title.unwrap_or_default(),
            url: result.url.unwrap_or_default(),
            snippet: result.content.unwrap_or_default(),
            relevance_score: result.score.unwrap_or(0.0),
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;
}

/// Tavily search API client
pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: TAVILY_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::fetch(&self.base_url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(&self.base_url, format!("failed to read response: {}", e)))?;

        decode_response(&self.base_url, status, &body)
    }
}

/// Turn a raw search API reply into results. Non-2xx statuses and bodies
/// that do not parse are failures; missing or null result fields are not.
pub fn decode_response(target: &str, status: u16, body: &str) -> Result<Vec<SearchResult>> {
    if !(200..300).contains(&status) {
        return Err(Error::fetch(
            target,
            format!("API error (status {}): {}", status, body),
        ));
    }

    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| Error::fetch(target, format!("malformed response: {}", e)))?;

    Ok(parsed.results)
}

/// Finds research related to a topic. Never fails: problems yield an empty list.
pub struct ResearchFinder {
    provider: Option<Arc<dyn SearchProvider>>,
    domains: Vec<String>,
    max_results: usize,
    timeout: Duration,
}

impl ResearchFinder {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider: Some(provider),
            domains: DEFAULT_RESEARCH_DOMAINS.iter().map(|d| d.to_string()).collect(),
            max_results: DEFAULT_MAX_PAPERS,
            timeout: DEFAULT_RESEARCH_TIMEOUT,
        }
    }

    /// A finder with no search backend; every lookup returns nothing.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            domains: Vec::new(),
            max_results: DEFAULT_MAX_PAPERS,
            timeout: DEFAULT_RESEARCH_TIMEOUT,
        }
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn request_for(&self, topic: &str) -> SearchRequest {
        SearchRequest {
            query: format!(
                "latest research papers on {} in insurance and climate risk",
                topic.trim()
            ),
            search_depth: "advanced".to_string(),
            max_results: self.max_results,
            include_domains: self.domains.clone(),
        }
    }

    #[instrument(skip(self), target = "research_request")]
    pub async fn find_papers(&self, topic: &str) -> Vec<ResearchPaper> {
        match self.try_find_papers(topic).await {
            Ok(papers) => papers,
            Err(err) => {
                warn!(target: TARGET_RESEARCH_REQUEST, "Error fetching research papers: {}", err);
                Vec::new()
            }
        }
    }

    /// Provider order is kept as-is.
    pub async fn try_find_papers(&self, topic: &str) -> Result<Vec<ResearchPaper>> {
        let Some(provider) = &self.provider else {
            debug!(target: TARGET_RESEARCH_REQUEST, "Research lookup disabled, skipping {}", topic);
            return Ok(Vec::new());
        };

        let request = self.request_for(topic);
        debug!(target: TARGET_RESEARCH_REQUEST, "Searching: {}", request.query);

        let results = match timeout(self.timeout, provider.search(&request)).await {
            Ok(results) => results?,
            Err(_) => {
                return Err(Error::fetch(
                    "research search",
                    format!("timed out after {} seconds", self.timeout.as_secs()),
                ))
            }
        };

        let papers: Vec<ResearchPaper> = results
            .into_iter()
            .take(self.max_results)
            .map(ResearchPaper::from)
            .collect();
        info!(target: TARGET_RESEARCH_REQUEST, "Found {} papers for {}", papers.len(), topic);

        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSearch {
        results: Vec<SearchResult>,
        fail: bool,
        delay: Option<Duration>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl FakeSearch {
        fn returning(results: Vec<SearchResult>) -> Arc<Self> {
            Arc::new(Self {
                results,
                fail: false,
                delay: None,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::fetch("fake", "API error (status 500)"));
            }
            Ok(self.results.clone())
        }
    }

    fn result(title: &str, score: f64) -> SearchResult {
        SearchResult {
            title: Some(title.to_string()),
            url: Some(format!("https://arxiv.org/abs/{}", title)),
            content: Some("snippet".to_string()),
            score: Some(score),
        }
    }

    #[tokio::test]
    async fn test_request_shape() {
        let provider = FakeSearch::returning(vec![]);
        let finder = ResearchFinder::new(provider.clone());

        finder.find_papers("Natural Disasters").await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].query,
            "latest research papers on Natural Disasters in insurance and climate risk"
        );
        assert_eq!(requests[0].search_depth, "advanced");
        assert_eq!(requests[0].max_results, DEFAULT_MAX_PAPERS);
        assert_eq!(requests[0].include_domains.len(), DEFAULT_RESEARCH_DOMAINS.len());
    }

    #[tokio::test]
    async fn test_provider_order_and_scores_pass_through() {
        let provider = FakeSearch::returning(vec![
            result("b", 0.2),
            result("a", 0.9),
            result("c", 1.7),
            result("d", 0.1),
        ]);
        let finder = ResearchFinder::new(provider);

        let papers = finder.find_papers("flood").await;
        let titles: Vec<&str> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
        assert_eq!(papers[2].relevance_score, 1.7);
        assert_eq!(papers[0].snippet, "snippet");
    }

    #[tokio::test]
    async fn test_failure_yields_empty() {
        let provider = Arc::new(FakeSearch {
            results: vec![result("a", 1.0)],
            fail: true,
            delay: None,
            requests: Mutex::new(Vec::new()),
        });
        let finder = ResearchFinder::new(provider);

        assert!(finder.find_papers("flood").await.is_empty());
        assert!(finder.try_find_papers("flood").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_empty() {
        let provider = Arc::new(FakeSearch {
            results: vec![result("a", 1.0)],
            fail: false,
            delay: Some(Duration::from_secs(60)),
            requests: Mutex::new(Vec::new()),
        });
        let finder = ResearchFinder::new(provider);

        assert!(finder.find_papers("flood").await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_finder() {
        let finder = ResearchFinder::disabled();
        assert!(!finder.is_enabled());
        assert!(finder.find_papers("flood").await.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let paper = ResearchPaper::from(SearchResult::default());
        assert_eq!(paper.title, "");
        assert_eq!(paper.relevance_score, 0.0);
    }

    #[test]
    fn test_decode_tolerates_null_and_missing_fields() {
        let body = r#"{"query": "flood", "results": [
            {"title": "Flood risk pricing", "url": "https://arxiv.org/abs/1", "content": "abc", "score": null},
            {"title": "Parametric cover", "url": "https://arxiv.org/abs/2", "score": 0.82},
            {"url": "https://arxiv.org/abs/3"}
        ]}"#;

        let papers: Vec<ResearchPaper> = decode_response("tavily", 200, body)
            .unwrap()
            .into_iter()
            .map(ResearchPaper::from)
            .collect();

        assert_eq!(papers.len(), 3);
        assert_eq!(papers[0].relevance_score, 0.0);
        assert_eq!(papers[0].snippet, "abc");
        assert_eq!(papers[1].relevance_score, 0.82);
        assert_eq!(papers[1].snippet, "");
        assert_eq!(papers[2].title, "");
        assert_eq!(papers[2].url, "https://arxiv.org/abs/3");
    }

    #[test]
    fn test_decode_without_results_is_empty() {
        assert!(decode_response("tavily", 200, "{}").unwrap().is_empty());
    }

    #[test]
    fn test_decode_failures() {
        match decode_response("tavily", 401, r#"{"detail": "Unauthorized"}"#) {
            Err(Error::Fetch { reason, .. }) => {
                assert!(reason.contains("401"));
                assert!(reason.contains("Unauthorized"));
            }
            other => panic!("expected fetch failure, got {:?}", other),
        }
        assert!(matches!(
            decode_response("tavily", 200, "<html>gateway</html>"),
            Err(Error::Fetch { .. })
        ));
        assert!(matches!(
            decode_response("tavily", 200, r#"{"results": "nope"}"#),
            Err(Error::Fetch { .. })
        ));
    }

    /// Answer exactly one HTTP request with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/search", addr)
    }

    fn local_client(url: &str) -> TavilyClient {
        TavilyClient {
            client: Client::builder().no_proxy().build().unwrap(),
            api_key: "tvly-test".to_string(),
            base_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_tavily_client_error_status_yields_empty() {
        let url = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;
        let client = local_client(&url);
        let finder = ResearchFinder::new(Arc::new(client));

        assert!(finder.find_papers("flood").await.is_empty());
    }

    #[tokio::test]
    async fn test_tavily_client_parses_reply() {
        let url = serve_once(
            "200 OK",
            r#"{"results": [{"title": "Wildfire models", "url": "https://arxiv.org/abs/9", "content": "x", "score": null}]}"#,
        )
        .await;
        let client = local_client(&url);
        let finder = ResearchFinder::new(Arc::new(client));

        let papers = finder.find_papers("wildfire").await;
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Wildfire models");
        assert_eq!(papers[0].relevance_score, 0.0);
    }
}
