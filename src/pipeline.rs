//! One batch: fetch every source, analyze every article, aggregate a report.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::{AnalyzedArticle, ArticleAnalyzer};
use crate::report::{Report, ReportBuilder};
use crate::rss::{FeedFetcher, FeedSource, RawArticle};
use crate::{TARGET_LLM_REQUEST, TARGET_WEB_REQUEST};

pub const DEFAULT_ANALYSIS_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    Fetch,
    Analysis,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Fetch => write!(f, "fetch"),
            FailureStage::Analysis => write!(f, "analysis"),
        }
    }
}

/// A unit of work that was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub stage: FailureStage,
    /// Source name for fetch failures, article title for analysis failures.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub report: Report,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &BatchFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}

pub struct Pipeline {
    fetcher: FeedFetcher,
    analyzer: ArticleAnalyzer,
    builder: ReportBuilder,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(fetcher: FeedFetcher, analyzer: ArticleAnalyzer) -> Self {
        Self {
            fetcher,
            analyzer,
            builder: ReportBuilder::new(),
            concurrency: DEFAULT_ANALYSIS_CONCURRENCY,
        }
    }

    pub fn with_report_builder(mut self, builder: ReportBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Number of completion requests in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn fetcher(&self) -> &FeedFetcher {
        &self.fetcher
    }

    pub fn analyzer(&self) -> &ArticleAnalyzer {
        &self.analyzer
    }

    /// Run a batch over `sources`.
    ///
    /// A failing source or article is recorded in `failures` and the rest of
    /// the batch carries on. Articles keep source order, then feed order.
    pub async fn run(&self, sources: &[FeedSource]) -> BatchOutcome {
        let mut failures = Vec::new();
        let mut articles: Vec<RawArticle> = Vec::new();

        for source in sources {
            match self.fetcher.try_fetch(source).await {
                Ok(fetched) => {
                    info!(target: TARGET_WEB_REQUEST, "{}: {} articles", source.name, fetched.len());
                    articles.extend(fetched);
                }
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Error fetching feed {}: {}", source.name, err);
                    failures.push(BatchFailure {
                        stage: FailureStage::Fetch,
                        subject: source.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let results: Vec<(&RawArticle, crate::Result<AnalyzedArticle>)> = stream::iter(articles.iter())
            .map(|article| async move { (article, self.analyzer.try_analyze(article).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut analyzed = Vec::with_capacity(results.len());
        for (article, result) in results {
            match result {
                Ok(item) => analyzed.push(item),
                Err(err) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error analyzing {}: {}", article.title, err);
                    failures.push(BatchFailure {
                        stage: FailureStage::Analysis,
                        subject: article.title.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let report = self.builder.build(analyzed);
        info!(
            "Batch complete: {} sources, {} articles analyzed, {} failures",
            sources.len(),
            report.total_articles(),
            failures.len()
        );

        BatchOutcome { report, failures }
    }

    /// Run a batch every `interval` until `shutdown` resolves.
    ///
    /// `shutdown` is polled during batches as well as between them; a batch it
    /// interrupts is dropped without reaching `on_outcome`. Returns the number
    /// of completed batches.
    pub async fn run_until<F, C>(
        &self,
        sources: &[FeedSource],
        interval: Duration,
        shutdown: F,
        mut on_outcome: C,
    ) -> usize
    where
        F: Future<Output = ()>,
        C: FnMut(&BatchOutcome),
    {
        tokio::pin!(shutdown);
        let mut completed = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => return completed,
                outcome = self.run(sources) => {
                    completed += 1;
                    on_outcome(&outcome);
                }
            }

            tokio::select! {
                _ = &mut shutdown => return completed,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
