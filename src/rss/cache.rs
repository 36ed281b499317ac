//! Time-bounded cache of raw feed entries keyed by feed URL.

use dashmap::DashMap;
use std::future::Future;
use tokio::time::{Duration, Instant};
use tracing::debug;

use super::types::RawFeedEntry;
use crate::error::Result;
use crate::TARGET_WEB_REQUEST;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fetched_at: Instant,
    pub entries: Vec<RawFeedEntry>,
}

/// Process-lifetime cache with overwrite-on-refresh semantics.
///
/// Entries are never evicted: a stale entry stays until the next successful
/// refresh of the same key overwrites it, and a failed refresh leaves it alone.
/// The map lock is never held while a fetch is in flight.
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: DashMap<String, CacheEntry>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entries for `key` if younger than `freshness`, otherwise
    /// run `fetch` and store its result. Errors from `fetch` are returned as-is.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        freshness: Duration,
        fetch: F,
    ) -> Result<Vec<RawFeedEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RawFeedEntry>>>,
    {
        let cached = self
            .entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < freshness)
            .map(|entry| entry.entries.clone());

        if let Some(entries) = cached {
            debug!(target: TARGET_WEB_REQUEST, "Serving {} cached entries for {}", entries.len(), key);
            return Ok(entries);
        }

        let entries = fetch().await?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                entries: entries.clone(),
            },
        );

        Ok(entries)
    }

    /// Snapshot of whatever is stored for `key`, fresh or not.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
