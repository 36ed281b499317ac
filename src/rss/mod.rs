//! RSS feed processing module.
//!
//! This module handles the fetching, caching, parsing, and normalization of feeds.

mod cache;
mod client;
mod fetcher;
mod parser;
mod probe;
mod types;
mod util;

pub use self::types::*;

pub use self::cache::{CacheEntry, FeedCache};
pub use self::client::{create_http_client, FeedClient, HttpFeedClient};
pub use self::fetcher::{normalize_entry, FeedFetcher};
pub use self::parser::parse_feed;
pub use self::probe::probe_feed;
pub use self::util::*;
