//! Feed parsing logic for RSS, Atom, and JSON formats.

use feed_rs::model::Entry;
use feed_rs::parser;
use std::io::Cursor;
use tracing::debug;

use super::types::{JsonFeed, JsonFeedItem, RawFeedEntry};
use super::util::cleanup_xml;
use crate::error::{Error, Result};
use crate::TARGET_WEB_REQUEST;

/// Parse a feed body into raw entries, preserving document order.
///
/// JSON Feed is tried when the content type says so; otherwise the body is parsed
/// as RSS/Atom, retrying once on a cleaned-up copy of malformed XML.
pub fn parse_feed(body: &str, content_type: Option<&str>, url: &str) -> Result<Vec<RawFeedEntry>> {
    if content_type.is_some_and(|ct| ct.contains("json")) {
        debug!(target: TARGET_WEB_REQUEST, "Processing as JSON feed: {}", url);
        let feed: JsonFeed = serde_json::from_str(body)
            .map_err(|err| Error::fetch(url, format!("JSON feed parsing error: {}", err)))?;
        return Ok(feed.items.into_iter().map(from_json_item).collect());
    }

    debug!(target: TARGET_WEB_REQUEST, "Processing as XML feed: {}", url);
    match parser::parse(Cursor::new(body)) {
        Ok(feed) => Ok(feed.entries.into_iter().map(from_feed_entry).collect()),
        Err(first_err) => {
            let cleaned_xml = cleanup_xml(body);
            if !(cleaned_xml.contains("<rss") || cleaned_xml.contains("<feed")) {
                let preview = if body.chars().all(|c| c.is_ascii_graphic() || c.is_whitespace()) {
                    body.chars().take(100).collect::<String>()
                } else {
                    "[binary data]".to_string()
                };
                return Err(Error::fetch(
                    url,
                    format!("content is not an RSS or Atom feed: {}", preview),
                ));
            }

            debug!(target: TARGET_WEB_REQUEST, "Retrying {} after XML cleanup: {}", url, first_err);
            parser::parse(Cursor::new(cleaned_xml))
                .map(|feed| feed.entries.into_iter().map(from_feed_entry).collect())
                .map_err(|second_err| {
                    Error::fetch(
                        url,
                        format!(
                            "XML parsing failed even after cleanup. First error: {}. Second error: {}",
                            first_err, second_err
                        ),
                    )
                })
        }
    }
}

fn from_feed_entry(entry: Entry) -> RawFeedEntry {
    let description = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body));

    RawFeedEntry {
        title: entry.title.map(|text| text.content),
        link: entry.links.first().map(|link| link.href.clone()),
        description,
        published: entry.published.map(|date| date.to_rfc3339()),
        updated: entry.updated.map(|date| date.to_rfc3339()),
        categories: entry
            .categories
            .into_iter()
            .map(|category| category.label.unwrap_or(category.term))
            .collect(),
    }
}

fn from_json_item(item: JsonFeedItem) -> RawFeedEntry {
    RawFeedEntry {
        title: item.title,
        link: item.url.or(item.id),
        description: item.summary.or(item.content_html).or(item.content_text),
        published: item.date_published,
        updated: item.date_modified,
        categories: item.tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Insurance Journal</title>
    <link>https://www.insurancejournal.com/</link>
    <description>News</description>
    <item>
      <title>Insurers brace for wildfire season</title>
      <link>https://example.com/wildfire</link>
      <description>&lt;p&gt;Climate &lt;b&gt;risk&lt;/b&gt; grows&lt;/p&gt;</description>
      <pubDate>Tue, 10 Jun 2025 14:00:00 GMT</pubDate>
      <category>Property</category>
    </item>
    <item>
      <title>Quarterly earnings</title>
      <link>https://example.com/earnings</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let entries = parse_feed(RSS, Some("application/rss+xml"), "https://example.com/feed").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("Insurers brace for wildfire season"));
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/wildfire"));
        assert!(entries[0].description.as_deref().unwrap().contains("Climate"));
        assert!(entries[0].published.is_some());
        assert_eq!(entries[0].categories, vec!["Property".to_string()]);
        assert_eq!(entries[1].description, None);
    }

    #[test]
    fn test_parse_json_feed() {
        let body = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "items": [
                {"id": "1", "url": "https://example.com/a", "title": "A", "content_text": "text", "date_modified": "2025-06-01T00:00:00Z", "tags": ["flood"]},
                {"id": "https://example.com/b"}
            ]
        }"#;
        let entries = parse_feed(body, Some("application/feed+json"), "https://example.com/feed.json").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description.as_deref(), Some("text"));
        assert_eq!(entries[0].published, None);
        assert_eq!(entries[0].updated.as_deref(), Some("2025-06-01T00:00:00Z"));
        assert_eq!(entries[1].link.as_deref(), Some("https://example.com/b"));
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        let err = parse_feed("<html><body>nope</body></html>", Some("text/html"), "https://example.com")
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
