//! Converts RSS, Atom and JSON feeds into [`FetchedArticle`]s.

use anyhow::{anyhow, Result};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::FetchedArticle;
use super::util::{cleanup_xml, extract_img_src, strip_html};
use crate::TARGET_WEB_REQUEST;

/// Parses a feed body. When the body does not parse as-is it is run through
/// [`cleanup_xml`] and parsed once more.
///
/// Entries without a link are dropped. The result is ordered newest first,
/// with undated entries last.
pub fn parse_feed(body: &str, feed_url: &str, source: &str) -> Result<Vec<FetchedArticle>> {
    let feed = parse_with_cleanup(body, feed_url)?;

    let mut articles: Vec<FetchedArticle> = feed
        .entries
        .into_iter()
        .filter_map(|entry| convert_entry(entry, feed_url, source))
        .collect();

    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    debug!(target: TARGET_WEB_REQUEST, "Parsed {} entries from {}", articles.len(), feed_url);
    Ok(articles)
}

fn parse_with_cleanup(body: &str, feed_url: &str) -> Result<Feed> {
    let first_err = match parser::parse(Cursor::new(body.as_bytes())) {
        Ok(feed) => return Ok(feed),
        Err(err) => err,
    };

    let cleaned = cleanup_xml(body);
    if !(cleaned.contains("<rss") || cleaned.contains("<feed") || cleaned.contains("<rdf")) {
        let preview = if body.chars().all(|c| c.is_ascii_graphic() || c.is_whitespace()) {
            body.chars().take(100).collect::<String>()
        } else {
            "[binary data]".to_string()
        };
        return Err(anyhow!(
            "Feed from {} doesn't appear to be RSS or Atom ({}). Content preview: {}",
            feed_url,
            first_err,
            preview
        ));
    }

    match parser::parse(Cursor::new(cleaned.as_bytes())) {
        Ok(feed) => {
            warn!(target: TARGET_WEB_REQUEST, "Feed from {} parsed only after XML cleanup", feed_url);
            Ok(feed)
        }
        Err(second_err) => Err(anyhow!(
            "Failed to parse feed from {} even after cleanup. First error: {}. Second error: {}",
            feed_url,
            first_err,
            second_err
        )),
    }
}

fn convert_entry(entry: Entry, feed_url: &str, source: &str) -> Option<FetchedArticle> {
    let link = entry
        .links
        .iter()
        .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|link| link.href.trim().to_string())
        .filter(|href| !href.is_empty())?;

    let description = entry
        .summary
        .as_ref()
        .map(|text| text.content.clone())
        .filter(|text| !text.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|content| content.body.clone()))
        .unwrap_or_default();

    Some(FetchedArticle {
        title: entry
            .title
            .as_ref()
            .map(|title| strip_html(&title.content))
            .unwrap_or_default(),
        content: strip_html(&description),
        image_url: image_url(&entry, &description),
        link,
        source_feed: feed_url.to_string(),
        source: source.to_string(),
        published_at: entry.published.or(entry.updated),
    })
}

/// First image-typed enclosure or media content, then a media thumbnail, then
/// the first `<img>` in the description.
fn image_url(entry: &Entry, description: &str) -> Option<String> {
    let typed = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .find(|content| {
            content
                .content_type
                .as_ref()
                .map(|mime| mime.to_string().starts_with("image/"))
                .unwrap_or(false)
        })
        .and_then(|content| content.url.as_ref())
        .map(|url| url.to_string());

    typed
        .or_else(|| {
            entry
                .media
                .iter()
                .flat_map(|media| media.thumbnails.iter())
                .map(|thumbnail| thumbnail.image.uri.clone())
                .next()
        })
        .or_else(|| extract_img_src(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FEED_URL: &str = "https://feeds.example.com/rss";

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example news</description>
    <item>
      <title>Older story</title>
      <link>https://example.com/older</link>
      <description>&lt;p&gt;Older &lt;img src="https://cdn.example.com/older.jpg"&gt; body&lt;/p&gt;</description>
      <pubDate>Tue, 30 Apr 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated story</title>
      <link>https://example.com/undated</link>
      <description>No date here</description>
    </item>
    <item>
      <title>Newest story</title>
      <link>https://example.com/newest</link>
      <description>Fresh &lt;b&gt;news&lt;/b&gt;</description>
      <enclosure url="https://cdn.example.com/newest.jpg" length="100" type="image/jpeg"/>
      <pubDate>Wed, 01 May 2024 12:30:00 GMT</pubDate>
    </item>
    <item>
      <title>No link</title>
      <description>Dropped</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_orders_and_extracts() {
        let articles = parse_feed(RSS, FEED_URL, "Example").unwrap();

        let links: Vec<&str> = articles.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/newest",
                "https://example.com/older",
                "https://example.com/undated"
            ]
        );

        let newest = &articles[0];
        assert_eq!(newest.title, "Newest story");
        assert_eq!(newest.content, "Fresh news");
        assert_eq!(newest.image_url.as_deref(), Some("https://cdn.example.com/newest.jpg"));
        assert_eq!(newest.source, "Example");
        assert_eq!(newest.source_feed, FEED_URL);
        assert_eq!(
            newest.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );

        let older = &articles[1];
        assert_eq!(older.content, "Older body");
        assert_eq!(older.image_url.as_deref(), Some("https://cdn.example.com/older.jpg"));

        assert_eq!(articles[2].published_at, None);
        assert_eq!(articles[2].image_url, None);
    }

    #[test]
    fn test_parse_recovers_after_cleanup() {
        let broken = format!("\n\n  garbage before root {}", RSS.trim_start_matches(r#"<?xml version="1.0" encoding="UTF-8"?>"#))
            .replace("Example news", "Example&nbsp;news");
        let articles = parse_feed(&broken, FEED_URL, "Example").unwrap();
        assert_eq!(articles.len(), 3);
    }

    #[test]
    fn test_parse_rejects_non_feeds() {
        assert!(parse_feed("<html><body>Not a feed</body></html>", FEED_URL, "Example").is_err());
        assert!(parse_feed("", FEED_URL, "Example").is_err());
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example</id>
  <updated>2024-05-01T10:00:00Z</updated>
  <entry>
    <title>Atom story</title>
    <id>urn:example:1</id>
    <link rel="alternate" href="https://example.com/atom-story"/>
    <updated>2024-05-01T10:00:00Z</updated>
    <summary type="html">&lt;p&gt;Summary text&lt;/p&gt;</summary>
  </entry>
</feed>"#;
        let articles = parse_feed(atom, FEED_URL, "Atom").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://example.com/atom-story");
        assert_eq!(articles[0].content, "Summary text");
        assert_eq!(
            articles[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }
}
