//! Retrieval of whole feeds.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::client::fetch_with_fallback;
use super::parser::parse_feed;
use super::source::SourceResolver;
use super::types::{FetchedArticle, MAX_RETRIES, RETRY_DELAY};
use super::util::{decode_body, decompress_body, is_valid_url};
use crate::TARGET_WEB_REQUEST;

/// Anything that can turn a feed URL into articles.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed_url: &str) -> Result<Vec<FetchedArticle>>;
}

/// Fetches feeds over HTTP.
pub struct HttpFeedSource {
    resolver: SourceResolver,
}

impl HttpFeedSource {
    pub fn new(resolver: SourceResolver) -> Self {
        Self { resolver }
    }

    async fn fetch_once(&self, feed_url: &str, source: &str) -> Result<Vec<FetchedArticle>> {
        let (response, browser_emulation_used) = fetch_with_fallback(feed_url).await?;
        if browser_emulation_used {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation was required for {}", feed_url);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_lowercase());
        let content_encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(|s| s.to_lowercase());
        debug!(target: TARGET_WEB_REQUEST, "Response Content-Type: {:?}", content_type);

        let bytes = response
            .bytes()
            .await
            .map_err(|err| anyhow!("Failed to read response bytes from {}: {}", feed_url, err))?;

        let body = decompress_body(&bytes, content_encoding.as_deref(), feed_url);
        let text = decode_body(&body, content_type.as_deref());
        parse_feed(&text, feed_url, source)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    /// Up to [`MAX_RETRIES`] attempts, [`RETRY_DELAY`] apart.
    async fn fetch(&self, feed_url: &str) -> Result<Vec<FetchedArticle>> {
        if !is_valid_url(feed_url) {
            return Err(anyhow!("Invalid feed URL: {}", feed_url));
        }

        let source = self.resolver.resolve(feed_url);
        let mut last_error = anyhow!("No attempt made for {}", feed_url);

        for attempt in 1..=MAX_RETRIES {
            debug!(target: TARGET_WEB_REQUEST, "Loading feed from {} (attempt {}/{})", feed_url, attempt, MAX_RETRIES);
            match self.fetch_once(feed_url, &source).await {
                Ok(articles) => {
                    info!(target: TARGET_WEB_REQUEST, "Fetched {} articles from {} ({})", articles.len(), feed_url, source);
                    return Ok(articles);
                }
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Attempt {}/{} for {} failed: {}", attempt, MAX_RETRIES, feed_url, err);
                    last_error = err;
                }
            }

            if attempt < MAX_RETRIES {
                sleep(RETRY_DELAY).await;
            }
        }

        error!(target: TARGET_WEB_REQUEST, "Max retries reached for {}, moving on", feed_url);
        Err(last_error)
    }
}
