//! HTTP client creation and request handling for feeds.

use anyhow::{anyhow, Result};
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info};

use super::types::REQUEST_TIMEOUT;
use crate::TARGET_WEB_REQUEST;

const STANDARD_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:138.0) Gecko/20100101 Firefox/138.0";

/// Create a client with either standard or browser emulation settings
pub fn create_http_client(browser_emulation: bool) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(Jar::default()))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default());

    if browser_emulation {
        debug!(target: TARGET_WEB_REQUEST, "Creating browser emulation HTTP client");
    } else {
        debug!(target: TARGET_WEB_REQUEST, "Creating standard HTTP client");
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Fetches `url`, retrying once with browser-like headers when the plain
/// request fails. Returns the response and whether emulation was needed.
pub async fn fetch_with_fallback(url: &str) -> Result<(reqwest::Response, bool)> {
    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);

    let standard_client = create_http_client(false)?;
    let standard_result = timeout(
        REQUEST_TIMEOUT,
        standard_client
            .get(url)
            .header(header::USER_AGENT, STANDARD_USER_AGENT)
            .header(header::ACCEPT, "application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9")
            .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
            .send(),
    )
    .await;

    let first_failure = match standard_result {
        Ok(Ok(resp)) if resp.status().is_success() => {
            debug!(target: TARGET_WEB_REQUEST, "Standard request to {} succeeded", url);
            return Ok((resp, false));
        }
        Ok(Ok(resp)) => format!("HTTP error: {}", resp.status()),
        Ok(Err(err)) => format!("Request failed: {}", err),
        Err(_) => format!("Request timed out after {} seconds", REQUEST_TIMEOUT.as_secs()),
    };
    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed ({}), trying browser emulation", url, first_failure);

    let browser_client = create_http_client(true)?;
    let browser_result = timeout(
        REQUEST_TIMEOUT,
        browser_client
            .get(url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .send(),
    )
    .await;

    let second_failure = match browser_result {
        Ok(Ok(resp)) if resp.status().is_success() => {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation request to {} succeeded", url);
            return Ok((resp, true));
        }
        Ok(Ok(resp)) => format!("HTTP error: {}", resp.status()),
        Ok(Err(err)) => format!("Request failed: {}", err),
        Err(_) => format!("Request timed out after {} seconds", REQUEST_TIMEOUT.as_secs()),
    };

    Err(anyhow!(
        "Both standard and browser emulation requests failed: {}; {}",
        first_failure,
        second_failure
    ))
}
