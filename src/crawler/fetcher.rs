//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent string
//! - GET requests with a per-request timeout
//! - Error classification into [`FetchError`]
//!
//! There is no retry logic: a failed article is picked up again by the next
//! scheduled crawl.

use crate::config::SiteConfig;
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The site configuration carrying the user agent
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use news_archiver::config::{SiteConfig, DEFAULT_USER_AGENT};
/// use news_archiver::crawler::build_http_client;
///
/// let config = SiteConfig {
///     listing_url: "https://www.tagesschau.de/".to_string(),
///     user_agent: DEFAULT_USER_AGENT.to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &SiteConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its body as text
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | No response within `timeout` | `FetchError::Timeout` |
/// | Non-2xx status | `FetchError::HttpStatus` |
/// | Connection, TLS or body read failure | `FetchError::Network` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Upper bound for the whole request including the body
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| classify_error(url, e))
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
