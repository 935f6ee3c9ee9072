//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for a crawl run, including:
//! - Building a cookie-aware HTTP client with the configured user agent and timeout
//! - GET requests to fetch page content
//! - Session priming and form submission for sites that need state first
//! - Error classification (transport vs. HTTP status)
//!
//! A `Fetcher` is created at the start of a run and dropped at its end, so
//! cookies never leak from one run into the next.

use crate::config::CrawlConfig;
use crate::FetchError;
use reqwest::header::{ORIGIN, REFERER};
use reqwest::{Client, Response};
use url::Url;

/// Session-scoped HTTP client for one crawl run
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
}

/// Builds an HTTP client with the run's user agent, timeout, and a cookie store
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pagetrawl::config::CrawlConfig;
/// use pagetrawl::crawler::build_http_client;
///
/// let config = CrawlConfig::new("https://example.com/", "h1");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

impl Fetcher {
    /// Creates a fetcher with a fresh session
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Fetches a page and returns its body as text
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Request timed out | `FetchError::Timeout` |
    /// | DNS, connect, TLS, body read failure | `FetchError::Transport` |
    /// | Non-2xx status | `FetchError::HttpStatus` |
    ///
    /// Nothing is retried here.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        read_body(url, response).await
    }

    /// Visits a page only to establish session cookies
    ///
    /// Some sites refuse form posts unless an initial GET has set their
    /// session cookie. The body is discarded, the status is still checked.
    pub async fn prime(&self, url: &str) -> Result<(), FetchError> {
        tracing::debug!("Priming session at {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        check_status(url, &response)
    }

    /// Submits an urlencoded form and returns the response body
    ///
    /// Sends `Referer` set to the form URL and `Origin` set to its origin,
    /// as a browser would for a same-site form post.
    pub async fn submit_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, FetchError> {
        tracing::debug!("POST {} ({} fields)", url, fields.len());
        let mut request = self.client.post(url).header(REFERER, url).form(fields);

        if let Some(origin) = origin_of(url) {
            request = request.header(ORIGIN, origin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        read_body(url, response).await
    }
}

/// Fails with `HttpStatus` unless the response is 2xx
fn check_status(url: &str, response: &Response) -> Result<(), FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

async fn read_body(url: &str, response: Response) -> Result<String, FetchError> {
    check_status(url, &response)?;
    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}

/// Returns `scheme://host[:port]` for a URL, or None when it has no tuple origin
fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
