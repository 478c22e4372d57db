//! HTTP fetcher implementation
//!
//! This module handles the network side of a crawl:
//! - The [`Fetcher`] seam workers call for every URL
//! - Building HTTP clients from the `[http]` configuration
//! - The reqwest-backed [`HttpFetcher`]
//! - Error classification for failed pages

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Raw response of a single GET
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,

    /// Page body
    pub body: String,
}

/// Why a page contributed nothing to the crawl
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, TLS, timeout or other transport failure
    #[error("request failed: {0}")]
    Request(String),

    /// Non-2xx response
    #[error("url responded with code {0}")]
    Status(u16),

    /// Response is not HTML
    #[error("unknown content type: {0}")]
    ContentType(String),

    /// Body could not be read
    #[error("failed to read body: {0}")]
    Body(String),
}

/// Performs one blocking-per-call HTTP GET
///
/// Implementations must be stateless with respect to the crawl; every worker
/// shares one instance.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitecrawler::config::HttpConfig;
/// use sitecrawler::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // the worker rejects these pages without looking at the body
        if !status.is_success() || !is_html(content_type.as_deref()) {
            return Ok(FetchedPage {
                status: status.as_u16(),
                content_type,
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(FetchedPage {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// A missing or empty content type counts as HTML
pub fn is_html(content_type: Option<&str>) -> bool {
    match content_type {
        Some(content_type) if !content_type.is_empty() => content_type.contains("text/html"),
        _ => true,
    }
}

/// Maps a transport error to a short, stable reason
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Request("request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Request(format!("connection failed: {}", e))
    } else {
        FetchError::Request(e.to_string())
    }
}
