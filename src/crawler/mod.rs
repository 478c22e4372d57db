//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - HTML parsing and link extraction
//! - The worker pool and work distribution
//! - The result pipeline
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod pipeline;
mod worker;

pub use coordinator::{Coordinator, CrawlStatus};
pub use fetcher::{build_http_client, is_html, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use parser::{ExtractedLinks, HtmlExtractor, LinkExtractor};
pub use pipeline::{
    DedupStage, DomainFilterStage, ErrorStage, MaxDepthStage, Pipeline, SkipStage, Stage,
};
pub use worker::{
    DispatchError, FetchResult, ResultBatch, WorkItem, Worker, WorkerHandle, WorkerPool,
};

use crate::config::CrawlConfig;
use crate::output::CrawlReport;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl with the given fetcher and extractor
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration
/// 2. Spawn the worker pool
/// 3. Crawl breadth-first from the start URL
/// 4. Return the final report
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `fetcher` - Performs every HTTP GET
/// * `extractor` - Pulls links out of fetched pages
/// * `cancel` - Cancelling it stops the crawl and returns a partial report
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished or was interrupted
/// * `Err(CrawlError)` - Configuration was rejected; nothing was fetched
pub async fn crawl(
    config: &CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlError> {
    let coordinator = Coordinator::new(config, fetcher, extractor, cancel)?;
    Ok(coordinator.run().await)
}

/// Crawls over HTTP with the `[http]` settings from `config`
pub async fn crawl_site(
    config: &CrawlConfig,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlError> {
    let fetcher = HttpFetcher::new(&config.http)?;
    crawl(config, Arc::new(fetcher), Arc::new(HtmlExtractor), cancel).await
}
