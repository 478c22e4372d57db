//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the control loop that owns all crawl state:
//! - Seeding the frontier with the start URL
//! - Distributing frontier buckets across idle workers
//! - Running result batches through the pipeline
//! - Detecting completion and handling interrupts
//! - Producing the final report

use crate::config::{validate, CrawlConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::LinkExtractor;
use crate::crawler::pipeline::Pipeline;
use crate::crawler::worker::{DispatchError, ResultBatch, WorkerPool};
use crate::output::CrawlReport;
use crate::state::CrawlState;
use crate::url::{normalize_url, DomainFilter};
use crate::{ConfigError, CrawlError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where the control loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Waiting for more batches
    Running,
    /// Cancelled, or every worker went away with work outstanding
    Interrupted,
    /// Frontier empty and every worker idle
    Done,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    state: CrawlState,
    pool: WorkerPool,
    results: mpsc::UnboundedReceiver<ResultBatch>,
    pipeline: Pipeline,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl Coordinator {
    /// Creates a coordinator and spawns its worker pool
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `fetcher` - Performs the HTTP GET for every URL
    /// * `extractor` - Turns response bodies into links
    /// * `cancel` - Interrupts the crawl when cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Invalid start URL, domain pattern or pool size
    pub fn new(
        config: &CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        validate(config)?;

        let base_url = normalize_url(&config.crawler.start_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("'{}': {}", config.crawler.start_url, e))
        })?;
        let domain_filter = DomainFilter::resolve(&config.crawler.domain_regex, &base_url)?;
        let state = CrawlState::new(base_url, domain_filter, config.crawler.max_depth);

        let (results_tx, results) = mpsc::unbounded_channel();
        let pool = WorkerPool::spawn(
            config.crawler.workers,
            results_tx,
            fetcher,
            extractor,
            &cancel,
        );

        Ok(Self::with_parts(state, pool, results, cancel))
    }

    /// Assembles a coordinator from an existing state, pool and result channel
    pub fn with_parts(
        state: CrawlState,
        pool: WorkerPool,
        results: mpsc::UnboundedReceiver<ResultBatch>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            pool,
            results,
            pipeline: Pipeline::new(),
            cancel,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the crawl to completion or interruption
    ///
    /// The start URL is dispatched at depth 0 before the loop begins. The
    /// loop then waits for either a result batch or cancellation. On
    /// cancellation it returns immediately: fetches already in flight are
    /// not aborted, and whatever they report later is dropped.
    pub async fn run(mut self) -> CrawlReport {
        tracing::info!(
            "Starting crawl of {} (max depth {}, filter {}, {} workers)",
            self.state.base_url(),
            self.state.max_depth(),
            self.state.domain_filter(),
            self.pool.len()
        );

        let mut status = self.start();
        while status == CrawlStatus::Running {
            status = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Crawl interrupted");
                    CrawlStatus::Interrupted
                }
                batch = self.results.recv() => match batch {
                    Some(batch) => self.on_batch(batch),
                    None => {
                        tracing::warn!("All workers stopped before the crawl finished");
                        CrawlStatus::Interrupted
                    }
                },
                _ = self.pool.next_lost_worker() => self.redistribute(),
            };
        }

        if status == CrawlStatus::Interrupted {
            self.state.mark_interrupted();
        }
        self.pool.shutdown();

        let report = CrawlReport::new(self.state, self.started_at, Utc::now());
        tracing::info!(
            "Crawl finished: {} unique urls, {} fetched, {} failed{}",
            report.unique_count(),
            report.fetched_count(),
            report.error_count(),
            if report.interrupted { " (interrupted)" } else { "" }
        );
        report
    }

    /// Seeds the frontier with the start URL and hands it out
    fn start(&mut self) -> CrawlStatus {
        let base_url = self.state.base_url().clone();
        self.state.enqueue(0, vec![base_url]);
        self.redistribute()
    }

    /// Processes one batch, acknowledges it, and decides what happens next
    pub fn on_batch(&mut self, batch: ResultBatch) -> CrawlStatus {
        let ResultBatch {
            worker_id,
            worker,
            results,
            ack,
        } = batch;
        tracing::debug!("Got {} results from {}", results.len(), worker);

        for result in results {
            self.pipeline.process(&mut self.state, result);
        }

        self.pool.release(worker_id);
        if ack.send(()).is_err() {
            tracing::debug!("{} went away before its batch was acknowledged", worker);
        }

        self.redistribute()
    }

    /// Hands out frontier buckets until the frontier is empty or no worker is free
    fn redistribute(&mut self) -> CrawlStatus {
        let lost = self.pool.reap_lost_workers();
        if !lost.is_empty() {
            for name in &lost {
                tracing::warn!("{} stopped while holding work; its urls are lost", name);
            }
            self.state.mark_interrupted();
        }

        loop {
            self.dispatch_frontier();

            if !self.state.has_frontier() {
                if self.pool.all_idle() {
                    tracing::info!("Frontier empty and all workers idle");
                    return CrawlStatus::Done;
                }
                return CrawlStatus::Running;
            }

            if !self.pool.all_idle() {
                tracing::debug!("All workers busy, deferring distribution");
                return CrawlStatus::Running;
            }

            // work left, nobody busy: only possible after a worker stopped mid-dispatch
            if !self.pool.has_live_workers() {
                tracing::warn!("No live workers left for the remaining frontier");
                return CrawlStatus::Interrupted;
            }
        }
    }

    fn dispatch_frontier(&mut self) {
        for depth in self.state.frontier_depths() {
            let Some(urls) = self.state.take_bucket(depth) else {
                continue;
            };

            match self.pool.distribute(depth, &urls) {
                Ok(()) => {
                    tracing::debug!("Distributed {} urls at depth {}", urls.len(), depth);
                }
                Err(DispatchError::NoIdleWorkers) => {
                    self.state.restore_bucket(depth, urls);
                    break;
                }
                Err(DispatchError::Undelivered(rest)) => {
                    tracing::warn!("Requeueing {} urls at depth {}", rest.len(), depth);
                    self.state.restore_bucket(depth, rest);
                }
            }
        }
    }
}
