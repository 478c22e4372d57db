//! Fetch workers and the pool the coordinator dispatches to
//!
//! Each worker is a tokio task with its own inbound channel. The coordinator
//! keeps a [`WorkerHandle`] per worker: the sending half of that channel plus
//! the worker's busy flag. The flag is the only memory shared between the
//! coordinator and a worker:
//!
//! - the coordinator sets it when it queues a [`WorkItem`],
//! - the coordinator clears it when it acknowledges the worker's batch.
//!
//! The worker itself never writes the flag.
//!
//! Clearing on acknowledgment means the coordinator never sees a worker as
//! idle before its results are in hand, and never sees a stale busy flag
//! after it has taken them.

use crate::crawler::fetcher::{is_html, FetchError, Fetcher};
use crate::crawler::parser::LinkExtractor;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use url::Url;

/// URLs at one depth handed to a single worker
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Depth of the URLs being fetched
    pub depth: usize,
    pub urls: Vec<Url>,
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Depth of the links found on this page (source depth + 1)
    pub depth: usize,
    pub source_url: Url,
    pub discovered_urls: Vec<Url>,
    pub invalid_strings: Vec<String>,
    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn failed(depth: usize, source_url: Url, error: FetchError) -> Self {
        Self {
            depth,
            source_url,
            discovered_urls: Vec::new(),
            invalid_strings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Everything a worker reports for one [`WorkItem`]
#[derive(Debug)]
pub struct ResultBatch {
    pub worker_id: usize,
    pub worker: String,
    /// One result per requested URL, in request order
    pub results: Vec<FetchResult>,
    /// Fired by the coordinator once it owns the batch
    pub ack: oneshot::Sender<()>,
}

/// Dispatch failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every worker is busy; retry after the next batch arrives
    #[error("all workers are busy")]
    NoIdleWorkers,

    /// Some workers stopped before their share could be queued
    #[error("{} urls could not be handed to a worker", .0.len())]
    Undelivered(Vec<Url>),
}

fn read_flag(flag: &RwLock<bool>) -> bool {
    match flag.read() {
        Ok(busy) => *busy,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_flag(flag: &RwLock<bool>, value: bool) {
    match flag.write() {
        Ok(mut busy) => *busy = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

/// Coordinator-side view of one worker
#[derive(Debug)]
pub struct WorkerHandle {
    id: usize,
    name: String,
    busy: Arc<RwLock<bool>>,
    inbox: mpsc::UnboundedSender<WorkItem>,
}

impl WorkerHandle {
    pub fn new(
        id: usize,
        name: impl Into<String>,
        busy: Arc<RwLock<bool>>,
        inbox: mpsc::UnboundedSender<WorkItem>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            busy,
            inbox,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_busy(&self) -> bool {
        read_flag(&self.busy)
    }

    /// The worker task has ended and will never take work again
    pub fn is_stopped(&self) -> bool {
        self.inbox.is_closed()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_busy() && !self.is_stopped()
    }

    /// Marks the worker busy and queues the item without waiting for it to be received
    fn dispatch(&self, item: WorkItem) -> Result<(), WorkItem> {
        write_flag(&self.busy, true);
        self.inbox.send(item).map_err(|e| {
            write_flag(&self.busy, false);
            e.0
        })
    }

    fn release(&self) {
        write_flag(&self.busy, false);
    }
}

/// Fetches batches of URLs and reports them back to the coordinator
pub struct Worker {
    id: usize,
    name: String,
    inbox: mpsc::UnboundedReceiver<WorkItem>,
    results: mpsc::UnboundedSender<ResultBatch>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
}

impl Worker {
    /// Creates a worker and the handle the coordinator keeps for it
    pub fn new(
        id: usize,
        results: mpsc::UnboundedSender<ResultBatch>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> (Self, WorkerHandle) {
        let name = format!("worker-{}", id);
        let busy = Arc::new(RwLock::new(false));
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = WorkerHandle::new(id, name.clone(), busy, tx);
        let worker = Self {
            id,
            name,
            inbox: rx,
            results,
            fetcher,
            extractor,
        };
        (worker, handle)
    }

    /// Runs until cancelled, until the coordinator drops this worker's handle,
    /// or until the coordinator stops listening for results.
    ///
    /// Cancellation is only observed between items; a fetch in flight is
    /// allowed to finish and its batch is then dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!("Starting {}", self.name);

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => break,
                item = self.inbox.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            tracing::debug!(
                "{} crawling {} urls from depth {}",
                self.name,
                item.urls.len(),
                item.depth
            );

            let results = self.crawl_urls(item).await;
            let (ack, acked) = oneshot::channel();
            let batch = ResultBatch {
                worker_id: self.id,
                worker: self.name.clone(),
                results,
                ack,
            };

            if self.results.send(batch).is_err() {
                tracing::debug!("{}: coordinator gone, dropping batch", self.name);
                break;
            }

            if acked.await.is_err() {
                tracing::debug!("{}: batch was never acknowledged", self.name);
                break;
            }
        }

        tracing::debug!("Stopping {}", self.name);
    }

    async fn crawl_urls(&self, item: WorkItem) -> Vec<FetchResult> {
        let mut results = Vec::with_capacity(item.urls.len());
        for url in item.urls {
            results.push(self.crawl_url(item.depth, url).await);
        }
        results
    }

    /// Fetches one URL and extracts its links; failures become part of the result
    async fn crawl_url(&self, depth: usize, url: Url) -> FetchResult {
        let next_depth = depth + 1;

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", url, e);
                return FetchResult::failed(next_depth, url, e);
            }
        };

        if !(200..300).contains(&page.status) {
            return FetchResult::failed(next_depth, url, FetchError::Status(page.status));
        }

        if !is_html(page.content_type.as_deref()) {
            let content_type = page.content_type.unwrap_or_default();
            let error = FetchError::ContentType(content_type);
            return FetchResult::failed(next_depth, url, error);
        }

        let links = self.extractor.extract(&url, &page.body);
        FetchResult {
            depth: next_depth,
            source_url: url,
            discovered_urls: links.valid,
            invalid_strings: links.invalid,
            error: None,
        }
    }
}

/// The fixed set of workers a coordinator dispatches to
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    shutdown: CancellationToken,
    /// Ids of worker tasks that panicked
    lost: mpsc::UnboundedReceiver<usize>,
}

impl WorkerPool {
    /// Spawns `size` workers onto the current tokio runtime
    pub fn spawn(
        size: usize,
        results: mpsc::UnboundedSender<ResultBatch>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
        cancel: &CancellationToken,
    ) -> Self {
        let shutdown = cancel.child_token();
        let (lost_tx, lost) = mpsc::unbounded_channel();
        let workers = (0..size)
            .map(|id| {
                let (worker, handle) =
                    Worker::new(id, results.clone(), fetcher.clone(), extractor.clone());
                let task = tokio::spawn(worker.run(shutdown.clone()));

                let lost_tx = lost_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = task.await {
                        if e.is_panic() {
                            tracing::error!("worker-{} panicked", id);
                            let _ = lost_tx.send(id);
                        }
                    }
                });
                handle
            })
            .collect();

        Self {
            workers,
            shutdown,
            lost,
        }
    }

    /// Builds a pool around handles whose workers are driven elsewhere
    pub fn from_handles(workers: Vec<WorkerHandle>) -> Self {
        let (_, lost) = mpsc::unbounded_channel();
        Self {
            workers,
            shutdown: CancellationToken::new(),
            lost,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn idle_workers(&self) -> Vec<&WorkerHandle> {
        self.workers.iter().filter(|w| w.is_idle()).collect()
    }

    /// No live worker is holding work
    pub fn all_idle(&self) -> bool {
        self.workers.iter().all(|w| !w.is_busy() || w.is_stopped())
    }

    pub fn has_live_workers(&self) -> bool {
        self.workers.iter().any(|w| !w.is_stopped())
    }

    /// Resolves with the id of the next worker whose task panicked
    ///
    /// Never resolves for a pool built with [`WorkerPool::from_handles`].
    pub async fn next_lost_worker(&mut self) -> usize {
        match self.lost.recv().await {
            Some(id) => id,
            None => std::future::pending().await,
        }
    }

    /// Clears and returns the workers that stopped while holding work
    ///
    /// A worker only stops with its flag set if its task died mid-item, e.g.
    /// a panicking fetcher. Whatever it held will never be reported.
    pub fn reap_lost_workers(&self) -> Vec<&str> {
        self.workers
            .iter()
            .filter(|w| w.is_stopped() && w.is_busy())
            .map(|w| {
                w.release();
                w.name()
            })
            .collect()
    }

    /// Clears the busy flag of the worker whose batch was just acknowledged
    pub fn release(&self, worker_id: usize) {
        if let Some(worker) = self.workers.iter().find(|w| w.id() == worker_id) {
            worker.release();
        }
    }

    /// Splits `urls` across the idle workers
    ///
    /// With no more URLs than idle workers each worker gets one URL and the
    /// rest stay idle. Otherwise every idle worker gets `urls / idle` URLs and
    /// the last one also takes the remainder.
    pub fn distribute(&self, depth: usize, urls: &[Url]) -> Result<(), DispatchError> {
        if urls.is_empty() {
            return Ok(());
        }

        let idle = self.idle_workers();
        if idle.is_empty() {
            return Err(DispatchError::NoIdleWorkers);
        }

        let shares: Vec<&[Url]> = if urls.len() <= idle.len() {
            urls.chunks(1).collect()
        } else {
            let share = urls.len() / idle.len();
            let last = idle.len() - 1;
            (0..idle.len())
                .map(|i| {
                    let start = i * share;
                    let end = if i == last { urls.len() } else { start + share };
                    &urls[start..end]
                })
                .collect()
        };

        let mut undelivered = Vec::new();
        for (worker, share) in idle.iter().zip(shares) {
            let item = WorkItem {
                depth,
                urls: share.to_vec(),
            };
            tracing::trace!("Queueing {} urls for {}", item.urls.len(), worker.name());
            if let Err(item) = worker.dispatch(item) {
                tracing::warn!("{} stopped before taking work", worker.name());
                undelivered.extend(item.urls);
            }
        }

        if undelivered.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Undelivered(undelivered))
        }
    }

    /// Tells every worker to stop once it is between items
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
