//! Crawl state owned by the coordinator
//!
//! Nothing in here is shared with worker tasks, so none of it is locked.

use crate::crawler::FetchError;
use crate::url::DomainFilter;
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// Everything the coordinator knows about a crawl in progress
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// Starting address, depth 0
    base_url: Url,

    /// URL -> number of times it was fetched or seen again as a duplicate
    visited: HashMap<String, usize>,

    /// Discovered but not yet dispatched URLs, by depth
    frontier: BTreeMap<usize, Vec<Url>>,

    /// URLs actually fetched, by depth
    fetched: BTreeMap<usize, Vec<Url>>,

    /// Source URL -> raw strings filtered out while expanding it
    skipped: HashMap<String, Vec<String>>,

    /// URL -> reason it could not be crawled
    errored: HashMap<String, FetchError>,

    /// Queued or in-flight URLs -> duplicate discoveries seen meanwhile
    pending: HashMap<String, usize>,

    domain_filter: DomainFilter,

    /// -1 means unlimited
    max_depth: i32,

    interrupted: bool,
}

impl CrawlState {
    pub fn new(base_url: Url, domain_filter: DomainFilter, max_depth: i32) -> Self {
        Self {
            base_url,
            visited: HashMap::new(),
            frontier: BTreeMap::new(),
            fetched: BTreeMap::new(),
            skipped: HashMap::new(),
            errored: HashMap::new(),
            pending: HashMap::new(),
            domain_filter,
            max_depth,
            interrupted: false,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn domain_filter(&self) -> &DomainFilter {
        &self.domain_filter
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    /// The depth bound, `None` when unlimited
    pub fn depth_limit(&self) -> Option<usize> {
        usize::try_from(self.max_depth).ok()
    }

    pub fn visited(&self) -> &HashMap<String, usize> {
        &self.visited
    }

    pub fn fetched(&self) -> &BTreeMap<usize, Vec<Url>> {
        &self.fetched
    }

    pub fn frontier(&self) -> &BTreeMap<usize, Vec<Url>> {
        &self.frontier
    }

    pub fn skipped(&self) -> &HashMap<String, Vec<String>> {
        &self.skipped
    }

    pub fn errored(&self) -> &HashMap<String, FetchError> {
        &self.errored
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains_key(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains_key(url)
    }

    /// Records a fetched source page, folding in duplicates seen while it was queued
    pub fn record_source(&mut self, url: &Url) -> usize {
        let duplicates = self.pending.remove(url.as_str()).unwrap_or(0);
        let count = self.visited.entry(url.to_string()).or_insert(0);
        *count += 1 + duplicates;
        *count
    }

    /// Inserts `url` at 1 or increments its count
    pub fn record_visit(&mut self, url: &str) -> usize {
        let count = self.visited.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Counts another discovery of a URL that is already queued
    pub fn record_pending_duplicate(&mut self, url: &str) {
        if let Some(count) = self.pending.get_mut(url) {
            *count += 1;
        }
    }

    pub fn record_fetched(&mut self, depth: usize, url: Url) {
        self.fetched.entry(depth).or_default().push(url);
    }

    pub fn record_skipped<I>(&mut self, source: &Url, raw: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut raw = raw.into_iter().peekable();
        if raw.peek().is_none() {
            return;
        }

        self.skipped
            .entry(source.to_string())
            .or_default()
            .extend(raw);
    }

    pub fn record_error(&mut self, url: &Url, error: FetchError) {
        self.errored.insert(url.to_string(), error);
    }

    /// Appends URLs to the frontier bucket for `depth` and marks them pending
    pub fn enqueue(&mut self, depth: usize, urls: Vec<Url>) {
        if urls.is_empty() {
            return;
        }

        for url in &urls {
            self.pending.entry(url.to_string()).or_insert(0);
        }
        self.frontier.entry(depth).or_default().extend(urls);
    }

    pub fn has_frontier(&self) -> bool {
        !self.frontier.is_empty()
    }

    /// Frontier depths in ascending order
    pub fn frontier_depths(&self) -> Vec<usize> {
        self.frontier.keys().copied().collect()
    }

    /// Removes and returns the bucket for `depth`
    pub fn take_bucket(&mut self, depth: usize) -> Option<Vec<Url>> {
        self.frontier.remove(&depth)
    }

    /// Puts URLs that could not be dispatched back at the front of their bucket
    pub fn restore_bucket(&mut self, depth: usize, mut urls: Vec<Url>) {
        if urls.is_empty() {
            return;
        }

        let bucket = self.frontier.entry(depth).or_default();
        urls.append(bucket);
        *bucket = urls;
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }
}
