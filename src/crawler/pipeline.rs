//! Post-processing pipeline for fetch results
//!
//! Every [`FetchResult`] goes through the same five stages, in this order:
//!
//! 1. [`DedupStage`] - record the source, drop links already visited or queued
//! 2. [`ErrorStage`] - record failed pages and stop
//! 3. [`SkipStage`] - record strings that failed normalization
//! 4. [`MaxDepthStage`] - fold depth-terminal links into `visited` and stop
//! 5. [`DomainFilterStage`] - keep only in-scope hosts
//!
//! A stage returning `false` stops the pipeline for that result, and nothing
//! it discovered reaches the frontier. The order matters: dedup must see the
//! result before any bookkeeping, and the depth check must come before the
//! domain filter so terminal links are folded into `visited` without ever
//! being queued.

use crate::crawler::worker::FetchResult;
use crate::state::CrawlState;
use std::collections::HashSet;

/// One step of the decision chain
pub trait Stage: Send {
    fn name(&self) -> &'static str;

    /// Inspects and possibly mutates `result` against `state`; `false` stops the chain
    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool;
}

/// Records the source URL and removes discoveries that were already seen
pub struct DedupStage;

impl Stage for DedupStage {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool {
        state.record_source(&result.source_url);

        let mut on_page = HashSet::new();
        result.discovered_urls.retain(|url| {
            let key = url.as_str();
            if !on_page.insert(key.to_string()) {
                return false;
            }

            if state.is_visited(key) {
                state.record_visit(key);
                return false;
            }

            if state.is_pending(key) {
                state.record_pending_duplicate(key);
                return false;
            }

            true
        });

        true
    }
}

/// Records fetch failures; failed pages contribute nothing further
pub struct ErrorStage;

impl Stage for ErrorStage {
    fn name(&self) -> &'static str {
        "error"
    }

    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool {
        match result.error.take() {
            Some(error) => {
                tracing::debug!("{} failed: {}", result.source_url, error);
                state.record_error(&result.source_url, error);
                false
            }
            None => true,
        }
    }
}

/// Records links that could not be normalized
pub struct SkipStage;

impl Stage for SkipStage {
    fn name(&self) -> &'static str {
        "skip"
    }

    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool {
        let invalid = std::mem::take(&mut result.invalid_strings);
        state.record_skipped(&result.source_url, invalid);
        true
    }
}

/// Stops expansion at the depth bound
///
/// Links found at the bound are never queued. In-scope ones are folded into
/// `visited` (they count as seen, but not as fetched); out-of-scope ones are
/// recorded as skipped for their source.
pub struct MaxDepthStage;

impl Stage for MaxDepthStage {
    fn name(&self) -> &'static str {
        "max-depth"
    }

    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool {
        if result.discovered_urls.is_empty() {
            return false;
        }

        match state.depth_limit() {
            Some(limit) if result.depth >= limit => {}
            _ => return true,
        }

        let mut out_of_scope = Vec::new();
        for url in result.discovered_urls.drain(..) {
            if state.domain_filter().matches(&url) {
                state.record_visit(url.as_str());
            } else {
                out_of_scope.push(url.to_string());
            }
        }
        state.record_skipped(&result.source_url, out_of_scope);
        false
    }
}

/// Keeps links whose host matches the domain filter
pub struct DomainFilterStage;

impl Stage for DomainFilterStage {
    fn name(&self) -> &'static str {
        "domain-filter"
    }

    fn apply(&self, state: &mut CrawlState, result: &mut FetchResult) -> bool {
        let filter = state.domain_filter();
        let (kept, rejected): (Vec<_>, Vec<_>) = std::mem::take(&mut result.discovered_urls)
            .into_iter()
            .partition(|url| filter.matches(url));

        result.discovered_urls = kept;
        state.record_skipped(
            &result.source_url,
            rejected.into_iter().map(|url| url.to_string()),
        );
        true
    }
}

/// The fixed, ordered stage list
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: vec![
                Box::new(DedupStage),
                Box::new(ErrorStage),
                Box::new(SkipStage),
                Box::new(MaxDepthStage),
                Box::new(DomainFilterStage),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs one result through every stage and queues whatever survives
    pub fn process(&self, state: &mut CrawlState, mut result: FetchResult) {
        let source_depth = result.depth.saturating_sub(1);
        state.record_fetched(source_depth, result.source_url.clone());

        for stage in &self.stages {
            if !stage.apply(state, &mut result) {
                tracing::trace!("{} stopped at stage {}", result.source_url, stage.name());
                return;
            }
        }

        if !result.discovered_urls.is_empty() {
            tracing::trace!(
                "Queueing {} urls at depth {} from {}",
                result.discovered_urls.len(),
                result.depth,
                result.source_url
            );
        }
        state.enqueue(result.depth, result.discovered_urls);
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
