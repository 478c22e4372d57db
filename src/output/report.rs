//! Final crawl report
//!
//! A [`CrawlReport`] is the read-only snapshot the coordinator hands back
//! once the crawl is done or interrupted. Its `Display` implementation is the
//! plain-text summary printed by the CLI.

use crate::crawler::FetchError;
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use url::Url;

const HEAVY_RULE: &str = "==========";
const LIGHT_RULE: &str = "----------";

/// Result of a crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Starting address, depth 0
    pub base_url: Url,

    /// Every URL seen, with the number of times it was seen
    pub visited: HashMap<String, usize>,

    /// URLs actually fetched, by depth
    pub fetched: BTreeMap<usize, Vec<Url>>,

    /// Source URL -> links filtered out while expanding it
    pub skipped: HashMap<String, Vec<String>>,

    /// URL -> reason it could not be crawled
    pub errored: HashMap<String, FetchError>,

    /// Pattern the domain filter was built from
    pub domain_filter: String,

    pub max_depth: i32,
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Takes a snapshot of the final crawl state
    pub fn new(state: CrawlState, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            base_url: state.base_url().clone(),
            visited: state.visited().clone(),
            fetched: state.fetched().clone(),
            skipped: state.skipped().clone(),
            errored: state.errored().clone(),
            domain_filter: state.domain_filter().as_str().to_string(),
            max_depth: state.max_depth(),
            interrupted: state.is_interrupted(),
            started_at,
            finished_at,
        }
    }

    /// Number of distinct URLs seen
    pub fn unique_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of fetches across all depths, failed ones included
    pub fn fetched_count(&self) -> usize {
        self.fetched.values().map(Vec::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.errored.len()
    }

    /// Visited URLs in lexical order
    pub fn sorted_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.visited.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    /// Every skipped string once, in lexical order
    pub fn skipped_urls(&self) -> BTreeSet<&str> {
        self.skipped
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f, "Scrape stats for: {}", self.base_url)?;
        writeln!(
            f,
            "Max Depth: {}  Regex: {}  Interrupted: {}",
            self.max_depth, self.domain_filter, self.interrupted
        )?;
        writeln!(f, "{}", HEAVY_RULE)?;

        if self.visited.is_empty() {
            return Ok(());
        }

        writeln!(f, "Unique URLs scrapped: {}", self.unique_count())?;
        writeln!(f, "{}", LIGHT_RULE)?;
        for url in self.sorted_urls() {
            writeln!(f, "{}", url)?;
        }
        writeln!(f, "{}", LIGHT_RULE)?;

        if !self.fetched.is_empty() {
            writeln!(f)?;
            writeln!(f, "URLs scrapped per depth:")?;
            writeln!(f, "{}", LIGHT_RULE)?;
            for (depth, urls) in &self.fetched {
                writeln!(f)?;
                writeln!(f, "Depth: {}", depth)?;
                writeln!(f, "{}", LIGHT_RULE)?;
                let mut urls: Vec<&str> = urls.iter().map(Url::as_str).collect();
                urls.sort_unstable();
                for url in urls {
                    writeln!(f, "{}", url)?;
                }
                writeln!(f, "{}", LIGHT_RULE)?;
            }
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped URLs:")?;
            writeln!(f, "{}", LIGHT_RULE)?;
            for url in self.skipped_urls() {
                writeln!(f, "{}", url)?;
            }
            writeln!(f, "{}", LIGHT_RULE)?;
        }

        if !self.errored.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed URLs:")?;
            writeln!(f, "{}", LIGHT_RULE)?;
            let failed: BTreeMap<&str, &FetchError> = self
                .errored
                .iter()
                .map(|(url, error)| (url.as_str(), error))
                .collect();
            for (url, error) in failed {
                writeln!(f, "{} ({})", url, error)?;
            }
            writeln!(f, "{}", LIGHT_RULE)?;
        }

        Ok(())
    }
}
