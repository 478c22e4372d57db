//! End-to-end crawls against an in-memory site
//!
//! Pages are served from a map so that every run sees the same graph. Only
//! set membership and per-source ordering are asserted; batches from
//! different workers may arrive in any order.

use async_trait::async_trait;
use sitecrawler::config::CrawlConfig;
use sitecrawler::crawler::{crawl, FetchError, FetchedPage, Fetcher, HtmlExtractor};
use sitecrawler::{ConfigError, CrawlError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Default)]
struct MemorySite {
    pages: HashMap<String, FetchedPage>,
    requests: AtomicUsize,
}

impl MemorySite {
    fn page(mut self, url: &str, links: &[&str]) -> Self {
        let body: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">link</a>"#, l))
            .collect();
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                status: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body,
            },
        );
        self
    }

    fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                status,
                content_type: None,
                body: String::new(),
            },
        );
        self
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemorySite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Request("no such host".to_string()))
    }
}

/// Never answers
struct HangingFetcher;

#[async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<FetchedPage, FetchError> {
        std::future::pending::<()>().await;
        Err(FetchError::Request("unreachable".to_string()))
    }
}

/// Serves `site` but panics on one URL
struct PanicsOn {
    site: MemorySite,
    url: &'static str,
}

#[async_trait]
impl Fetcher for PanicsOn {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if url.as_str() == self.url {
            panic!("fetcher blew up on {}", url);
        }
        self.site.fetch(url).await
    }
}

async fn run(site: Arc<MemorySite>, config: CrawlConfig) -> sitecrawler::CrawlReport {
    crawl(&config, site, Arc::new(HtmlExtractor), CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_depth_one_with_foreign_link() {
    let site = Arc::new(
        MemorySite::default().page(
            "https://example.com/",
            &["https://example.com/a", "https://other.com/b"],
        ),
    );
    let config = CrawlConfig::new("https://example.com")
        .with_max_depth(1)
        .with_domain_regex("example\\.com")
        .with_workers(2);

    let report = run(site.clone(), config).await;

    assert!(!report.interrupted);
    assert!(report.visited.contains_key("https://example.com/"));
    assert!(report.visited.contains_key("https://example.com/a"));
    assert!(!report.visited.contains_key("https://other.com/b"));
    assert_eq!(
        report.skipped["https://example.com/"],
        vec!["https://other.com/b".to_string()]
    );
    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[&0][0].as_str(), "https://example.com/");
    assert_eq!(site.request_count(), 1);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_start() {
    let site = Arc::new(
        MemorySite::default()
            .page("https://example.com/", &["/a", "/b"])
            .page("https://example.com/a", &[]),
    );
    let config = CrawlConfig::new("https://example.com/").with_max_depth(0);

    let report = run(site.clone(), config).await;

    assert_eq!(report.fetched.keys().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(report.unique_count(), 3);
    assert_eq!(site.request_count(), 1);
}

#[tokio::test]
async fn test_fetch_error_recorded_without_expansion() {
    let site = Arc::new(MemorySite::default().status("https://example.com/", 500));
    let config = CrawlConfig::new("https://example.com/").with_workers(4);

    let report = run(site, config).await;

    assert_eq!(report.error_count(), 1);
    assert_eq!(
        report.errored["https://example.com/"],
        FetchError::Status(500)
    );
    assert_eq!(report.fetched_count(), 1);
    assert_eq!(report.unique_count(), 1);
    assert!(!report.interrupted);
}

#[tokio::test]
async fn test_duplicate_from_two_pages_fetched_once() {
    let site = Arc::new(
        MemorySite::default()
            .page("https://example.com/", &["/a", "/b"])
            .page("https://example.com/a", &["/shared"])
            .page("https://example.com/b", &["/shared"])
            .page("https://example.com/shared", &[]),
    );
    let config = CrawlConfig::new("https://example.com/").with_workers(3);

    let report = run(site.clone(), config).await;

    assert_eq!(report.visited["https://example.com/shared"], 2);
    let fetched_shared = report
        .fetched
        .values()
        .flatten()
        .filter(|u| u.as_str() == "https://example.com/shared")
        .count();
    assert_eq!(fetched_shared, 1);
    assert_eq!(site.request_count(), 4);
}

#[tokio::test]
async fn test_unlimited_depth_follows_chain() {
    let site = Arc::new(
        MemorySite::default()
            .page("https://example.com/", &["/1"])
            .page("https://example.com/1", &["/2"])
            .page("https://example.com/2", &["/3"])
            .page("https://example.com/3", &["/"]),
    );
    let config = CrawlConfig::new("https://example.com/").with_workers(1);

    let report = run(site, config).await;

    assert_eq!(report.fetched.len(), 4);
    assert_eq!(report.fetched[&3][0].as_str(), "https://example.com/3");
    assert_eq!(report.visited["https://example.com/"], 2);
}

#[tokio::test]
async fn test_foreign_hosts_never_queued() {
    let site = Arc::new(MemorySite::default().page(
        "https://example.com/",
        &["https://other.com/", "https://cdn.other.com/x", "/local"],
    ));
    let config = CrawlConfig::new("https://example.com/").with_workers(2);

    let report = run(site.clone(), config).await;

    let skipped = &report.skipped["https://example.com/"];
    assert_eq!(skipped.len(), 2);
    assert!(report.visited.keys().all(|u| u.starts_with("https://example.com/")));
    // /local is fetched and fails: the map has no page for it
    assert!(report.errored.contains_key("https://example.com/local"));
    assert_eq!(site.request_count(), 2);
}

#[tokio::test]
async fn test_cancel_mid_fetch_interrupts() {
    let cancel = CancellationToken::new();
    let config = CrawlConfig::new("https://example.com/").with_workers(2);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        crawl(&config, Arc::new(HangingFetcher), Arc::new(HtmlExtractor), cancel),
    )
    .await
    .expect("crawl did not stop after cancellation")
    .unwrap();

    assert!(report.interrupted);
    assert!(report.visited.is_empty());
    assert!(report.fetched.is_empty());
}

#[tokio::test]
async fn test_panicking_fetcher_ends_crawl_as_interrupted() {
    let fetcher = PanicsOn {
        site: MemorySite::default(),
        url: "https://example.com/",
    };
    let config = CrawlConfig::new("https://example.com/").with_workers(2);

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        crawl(
            &config,
            Arc::new(fetcher),
            Arc::new(HtmlExtractor),
            CancellationToken::new(),
        ),
    )
    .await
    .expect("crawl hung after a worker panicked")
    .unwrap();

    assert!(report.interrupted);
    assert!(report.fetched.is_empty());
}

#[tokio::test]
async fn test_panic_on_one_page_keeps_the_rest() {
    let fetcher = PanicsOn {
        site: MemorySite::default()
            .page("https://example.com/", &["/a", "/boom"])
            .page("https://example.com/a", &[]),
        url: "https://example.com/boom",
    };
    let config = CrawlConfig::new("https://example.com/").with_workers(2);

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        crawl(
            &config,
            Arc::new(fetcher),
            Arc::new(HtmlExtractor),
            CancellationToken::new(),
        ),
    )
    .await
    .expect("crawl hung after a worker panicked")
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.fetched[&1], vec![Url::parse("https://example.com/a").unwrap()]);
    assert!(!report.errored.contains_key("https://example.com/boom"));
}

#[tokio::test]
async fn test_invalid_configs_rejected_before_crawling() {
    let site = Arc::new(MemorySite::default());

    let bad_url = CrawlConfig::new("not a url");
    let bad_regex = CrawlConfig::new("https://example.com/").with_domain_regex("(unclosed");
    let no_workers = CrawlConfig::new("https://example.com/").with_workers(0);

    for config in [bad_url, bad_regex, no_workers] {
        let result = crawl(
            &config,
            site.clone(),
            Arc::new(HtmlExtractor),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }
    assert_eq!(site.request_count(), 0);
}

#[tokio::test]
async fn test_bad_regex_reports_pattern_error() {
    let config = CrawlConfig::new("https://example.com/").with_domain_regex("[");
    let result = crawl(
        &config,
        Arc::new(MemorySite::default()),
        Arc::new(HtmlExtractor),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(CrawlError::Config(ConfigError::InvalidPattern(_)))
    ));
}
