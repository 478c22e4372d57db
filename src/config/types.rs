use crate::config::validation::MAX_WORKERS;
use serde::Deserialize;

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from (depth 0)
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum depth to crawl, -1 means unlimited
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: i32,

    /// Regular expression matched against candidate hosts.
    /// Empty means "the start URL's own host".
    #[serde(rename = "domain-regex", default)]
    pub domain_regex: String,

    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the sitemap; the text report is printed when unset
    #[serde(rename = "sitemap-path", default)]
    pub sitemap_path: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl CrawlConfig {
    /// Creates a configuration for `start_url` with every other setting defaulted
    ///
    /// # Example
    ///
    /// ```
    /// use sitecrawler::config::CrawlConfig;
    ///
    /// let config = CrawlConfig::new("https://example.com")
    ///     .with_max_depth(2)
    ///     .with_workers(4);
    /// assert_eq!(config.crawler.max_depth, 2);
    /// assert!(config.crawler.domain_regex.is_empty());
    /// ```
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig {
                start_url: start_url.into(),
                max_depth: default_max_depth(),
                domain_regex: String::new(),
                workers: default_workers(),
            },
            http: HttpConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: i32) -> Self {
        self.crawler.max_depth = max_depth;
        self
    }

    pub fn with_domain_regex(mut self, pattern: impl Into<String>) -> Self {
        self.crawler.domain_regex = pattern.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.crawler.workers = workers;
        self
    }
}

fn default_max_depth() -> i32 {
    -1
}

/// Two workers per available core, capped at [`MAX_WORKERS`]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_mul(2))
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

fn default_user_agent() -> String {
    format!("sitecrawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
