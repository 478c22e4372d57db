use crate::ConfigError;
use regex::Regex;
use std::fmt;
use url::Url;

/// Compiled pattern deciding whether a URL's host is in scope
///
/// The pattern is an unanchored regular expression tested against the host
/// component only (no scheme, port or path).
///
/// # Examples
///
/// ```
/// use sitecrawler::url::DomainFilter;
/// use url::Url;
///
/// let filter = DomainFilter::new(r"example\.com$").unwrap();
/// assert!(filter.matches(&Url::parse("https://blog.example.com/post").unwrap()));
/// assert!(!filter.matches(&Url::parse("https://other.com/").unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct DomainFilter {
    regex: Regex,
}

impl DomainFilter {
    /// Compiles `pattern` into a filter
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    /// Builds a filter matching `host` literally
    pub fn for_host(host: &str) -> Result<Self, ConfigError> {
        Self::new(&regex::escape(host))
    }

    /// Uses `pattern` when given, otherwise falls back to the host of `base`
    pub fn resolve(pattern: &str, base: &Url) -> Result<Self, ConfigError> {
        if !pattern.is_empty() {
            return Self::new(pattern);
        }

        let host = base
            .host_str()
            .ok_or_else(|| ConfigError::InvalidUrl(format!("'{}' has no host", base)))?;
        let filter = Self::for_host(host)?;
        tracing::info!("Defaulting domain filter to {}", filter);
        Ok(filter)
    }

    /// Tests the URL's host; URLs without a host never match
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.matches_host(host))
            .unwrap_or(false)
    }

    pub fn matches_host(&self, host: &str) -> bool {
        self.regex.is_match(host)
    }

    /// The source pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Display for DomainFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
