//! HTML parser for extracting links
//!
//! Workers hand every HTML body to a [`LinkExtractor`]; the default
//! [`HtmlExtractor`] walks the document with `scraper` and normalizes every
//! candidate against the page URL.

use crate::url::normalize_link;
use scraper::{Html, Selector};
use url::Url;

/// Links pulled out of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Absolute, normalized http(s) URLs in document order
    pub valid: Vec<Url>,

    /// Raw href values that failed normalization
    pub invalid: Vec<String>,
}

/// Turns a response body into candidate links
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, page_url: &Url, body: &str) -> ExtractedLinks;
}

/// Default extractor for HTML documents
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">`
/// - `<link rel="canonical" href="...">`
///
/// **Ignore silently:**
/// - `<a href="..." download>`
/// - Empty and fragment-only hrefs (same page anchors)
///
/// **Report as invalid:**
/// - `javascript:`, `mailto:`, `tel:`, `data:` and other non-http(s) schemes
/// - Hrefs that cannot be resolved against the page URL
///
/// # Example
///
/// ```
/// use sitecrawler::crawler::{HtmlExtractor, LinkExtractor};
/// use url::Url;
///
/// let html = r#"<a href="/page">Link</a><a href="mailto:me@example.com">Mail</a>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let links = HtmlExtractor.extract(&page, html);
/// assert_eq!(links.valid[0].as_str(), "https://example.com/page");
/// assert_eq!(links.invalid, vec!["mailto:me@example.com".to_string()]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl LinkExtractor for HtmlExtractor {
    fn extract(&self, page_url: &Url, body: &str) -> ExtractedLinks {
        let document = Html::parse_document(body);
        let mut links = ExtractedLinks::default();

        if let Ok(a_selector) = Selector::parse("a[href]") {
            for element in document.select(&a_selector) {
                if element.value().attr("download").is_some() {
                    continue;
                }

                if let Some(href) = element.value().attr("href") {
                    push_link(&mut links, href, page_url);
                }
            }
        }

        if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
            for element in document.select(&canonical_selector) {
                if let Some(href) = element.value().attr("href") {
                    push_link(&mut links, href, page_url);
                }
            }
        }

        tracing::trace!(
            "Extracted {} links ({} invalid) from {}",
            links.valid.len(),
            links.invalid.len(),
            page_url
        );
        links
    }
}

fn push_link(links: &mut ExtractedLinks, href: &str, page_url: &Url) {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return;
    }

    match normalize_link(page_url, href) {
        Ok(url) => links.valid.push(url),
        Err(e) => {
            tracing::trace!("Skipping link {}: {}", href, e);
            links.invalid.push(href.to_string());
        }
    }
}
