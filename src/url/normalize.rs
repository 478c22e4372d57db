use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "msclkid"];

/// Resolves `raw` against `base` and normalizes the result
///
/// # Normalization Steps
///
/// 1. Resolve relative references against the page URL
/// 2. Reject anything that is not http/https or has no host
/// 3. Remove the fragment
/// 4. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 5. Sort remaining query parameters, drop an empty query
///
/// Host lowercasing, default-port removal and dot-segment resolution are
/// done by the `url` parser itself.
///
/// # Examples
///
/// ```
/// use sitecrawler::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let link = normalize_link(&base, "../about?utm_source=x#team").unwrap();
/// assert_eq!(link.as_str(), "https://example.com/about");
///
/// assert!(normalize_link(&base, "mailto:me@example.com").is_err());
/// ```
pub fn normalize_link(base: &Url, raw: &str) -> Result<Url, UrlError> {
    let url = base
        .join(raw.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    clean(url)
}

/// Parses and normalizes an absolute URL
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    clean(url)
}

fn clean(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&params);
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts the rest by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
