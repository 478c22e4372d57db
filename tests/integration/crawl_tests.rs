//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the HTTP fetcher and the full crawl cycle end-to-end.

use sitecrawler::config::{CrawlConfig, HttpConfig};
use sitecrawler::crawler::{crawl_site, FetchError, Fetcher, HttpFetcher};
use sitecrawler::write_sitemap;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a small site:
///
/// ```text
/// /       -> /page1, /page2, /doc.pdf, https://other.example/x, mailto:
/// /page1  -> /page3, /
/// /page2  -> 404
/// /page3  -> /page4
/// ```
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    mount_page(
        server,
        "/",
        html(format!(
            r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/doc.pdf">Doc</a>
            <a href="https://other.example/x">Elsewhere</a>
            <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#
        )),
    )
    .await;

    mount_page(
        server,
        "/page1",
        html(r#"<a href="/page3">3</a><a href="/">home</a>"#.to_string()),
    )
    .await;

    mount_page(server, "/page2", ResponseTemplate::new(404)).await;

    mount_page(
        server,
        "/doc.pdf",
        ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"),
    )
    .await;

    mount_page(
        server,
        "/page3",
        html(r#"<a href="/page4">4</a>"#.to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_http_fetcher_reads_page() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/hello", html("<p>hi</p>".to_string())).await;

    let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/hello", mock_server.uri())).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.content_type.as_deref(), Some("text/html"));
    assert_eq!(page.body, "<p>hi</p>");
}

#[tokio::test]
async fn test_http_fetcher_returns_error_status_as_page() {
    let mock_server = MockServer::start().await;

    let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/nowhere", mock_server.uri())).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();

    assert_eq!(page.status, 404);
}

#[tokio::test]
async fn test_http_fetcher_skips_unusable_bodies() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/archive.bin",
        ResponseTemplate::new(200).set_body_raw(vec![0u8; 64 * 1024], "application/octet-stream"),
    )
    .await;
    mount_page(
        &mock_server,
        "/gone",
        ResponseTemplate::new(404).set_body_raw("<p>not here</p>".repeat(1000), "text/html"),
    )
    .await;

    let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();

    let url = Url::parse(&format!("{}/archive.bin", mock_server.uri())).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.content_type.as_deref(), Some("application/octet-stream"));
    assert!(page.body.is_empty());

    let url = Url::parse(&format!("{}/gone", mock_server.uri())).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();
    assert_eq!(page.status, 404);
    assert!(page.body.is_empty());
}

#[tokio::test]
async fn test_full_crawl_depth_limited() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let config = CrawlConfig::new(base.clone())
        .with_max_depth(2)
        .with_workers(3);
    let report = crawl_site(&config, CancellationToken::new()).await.unwrap();

    let root = format!("{}/", base);
    let page = |p: &str| format!("{}/{}", base, p);

    assert!(!report.interrupted);
    assert_eq!(report.base_url.as_str(), root);

    // home page was fetched once and linked back once
    assert_eq!(report.visited[&root], 2);
    assert_eq!(report.visited[&page("page1")], 1);
    // found at the depth bound: seen, never fetched
    assert_eq!(report.visited[&page("page3")], 1);
    assert!(!report.visited.contains_key(&page("page4")));
    assert!(!report.visited.contains_key("https://other.example/x"));

    assert_eq!(report.fetched[&0].len(), 1);
    assert_eq!(report.fetched[&1].len(), 3);
    assert!(!report.fetched.contains_key(&2));

    assert_eq!(report.errored[&page("page2")], FetchError::Status(404));
    assert_eq!(
        report.errored[&page("doc.pdf")],
        FetchError::ContentType("application/pdf".to_string())
    );

    let skipped = &report.skipped[&root];
    assert!(skipped.contains(&"https://other.example/x".to_string()));
    assert!(skipped.contains(&"mailto:someone@example.com".to_string()));
}

#[tokio::test]
async fn test_full_crawl_depth_zero_fetches_only_start() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let config = CrawlConfig::new(mock_server.uri()).with_max_depth(0);
    let report = crawl_site(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(report.fetched.keys().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(report.fetched_count(), 1);
    assert!(report.errored.is_empty());
}

#[tokio::test]
async fn test_crawl_writes_sitemap() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let config = CrawlConfig::new(mock_server.uri()).with_max_depth(1);
    let report = crawl_site(&config, CancellationToken::new()).await.unwrap();

    let dir = TempDir::new().unwrap();
    let sitemap = dir.path().join("sitemap.xml");
    write_sitemap(&report, &sitemap).unwrap();

    let xml = std::fs::read_to_string(&sitemap).unwrap();
    assert_eq!(xml.matches("<url>").count(), report.unique_count());
    assert!(xml.contains(&format!("<loc>{}/page1</loc>", mock_server.uri())));
}

#[tokio::test]
async fn test_crawl_site_rejects_bad_config() {
    let config = CrawlConfig::new("ftp://example.com/");
    let result = crawl_site(&config, CancellationToken::new()).await;
    assert!(result.is_err());
}
