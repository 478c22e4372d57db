//! Sitemap XML export
//!
//! Writes every visited URL as a sitemaps.org `<urlset>` document.

use crate::output::CrawlReport;
use crate::CrawlError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Writes a sitemap of all visited URLs
///
/// URLs are written in lexical order. `lastmod` is the date the crawl
/// finished.
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `path` - Destination file, created or truncated
///
/// # Returns
///
/// * `Ok(())` - Sitemap written
/// * `Err(CrawlError)` - File could not be created or written
pub fn write_sitemap(report: &CrawlReport, path: &Path) -> Result<(), CrawlError> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    render_sitemap(report, &mut out)?;
    out.flush()?;

    tracing::info!(
        "Wrote sitemap with {} urls to {}",
        report.unique_count(),
        path.display()
    );
    Ok(())
}

/// Renders the sitemap document into any writer
pub fn render_sitemap<W: Write>(report: &CrawlReport, out: W) -> Result<(), CrawlError> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    let lastmod = report.finished_at.format("%Y-%m-%d").to_string();

    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_event(
        &mut writer,
        Event::Start(BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NAMESPACE)])),
    )?;

    for url in report.sorted_urls() {
        write_event(&mut writer, Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", url)?;
        write_text_element(&mut writer, "lastmod", &lastmod)?;
        write_event(&mut writer, Event::End(BytesEnd::new("url")))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("urlset")))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), CrawlError> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), CrawlError> {
    writer
        .write_event(event)
        .map_err(|e| CrawlError::Sitemap(e.to_string()))
}
