//! Output module for crawl reports
//!
//! This module handles:
//! - Snapshotting the final crawl state into a [`CrawlReport`]
//! - The plain-text summary printed by the CLI
//! - Exporting visited URLs as a sitemap

mod report;
mod sitemap;

pub use report::CrawlReport;
pub use sitemap::{render_sitemap, write_sitemap};
