//! State management for the crawl
//!
//! The coordinator is the only owner of [`CrawlState`]; pipeline stages get
//! it as an explicit `&mut` parameter.

mod crawl_state;

pub use crawl_state::CrawlState;
