//! Configuration module for sitecrawler
//!
//! This module handles loading, parsing, and validating crawl settings,
//! either from a TOML file or built programmatically.
//!
//! # Example
//!
//! ```no_run
//! use sitecrawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{default_workers, CrawlConfig, CrawlerConfig, HttpConfig, OutputConfig};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, MAX_WORKERS};
