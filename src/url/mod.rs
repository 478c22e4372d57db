//! URL handling module for sitecrawler
//!
//! This module provides link normalization and the host-based domain filter
//! that decides which discovered URLs stay in scope.

mod filter;
mod normalize;

pub use filter::DomainFilter;
pub use normalize::{normalize_link, normalize_url};
