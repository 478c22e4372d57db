//! Sitecrawler main entry point
//!
//! This is the command-line interface for the sitecrawler breadth-first crawler.

use clap::Parser;
use sitecrawler::config::{load_config, validate, CrawlConfig};
use sitecrawler::crawler::crawl_site;
use sitecrawler::output::write_sitemap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sitecrawler: a bounded, concurrent site crawler
///
/// Crawls breadth-first from a start URL, following only links whose host
/// matches the domain filter, and reports every URL it saw.
#[derive(Parser, Debug)]
#[command(name = "sitecrawler")]
#[command(version)]
#[command(about = "A bounded, concurrent site crawler", long_about = None)]
struct Cli {
    /// Starting URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Max depth to crawl, -1 for no limit
    #[arg(long, value_name = "DEPTH", allow_hyphen_values = true)]
    max_depth: Option<i32>,

    /// Regex matched against link hosts; defaults to the start URL's host
    #[arg(long, value_name = "REGEX")]
    domain_regex: Option<String>,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Write a sitemap here instead of printing the report
    #[arg(long, value_name = "FILE")]
    sitemap: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let report = match crawl_site(&config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    match config.output.sitemap_path.as_deref() {
        Some(path) => {
            write_sitemap(&report, Path::new(path))?;
            println!("✓ Sitemap written to: {}", path);
        }
        None => print!("{}", report),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitecrawler=info,warn"),
            1 => EnvFilter::new("sitecrawler=debug,info"),
            2 => EnvFilter::new("sitecrawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, if any, and applies command-line overrides on top
fn build_config(cli: &Cli) -> Result<CrawlConfig, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        (None, Some(url)) => CrawlConfig::new(url.clone()),
        (None, None) => return Err("either --url or --config is required".into()),
    };

    if let Some(url) = &cli.url {
        config.crawler.start_url = url.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(pattern) = &cli.domain_regex {
        config.crawler.domain_regex = pattern.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(sitemap) = &cli.sitemap {
        config.output.sitemap_path = Some(sitemap.display().to_string());
    }

    validate(&config)?;
    Ok(config)
}
