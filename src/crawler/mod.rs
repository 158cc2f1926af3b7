//! Crawler module for board fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - List and detail page extraction
//! - Page selection (explicit lists and open-ended sweeps)
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod pages;
mod parser;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, HttpFetcher, QueryParams, RetryPolicy};
pub use pages::{parse_page_list, PageCursor, PageList};
pub use parser::{
    extract_notice_meta, BoardExtractor, DetailExtractor, FileLink, ListExtractor, NoticeMeta,
    Post,
};

use crate::config::Config;
use crate::output::CrawlStats;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Open the state database, if one is configured
/// 3. Walk the selected list pages
/// 4. Follow new posts and download their PDFs
/// 5. Return the run statistics
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash identifying the configuration, stored with the run
/// * `cursor` - Pages to visit
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl ran to the end of its page selection
/// * `Err(CrawlError)` - Setup failed before any request was sent
pub async fn crawl(
    config: Config,
    config_hash: &str,
    cursor: PageCursor,
) -> Result<CrawlStats, CrawlError> {
    run_crawl(config, config_hash, cursor).await
}
