//! Output module for crawl reporting
//!
//! This module handles:
//! - Accumulating per-run counters
//! - Logging and printing run summaries
//! - Reading cross-run totals from the state database

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStats, StoredStatistics};
