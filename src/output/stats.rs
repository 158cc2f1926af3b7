//! Crawl statistics
//!
//! `CrawlStats` is accumulated by the coordinator during a run;
//! `StoredStatistics` summarizes what the state database holds across runs.

use crate::state::{PageOutcome, PostOutcome};
use crate::storage::Storage;
use crate::CrawlError;
use std::time::Duration;

/// Counters for a single crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// List pages in the order they were processed
    pub pages_visited: Vec<u32>,

    pub pages_productive: u64,
    pub pages_empty: u64,
    pub pages_failed: u64,

    /// Posts seen on list pages, including already-done ones
    pub posts_discovered: u64,
    pub posts_already_done: u64,
    pub posts_completed: u64,
    pub posts_failed: u64,

    pub files_saved: u64,
    pub files_skipped_non_pdf: u64,
    pub files_failed: u64,

    pub elapsed: Duration,
}

impl CrawlStats {
    pub fn record_page(&mut self, page: u32, outcome: PageOutcome) {
        self.pages_visited.push(page);
        match outcome {
            PageOutcome::Productive { posts } => {
                self.pages_productive += 1;
                self.posts_discovered += posts as u64;
            }
            PageOutcome::Empty => self.pages_empty += 1,
            PageOutcome::Failed => self.pages_failed += 1,
        }
    }

    pub fn record_post(&mut self, outcome: PostOutcome) {
        match outcome {
            PostOutcome::AlreadyDone => self.posts_already_done += 1,
            PostOutcome::Completed {
                saved,
                skipped,
                failed,
            } => {
                self.posts_completed += 1;
                self.files_saved += saved as u64;
                self.files_skipped_non_pdf += skipped as u64;
                self.files_failed += failed as u64;
            }
            PostOutcome::Failed => self.posts_failed += 1,
        }
    }

    /// Emits the run summary as a single structured log record
    pub fn log_summary(&self) {
        tracing::info!(
            pages = self.pages_visited.len(),
            pages_productive = self.pages_productive,
            pages_empty = self.pages_empty,
            pages_failed = self.pages_failed,
            posts_completed = self.posts_completed,
            posts_failed = self.posts_failed,
            posts_already_done = self.posts_already_done,
            files_saved = self.files_saved,
            files_skipped_non_pdf = self.files_skipped_non_pdf,
            files_failed = self.files_failed,
            "Finished crawl in {:.1}s",
            self.elapsed.as_secs_f64()
        );
    }
}

/// Prints run statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Visited: {}", stats.pages_visited.len());
    println!("  With posts: {}", stats.pages_productive);
    println!("  Empty: {}", stats.pages_empty);
    println!("  Failed: {}", stats.pages_failed);
    println!();

    println!("Posts:");
    println!("  Discovered: {}", stats.posts_discovered);
    println!("  Completed: {}", stats.posts_completed);
    println!("  Already done: {}", stats.posts_already_done);
    println!("  Failed: {}", stats.posts_failed);
    println!();

    println!("Files:");
    println!("  Saved: {}", stats.files_saved);
    println!("  Skipped (not PDF): {}", stats.files_skipped_non_pdf);
    println!("  Failed: {}", stats.files_failed);
    println!();

    println!("Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
}

/// Totals kept in the state database across runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStatistics {
    pub runs: u64,
    pub done_posts: u64,
    pub downloads: u64,
}

/// Loads cross-run totals from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<StoredStatistics, CrawlError> {
    Ok(StoredStatistics {
        runs: storage.count_runs()?,
        done_posts: storage.count_done_posts()?,
        downloads: storage.count_downloads()?,
    })
}
