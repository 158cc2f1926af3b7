//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Walking list pages in explicit or sweep mode
//! - Following each new post to its detail page
//! - Downloading attachments with politeness delays in between
//! - Keeping the done set and the optional state database current
//!
//! Failures are scoped to the smallest unit they affect: a failed file does
//! not fail its post, and a failed post does not fail its page.

use crate::config::Config;
use crate::crawler::parser::{BoardExtractor, DetailExtractor, ListExtractor, Post};
use crate::crawler::{HttpFetcher, PageCursor};
use crate::download::{DownloadManager, DownloadOutcome};
use crate::output::CrawlStats;
use crate::state::{DoneSet, PageOutcome, PostOutcome};
use crate::storage::{open_storage, RunStatus, Storage};
use crate::CrawlError;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    fetcher: HttpFetcher,
    list_extractor: Box<dyn ListExtractor>,
    detail_extractor: Box<dyn DetailExtractor>,
    downloads: DownloadManager,
    list_url: Url,
    done: DoneSet,
    storage: Option<Box<dyn Storage>>,
    config_hash: String,
    run_id: Option<i64>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `done` - Post ids to treat as already processed
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Invalid configuration or HTTP client setup failed
    pub fn new(config: Config, done: DoneSet) -> Result<Self, CrawlError> {
        crate::config::validate(&config)?;

        let fetcher = HttpFetcher::from_config(&config.user_agent, &config.http)?;
        let extractor = BoardExtractor::new(&config.board)?;
        let list_url = Url::parse(&config.board.base_url)?.join(&config.board.list_path)?;
        let downloads = DownloadManager::new(fetcher.clone(), config.output.download_dir.clone());

        Ok(Self {
            config,
            fetcher,
            list_extractor: Box::new(extractor.clone()),
            detail_extractor: Box::new(extractor),
            downloads,
            list_url,
            done,
            storage: None,
            config_hash: String::new(),
            run_id: None,
        })
    }

    /// Replaces the markup extractors
    pub fn with_extractors(
        mut self,
        list: impl ListExtractor + 'static,
        detail: impl DetailExtractor + 'static,
    ) -> Self {
        self.list_extractor = Box::new(list);
        self.detail_extractor = Box::new(detail);
        self
    }

    /// Attaches a state database
    ///
    /// Posts recorded as done by earlier runs are merged into the done set,
    /// and a run left in the running state is marked interrupted.
    pub fn with_storage(mut self, mut storage: Box<dyn Storage>, config_hash: &str) -> Self {
        match storage.get_latest_run() {
            Ok(Some(run)) if run.status == RunStatus::Running => {
                tracing::warn!("Previous run {} did not finish; marking it interrupted", run.id);
                if let Err(e) = storage.update_run_status(run.id, RunStatus::Interrupted) {
                    tracing::warn!("Failed to update run {}: {}", run.id, e);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to read previous runs: {}", e),
        }

        match storage.load_done_ids() {
            Ok(ids) => {
                let before = self.done.len();
                self.done.extend(ids);
                tracing::info!(
                    "Loaded {} previously completed posts from state database",
                    self.done.len() - before
                );
            }
            Err(e) => tracing::warn!("Failed to load completed posts: {}", e),
        }

        self.storage = Some(storage);
        self.config_hash = config_hash.to_string();
        self
    }

    pub fn done(&self) -> &DoneSet {
        &self.done
    }

    /// Runs the crawl over the pages selected by `cursor`
    ///
    /// Never fails: network and storage errors are logged and counted in the
    /// returned statistics.
    pub async fn run(&mut self, cursor: PageCursor) -> CrawlStats {
        tracing::info!(
            "Starting crawl of {} ({}), saving to {}",
            self.list_url,
            cursor,
            self.downloads.target_dir().display()
        );

        let start_time = Instant::now();
        let mut stats = CrawlStats::default();

        self.begin_run(&cursor);

        match cursor {
            PageCursor::Explicit(pages) => self.run_explicit(&pages, &mut stats).await,
            PageCursor::Sweep { start, end } => self.run_sweep(start, end, &mut stats).await,
        }

        self.finish_run();

        stats.elapsed = start_time.elapsed();
        stats.log_summary();
        stats
    }

    /// Visits every page in `pages` once, ascending, with no early stop
    async fn run_explicit(&mut self, pages: &BTreeSet<u32>, stats: &mut CrawlStats) {
        let total = pages.len();

        for (index, &page) in pages.iter().enumerate() {
            if index > 0 {
                self.pause(self.config.crawler.list_delay()).await;
            }

            let outcome = self.process_page(page, stats).await;
            tracing::info!(page, outcome = %outcome, "Progress: {}/{} pages processed", index + 1, total);
        }
    }

    /// Walks forward from `start` until `end` is passed or too many pages in
    /// a row come back empty or failed
    async fn run_sweep(&mut self, start: u32, end: Option<u32>, stats: &mut CrawlStats) {
        let threshold = self.config.crawler.max_empty_pages.max(1);
        let mut empty_streak: u32 = 0;
        let first = start.max(1);
        let mut page = first;

        loop {
            if let Some(end) = end {
                if page > end {
                    tracing::info!("Reached end page {}", end);
                    break;
                }
            }

            if page > first {
                self.pause(self.config.crawler.list_delay()).await;
            }

            let outcome = self.process_page(page, stats).await;

            if outcome.is_productive() {
                empty_streak = 0;
                tracing::info!(page, "Page complete");
            } else {
                empty_streak += 1;
                tracing::info!(
                    page,
                    outcome = %outcome,
                    "Page yielded no posts ({}/{} consecutive)",
                    empty_streak,
                    threshold
                );
                if empty_streak >= threshold {
                    tracing::info!(
                        "Stopping after {} consecutive empty or failed pages",
                        empty_streak
                    );
                    break;
                }
            }

            page = match page.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
    }

    /// Fetches one list page and processes every post on it
    async fn process_page(&mut self, page: u32, stats: &mut CrawlStats) -> PageOutcome {
        let fetched = {
            let board = &self.config.board;
            let params = [
                ("mid", board.mid.clone()),
                ("bid", board.bid.clone()),
                (board.page_param.as_str(), page.to_string()),
            ];
            self.fetcher.get_text(self.list_url.as_str(), &params).await
        };

        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(page, "Failed to fetch list page: {}", e);
                stats.record_page(page, PageOutcome::Failed);
                return PageOutcome::Failed;
            }
        };

        let posts = self.list_extractor.extract_posts(&html);
        if posts.is_empty() {
            stats.record_page(page, PageOutcome::Empty);
            return PageOutcome::Empty;
        }

        tracing::debug!(page, "Found {} posts", posts.len());
        let outcome = PageOutcome::Productive { posts: posts.len() };
        stats.record_page(page, outcome);

        for post in &posts {
            let post_outcome = self.process_post(post).await;
            stats.record_post(post_outcome);
        }

        outcome
    }

    /// Fetches a post's detail page and downloads its PDF attachments
    ///
    /// The post enters the done set only after every link was attempted.
    async fn process_post(&mut self, post: &Post) -> PostOutcome {
        if self.done.contains(&post.post_id) {
            tracing::debug!(post_id = %post.post_id, "Already processed, skipping");
            return PostOutcome::AlreadyDone;
        }

        self.pause(self.config.crawler.view_delay()).await;

        let html = match self.fetcher.get_text(post.detail_url.as_str(), &[]).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    post_id = %post.post_id,
                    url = %post.detail_url,
                    "Failed to fetch detail page: {}",
                    e
                );
                return PostOutcome::Failed;
            }
        };

        let meta = self.detail_extractor.extract_meta(&post.title, &html);
        tracing::info!(
            post_id = %post.post_id,
            notice_no = meta.notice_no.as_deref().unwrap_or("-"),
            effective = meta.effective.as_deref().unwrap_or("-"),
            "{}",
            post.title
        );

        let files = self.detail_extractor.extract_files(&html);
        if files.is_empty() {
            tracing::info!(post_id = %post.post_id, "No PDF attachments");
        }

        let (mut saved, mut skipped, mut failed) = (0, 0, 0);

        for file in &files {
            self.pause(self.config.crawler.download_delay()).await;

            match self.downloads.download(&file.url, &file.display_name).await {
                Ok(DownloadOutcome::Saved(downloaded)) => {
                    saved += 1;
                    tracing::info!(
                        post_id = %post.post_id,
                        path = %downloaded.path.display(),
                        "Saved PDF ({} bytes)",
                        downloaded.bytes
                    );
                    if let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id) {
                        if let Err(e) = storage.record_download(run_id, &post.post_id, &downloaded)
                        {
                            tracing::warn!(post_id = %post.post_id, "Failed to record download: {}", e);
                        }
                    }
                }
                Ok(DownloadOutcome::SkippedNonPdf {
                    filename,
                    content_type,
                }) => {
                    skipped += 1;
                    tracing::info!(
                        post_id = %post.post_id,
                        url = %file.url,
                        "Skipping non-PDF download {} ({})",
                        filename,
                        content_type
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        post_id = %post.post_id,
                        url = %file.url,
                        "Failed to download {}: {}",
                        file.display_name,
                        e
                    );
                }
            }
        }

        self.done.mark_done(post.post_id.clone());
        if let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id) {
            if let Err(e) = storage.mark_post_done(run_id, post, &meta) {
                tracing::warn!(post_id = %post.post_id, "Failed to persist completed post: {}", e);
            }
        }

        PostOutcome::Completed {
            saved,
            skipped,
            failed,
        }
    }

    fn begin_run(&mut self, cursor: &PageCursor) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        match storage.create_run(&self.config_hash, &cursor.to_string()) {
            Ok(run_id) => {
                tracing::info!("Recording progress as run {}", run_id);
                self.run_id = Some(run_id);
            }
            Err(e) => tracing::warn!("Failed to create run record: {}", e),
        }
    }

    fn finish_run(&mut self) {
        if let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id.take()) {
            if let Err(e) = storage.complete_run(run_id) {
                tracing::warn!("Failed to complete run {}: {}", run_id, e);
            }
        }
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Runs a complete crawl from configuration
///
/// Opens the state database when `output.state-db` is set, then runs a
/// coordinator over `cursor`.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `cursor` - Pages to visit
///
/// # Returns
///
/// * `Ok(CrawlStats)` - The crawl ran; individual failures are in the stats
/// * `Err(CrawlError)` - Setup failed before any page was requested
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    cursor: PageCursor,
) -> Result<CrawlStats, CrawlError> {
    let state_db = config.output.state_db.clone();
    let mut coordinator = Coordinator::new(config, DoneSet::new())?;

    if let Some(path) = state_db {
        tracing::info!("Using state database {}", path.display());
        let storage = open_storage(&path)?;
        coordinator = coordinator.with_storage(Box::new(storage), config_hash);
    }

    Ok(coordinator.run(cursor).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FileLink, NoticeMeta};

    struct NoPosts;

    impl ListExtractor for NoPosts {
        fn extract_posts(&self, _html: &str) -> Vec<Post> {
            Vec::new()
        }
    }

    struct NoFiles;

    impl DetailExtractor for NoFiles {
        fn extract_files(&self, _html: &str) -> Vec<FileLink> {
            Vec::new()
        }

        fn extract_meta(&self, title: &str, _html: &str) -> NoticeMeta {
            NoticeMeta {
                title_in_list: title.to_string(),
                notice_no: None,
                effective: None,
            }
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.board.base_url = "ftp://example.com".to_string();
        assert!(Coordinator::new(config, DoneSet::new()).is_err());
    }

    #[test]
    fn test_new_keeps_done_set() {
        let done: DoneSet = ["1", "2"].into_iter().map(String::from).collect();
        let coordinator = Coordinator::new(Config::default(), done).unwrap();
        assert_eq!(coordinator.done().len(), 2);
        assert!(coordinator.done().contains("1"));
    }

    #[test]
    fn test_list_url_joins_path() {
        let coordinator = Coordinator::new(Config::default(), DoneSet::new()).unwrap();
        assert_eq!(coordinator.list_url.as_str(), "https://www.mohw.go.kr/board.es");
    }

    #[test]
    fn test_custom_extractors_accepted() {
        let coordinator = Coordinator::new(Config::default(), DoneSet::new())
            .unwrap()
            .with_extractors(NoPosts, NoFiles);
        assert!(coordinator.list_extractor.extract_posts("<a>").is_empty());
        assert!(coordinator.detail_extractor.extract_files("<a>").is_empty());
    }

    #[tokio::test]
    async fn test_explicit_run_with_no_pages() {
        let mut coordinator = Coordinator::new(Config::default(), DoneSet::new()).unwrap();
        let stats = coordinator.run(PageCursor::Explicit(BTreeSet::new())).await;
        assert!(stats.pages_visited.is_empty());
    }
}
