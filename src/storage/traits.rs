//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{NoticeMeta, Post};
use crate::download::DownloadedFile;
use crate::storage::{DonePostRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The coordinator only talks to storage through this trait, and treats
/// every error as non-fatal.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `mode` - Human-readable page selection
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Done Posts =====

    /// Loads every post id recorded as done, in completion order
    fn load_done_ids(&self) -> StorageResult<Vec<String>>;

    /// Records a post as done
    ///
    /// Marking the same post twice keeps the first record.
    fn mark_post_done(&mut self, run_id: i64, post: &Post, meta: &NoticeMeta) -> StorageResult<()>;

    fn get_done_post(&self, post_id: &str) -> StorageResult<Option<DonePostRecord>>;

    fn count_done_posts(&self) -> StorageResult<u64>;

    // ===== Downloads =====

    /// Records a file saved for a post
    fn record_download(
        &mut self,
        run_id: i64,
        post_id: &str,
        file: &DownloadedFile,
    ) -> StorageResult<()>;

    fn count_downloads(&self) -> StorageResult<u64>;
}
