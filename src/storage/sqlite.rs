//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{NoticeMeta, Post};
use crate::download::DownloadedFile;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{DonePostRecord, RunRecord, RunStatus};
use crate::CrawlError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        mode: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Interrupted),
    })
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, mode, status";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, mode, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, mode, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    // ===== Done Posts =====

    fn load_done_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT post_id FROM done_posts ORDER BY rowid")?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    fn mark_post_done(&mut self, run_id: i64, post: &Post, meta: &NoticeMeta) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO done_posts
             (post_id, title, detail_url, notice_no, effective, run_id, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.post_id,
                post.title,
                post.detail_url.as_str(),
                meta.notice_no,
                meta.effective,
                run_id,
                now
            ],
        )?;
        Ok(())
    }

    fn get_done_post(&self, post_id: &str) -> StorageResult<Option<DonePostRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT post_id, title, detail_url, notice_no, effective, run_id, completed_at
                 FROM done_posts WHERE post_id = ?1",
                params![post_id],
                |row| {
                    Ok(DonePostRecord {
                        post_id: row.get(0)?,
                        title: row.get(1)?,
                        detail_url: row.get(2)?,
                        notice_no: row.get(3)?,
                        effective: row.get(4)?,
                        run_id: row.get(5)?,
                        completed_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn count_done_posts(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM done_posts")
    }

    // ===== Downloads =====

    fn record_download(
        &mut self,
        run_id: i64,
        post_id: &str,
        file: &DownloadedFile,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO downloads (post_id, path, source_url, bytes, run_id, downloaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post_id,
                file.path.to_string_lossy().into_owned(),
                file.source_url.as_str(),
                file.bytes as i64,
                run_id,
                now
            ],
        )?;
        Ok(())
    }

    fn count_downloads(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM downloads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn post(id: &str) -> Post {
        Post {
            post_id: id.to_string(),
            title: format!("공고 {}", id),
            detail_url: Url::parse(&format!(
                "https://www.mohw.go.kr/board.es?mid=a10409020000&bid=0026&act=view&list_no={}",
                id
            ))
            .unwrap(),
        }
    }

    fn meta(notice_no: Option<&str>) -> NoticeMeta {
        NoticeMeta {
            title_in_list: "title".to_string(),
            notice_no: notice_no.map(str::to_string),
            effective: None,
        }
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", "sweep 1..").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.mode, "sweep 1..");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", "pages [1]").unwrap();
        storage.complete_run(run_id).unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(storage.get_run(42), Err(StorageError::RunNotFound(42))));
        assert!(matches!(
            storage.update_run_status(42, RunStatus::Interrupted),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_done_posts_roundtrip_in_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h", "sweep 1..").unwrap();

        storage.mark_post_done(run_id, &post("300"), &meta(Some("2024-101"))).unwrap();
        storage.mark_post_done(run_id, &post("100"), &meta(None)).unwrap();
        storage.mark_post_done(run_id, &post("300"), &meta(None)).unwrap();

        assert_eq!(storage.load_done_ids().unwrap(), vec!["300", "100"]);
        assert_eq!(storage.count_done_posts().unwrap(), 2);

        let record = storage.get_done_post("300").unwrap().unwrap();
        assert_eq!(record.notice_no.as_deref(), Some("2024-101"));
        assert_eq!(record.run_id, run_id);
    }

    #[test]
    fn test_record_download() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h", "sweep 1..").unwrap();

        let file = DownloadedFile {
            path: PathBuf::from("mohw_pdfs/공고.pdf"),
            source_url: Url::parse("https://www.mohw.go.kr/download.es?fid=1").unwrap(),
            bytes: 1024,
        };
        storage.record_download(run_id, "100", &file).unwrap();
        storage.record_download(run_id, "100", &file).unwrap();

        assert_eq!(storage.count_downloads().unwrap(), 2);
        assert_eq!(storage.count_runs().unwrap(), 1);
    }

    #[test]
    fn test_reopen_keeps_done_posts() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state").join("crawl.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            let run_id = storage.create_run("h", "sweep 1..").unwrap();
            storage.mark_post_done(run_id, &post("7"), &meta(None)).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.load_done_ids().unwrap(), vec!["7"]);
    }
}
