//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    mode TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Posts whose detail page and attachments have been handled
CREATE TABLE IF NOT EXISTS done_posts (
    post_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    detail_url TEXT NOT NULL,
    notice_no TEXT,
    effective TEXT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    completed_at TEXT NOT NULL
);

-- Files written to the download directory
CREATE TABLE IF NOT EXISTS downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id TEXT NOT NULL,
    path TEXT NOT NULL,
    source_url TEXT NOT NULL,
    bytes INTEGER NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    downloaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_downloads_post ON downloads(post_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
