//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the notice board and test
//! the full list → detail → download cycle end-to-end.

use board_pdf_crawler::config::{Config, CrawlerConfig};
use board_pdf_crawler::crawler::{crawl, parse_page_list, Coordinator, PageCursor};
use board_pdf_crawler::storage::{SqliteStorage, Storage};
use board_pdf_crawler::DoneSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration pointing at the mock server, with every delay removed
fn test_config(server: &MockServer, download_dir: &Path) -> Config {
    let mut config = Config::default();
    config.board.base_url = server.uri();
    config.crawler = CrawlerConfig {
        list_delay_ms: 0,
        view_delay_ms: 0,
        download_delay_ms: 0,
        max_empty_pages: 2,
    };
    config.http.max_attempts = 2;
    config.http.retry_base_delay_ms = 0;
    config.http.retry_step_ms = 0;
    config.output.download_dir = download_dir.to_path_buf();
    config
}

fn list_page(ids: &[u32]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<tr><td class="title"><a href="/board.es?mid=a10409020000&amp;bid=0026&amp;act=view&amp;list_no={}">
                    공고 {}
                </a></td></tr>"#,
                id, id
            )
        })
        .collect();
    format!(
        r#"<html><body><table>{}</table>
        <div class="paging"><a href="/board.es?mid=a10409020000&amp;bid=0026&amp;nPage=2">2</a></div>
        </body></html>"#,
        rows
    )
}

/// Detail page with `(href, text)` attachment anchors
fn detail_page(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<li><a href="{}">{}</a></li>"#, href, text))
        .collect();
    format!(
        r#"<html><body><div class="view">보건복지부 고시 제2024-101호 (시행: 2024.03.01)</div>
        <ul class="file">{}</ul></body></html>"#,
        anchors
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn pdf(filename: &str, body: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(
            "content-disposition",
            format!("attachment; filename=\"{}\"", filename).as_str(),
        )
        .set_body_raw(body.to_vec(), "application/pdf")
}

async fn mount_list(server: &MockServer, page: u32, ids: &[u32], expected: u64) {
    Mock::given(method("GET"))
        .and(path("/board.es"))
        .and(query_param("mid", "a10409020000"))
        .and(query_param("bid", "0026"))
        .and(query_param("nPage", page.to_string()))
        .respond_with(html(list_page(ids)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/board.es"))
        .and(query_param("list_no", id.to_string()))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sweep_stops_after_two_empty_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_list(&server, 2, &[], 1).await;
    mount_list(&server, 3, &[], 1).await;
    mount_list(&server, 4, &[102], 0).await;
    mount_detail(&server, 101, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::sweep(1, None)).await;

    assert_eq!(stats.pages_visited, vec![1, 2, 3]);
    assert_eq!(stats.pages_productive, 1);
    assert_eq!(stats.pages_empty, 2);
    assert_eq!(stats.posts_completed, 1);
    assert!(coordinator.done().contains("101"));
}

#[tokio::test]
async fn test_sweep_single_empty_page_does_not_stop() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_list(&server, 2, &[], 1).await;
    mount_list(&server, 3, &[102], 1).await;
    mount_list(&server, 4, &[], 1).await;
    mount_list(&server, 5, &[], 1).await;
    mount_detail(&server, 101, detail_page(&[]), 1).await;
    mount_detail(&server, 102, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::sweep(1, None)).await;

    assert_eq!(stats.pages_visited, vec![1, 2, 3, 4, 5]);
    assert_eq!(stats.posts_completed, 2);
}

#[tokio::test]
async fn test_sweep_respects_end_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_list(&server, 2, &[102], 1).await;
    mount_list(&server, 3, &[103], 0).await;
    mount_detail(&server, 101, detail_page(&[]), 1).await;
    mount_detail(&server, 102, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::sweep(1, Some(2))).await;

    assert_eq!(stats.pages_visited, vec![1, 2]);
    assert_eq!(coordinator.done().len(), 2);
}

#[tokio::test]
async fn test_explicit_pages_ignore_empty_heuristic() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for page in [1, 3, 5, 6, 7] {
        mount_list(&server, page, &[], 1).await;
    }
    mount_list(&server, 2, &[], 0).await;
    mount_list(&server, 4, &[], 0).await;
    mount_list(&server, 8, &[], 0).await;

    let pages = parse_page_list("7,1,3,5-7").unwrap();
    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::Explicit(pages)).await;

    assert_eq!(stats.pages_visited, vec![1, 3, 5, 6, 7]);
    assert_eq!(stats.pages_empty, 5);
}

#[tokio::test]
async fn test_post_seen_twice_is_processed_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_list(&server, 2, &[101, 102], 1).await;
    mount_list(&server, 3, &[], 1).await;
    mount_list(&server, 4, &[], 1).await;
    mount_detail(&server, 101, detail_page(&[]), 1).await;
    mount_detail(&server, 102, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::sweep(1, None)).await;

    assert_eq!(stats.posts_discovered, 3);
    assert_eq!(stats.posts_completed, 2);
    assert_eq!(stats.posts_already_done, 1);
}

#[tokio::test]
async fn test_prepopulated_done_set_skips_post() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101, 102], 1).await;
    mount_detail(&server, 101, detail_page(&[]), 0).await;
    mount_detail(&server, 102, detail_page(&[]), 1).await;

    let done: DoneSet = ["101"].into_iter().collect();
    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, done).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.posts_already_done, 1);
    assert_eq!(stats.posts_completed, 1);
    assert!(coordinator.done().contains("102"));
}

#[tokio::test]
async fn test_colliding_filenames_get_suffix() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_detail(
        &server,
        101,
        detail_page(&[
            ("/download.es?fid=1", "공고문.pdf"),
            ("/download.es?fid=2", "별표.pdf"),
            ("/attachpreview.es?fid=1", "공고문.pdf 미리보기"),
        ]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "1"))
        .respond_with(pdf("notice.pdf", b"%PDF-1.4 first"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "2"))
        .respond_with(pdf("notice.pdf", b"%PDF-1.4 second"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/attachpreview.es"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let downloads = dir.path().join("pdfs");
    let config = test_config(&server, &downloads);
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.files_saved, 2);
    assert_eq!(
        std::fs::read(downloads.join("notice.pdf")).unwrap(),
        b"%PDF-1.4 first"
    );
    assert_eq!(
        std::fs::read(downloads.join("notice_1.pdf")).unwrap(),
        b"%PDF-1.4 second"
    );
}

#[tokio::test]
async fn test_non_pdf_download_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_detail(
        &server,
        101,
        detail_page(&[("/download.es?fid=9&name=guide.pdf", "안내문")]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "9"))
        .respond_with(html("<html><body>login required</body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let downloads = dir.path().join("pdfs");
    let config = test_config(&server, &downloads);
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.files_saved, 0);
    assert_eq!(stats.files_skipped_non_pdf, 1);
    assert_eq!(stats.posts_completed, 1);
    assert!(!downloads.exists() || std::fs::read_dir(&downloads).unwrap().next().is_none());
}

#[tokio::test]
async fn test_failed_download_does_not_fail_post() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101], 1).await;
    mount_detail(
        &server,
        101,
        detail_page(&[
            ("/download.es?fid=1", "missing.pdf"),
            ("/download.es?fid=2", "present.pdf"),
        ]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "2"))
        .respond_with(pdf("present.pdf", b"%PDF-1.4"))
        .expect(1)
        .mount(&server)
        .await;

    let downloads = dir.path().join("pdfs");
    let config = test_config(&server, &downloads);
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_saved, 1);
    assert!(downloads.join("present.pdf").exists());
    assert!(coordinator.done().contains("101"));
}

#[tokio::test]
async fn test_failed_detail_page_is_not_marked_done() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list(&server, 1, &[101, 102], 1).await;
    Mock::given(method("GET"))
        .and(path("/board.es"))
        .and(query_param("list_no", "101"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_detail(&server, 102, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.posts_failed, 1);
    assert_eq!(stats.posts_completed, 1);
    assert!(!coordinator.done().contains("101"));
    assert!(coordinator.done().contains("102"));
}

#[tokio::test]
async fn test_list_page_retried_after_server_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/board.es"))
        .and(query_param("nPage", "1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_list(&server, 1, &[101], 1).await;
    mount_detail(&server, 101, detail_page(&[]), 1).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::explicit([1])).await;

    assert_eq!(stats.pages_productive, 1);
    assert_eq!(stats.pages_failed, 0);
}

#[tokio::test]
async fn test_failed_list_page_counts_toward_stop() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/board.es"))
        .and(query_param("nPage", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_list(&server, 2, &[], 1).await;
    mount_list(&server, 3, &[103], 0).await;

    let config = test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, DoneSet::new()).unwrap();
    let stats = coordinator.run(PageCursor::sweep(1, None)).await;

    assert_eq!(stats.pages_visited, vec![1, 2]);
    assert_eq!(stats.pages_failed, 1);
    assert_eq!(stats.pages_empty, 1);
}

#[tokio::test]
async fn test_state_database_resumes_across_runs() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("state.db");

    mount_list(&server, 1, &[101], 2).await;
    mount_detail(
        &server,
        101,
        detail_page(&[("/download.es?fid=1", "공고문.pdf")]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/download.es"))
        .and(query_param("fid", "1"))
        .respond_with(pdf("notice.pdf", b"%PDF-1.4"))
        .expect(1)
        .mount(&server)
        .await;

    let downloads = dir.path().join("pdfs");

    {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let config = test_config(&server, &downloads);
        let mut coordinator = Coordinator::new(config, DoneSet::new())
            .unwrap()
            .with_storage(Box::new(storage), "first");
        let stats = coordinator.run(PageCursor::explicit([1])).await;
        assert_eq!(stats.posts_completed, 1);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_done_posts().unwrap(), 1);
    assert_eq!(storage.count_downloads().unwrap(), 1);

    let record = storage.get_done_post("101").unwrap().unwrap();
    assert_eq!(record.title, "공고 101");
    assert_eq!(record.notice_no.as_deref(), Some("2024-101"));
    assert_eq!(record.effective.as_deref(), Some("2024.03.01"));

    let config = test_config(&server, &downloads);
    let mut coordinator = Coordinator::new(config, DoneSet::new())
        .unwrap()
        .with_storage(Box::new(storage), "second");
    assert!(coordinator.done().contains("101"));

    let stats = coordinator.run(PageCursor::explicit([1])).await;
    assert_eq!(stats.posts_already_done, 1);
    assert_eq!(stats.posts_completed, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_runs().unwrap(), 2);
    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.config_hash, "second");
    assert_eq!(latest.mode, "pages [1]");
}

#[tokio::test]
async fn test_crawl_entry_point_opens_configured_database() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("state.db");

    mount_list(&server, 1, &[], 1).await;
    mount_list(&server, 2, &[], 1).await;

    let mut config = test_config(&server, &dir.path().join("pdfs"));
    config.output.state_db = Some(db_path.clone());

    let stats = crawl(config, "hash", PageCursor::sweep(1, None)).await.unwrap();
    assert_eq!(stats.pages_visited, vec![1, 2]);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.mode, "sweep 1..");
    assert!(run.finished_at.is_some());
}
