use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub board: BoardConfig,
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Describes the board being crawled and how its URLs look
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BoardConfig {
    /// Site root, used to resolve relative links
    pub base_url: String,

    /// Path of the listing endpoint (e.g. "/board.es")
    pub list_path: String,

    /// Menu identifier query parameter value
    pub mid: String,

    /// Board identifier query parameter value
    pub bid: String,

    /// Name of the query parameter carrying the page number
    pub page_param: String,

    /// Query parameters that carry a post id, in priority order
    pub id_params: Vec<String>,

    /// Substrings marking a link as a detail (view) link
    pub view_markers: Vec<String>,

    /// Links containing this marker are previews, never downloads
    pub preview_marker: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.mohw.go.kr".to_string(),
            list_path: "/board.es".to_string(),
            mid: "a10409020000".to_string(),
            bid: "0026".to_string(),
            page_param: "nPage".to_string(),
            id_params: vec!["list_no".to_string(), "bno".to_string()],
            view_markers: vec![
                "list_no=".to_string(),
                "bno=".to_string(),
                "act=view".to_string(),
            ],
            preview_marker: "attachpreview.es".to_string(),
        }
    }
}

/// Crawl pacing and termination
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Delay between list pages (milliseconds)
    pub list_delay_ms: u64,

    /// Delay before each detail page (milliseconds)
    pub view_delay_ms: u64,

    /// Delay before each file download (milliseconds)
    pub download_delay_ms: u64,

    /// Consecutive empty or failed pages that end a sweep
    pub max_empty_pages: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            list_delay_ms: 600,
            view_delay_ms: 600,
            download_delay_ms: 800,
            max_empty_pages: 2,
        }
    }
}

impl CrawlerConfig {
    pub fn list_delay(&self) -> Duration {
        Duration::from_millis(self.list_delay_ms)
    }

    pub fn view_delay(&self) -> Duration {
        Duration::from_millis(self.view_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

/// HTTP client and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Extra delay added for every further retry (milliseconds)
    pub retry_step_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            connect_timeout_secs: 10,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            retry_step_ms: 1000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "mohw-pdf-crawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Flat directory receiving downloaded PDFs
    pub download_dir: PathBuf,

    /// Directory receiving timestamped log files
    pub log_dir: PathBuf,

    /// Optional SQLite database remembering finished posts across runs
    pub state_db: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./mohw_pdfs"),
            log_dir: PathBuf::from("./logs"),
            state_db: None,
        }
    }
}
