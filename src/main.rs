//! Board PDF Crawler main entry point
//!
//! This is the command-line interface for the notice-board PDF harvester.

use board_pdf_crawler::config::{load_config_with_hash, validate, Config};
use board_pdf_crawler::crawler::{crawl, PageCursor, PageList};
use board_pdf_crawler::output::{load_statistics, print_statistics};
use board_pdf_crawler::storage::open_storage;
use chrono::Local;
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Board PDF Crawler: a polite notice-board PDF harvester
///
/// Walks the board's list pages, follows every new post to its detail page
/// and saves the attached PDFs into one flat directory. Without `--pages`,
/// the crawl sweeps forward from `--start-page` until `--end-page` or until
/// the board stops returning posts.
#[derive(Parser, Debug)]
#[command(name = "board-pdf-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite notice-board PDF harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First list page of a sweep
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Last list page of a sweep (inclusive)
    #[arg(long)]
    end_page: Option<u32>,

    /// Explicit pages to visit, e.g. "1,3,5-7"; overrides start/end
    #[arg(long, value_name = "LIST")]
    pages: Option<PageList>,

    /// Directory receiving downloaded PDFs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// SQLite database remembering finished posts across runs
    #[arg(long, value_name = "PATH")]
    state_db: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show totals from the state database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, config_hash) = match &cli.config {
        Some(path) => load_config_with_hash(path)?,
        None => (Config::default(), "defaults".to_string()),
    };
    if let Some(dir) = &cli.output_dir {
        config.output.download_dir = dir.clone();
    }
    if let Some(path) = &cli.state_db {
        config.output.state_db = Some(path.clone());
    }
    validate(&config)?;

    let log_path = setup_logging(cli.verbose, cli.quiet, &config.output.log_dir)?;
    tracing::info!("Logging to {}", log_path.display());
    match &cli.config {
        Some(path) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            config_hash
        ),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let cursor = build_cursor(&cli);

    if cli.dry_run {
        handle_dry_run(&config, &cursor);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash, cursor).await?;
    }

    Ok(())
}

/// Turns the page arguments into a cursor
fn build_cursor(cli: &Cli) -> PageCursor {
    if let Some(pages) = &cli.pages {
        return pages.clone().into();
    }

    if let Some(end) = cli.end_page {
        if end < cli.start_page.max(1) {
            tracing::warn!(
                "--end-page {} is below --start-page {}; ignoring it",
                end,
                cli.start_page
            );
        }
    }

    PageCursor::sweep(cli.start_page, cli.end_page)
}

/// Sets up console and file logging based on verbosity level
///
/// Returns the path of the log file for this run.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("board_pdf_crawler=info,warn"),
            1 => EnvFilter::new("board_pdf_crawler=debug,info"),
            2 => EnvFilter::new("board_pdf_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!(
        "crawler_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let log_file = open_log_file(&log_path)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(log_path)
}

/// Opens the run's log file for appending, creating it if needed
fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, cursor: &PageCursor) {
    println!("=== Board PDF Crawler Dry Run ===\n");

    println!("Board:");
    println!("  List URL: {}{}", config.board.base_url, config.board.list_path);
    println!("  mid: {}, bid: {}", config.board.mid, config.board.bid);
    println!("  Page parameter: {}", config.board.page_param);
    println!("  Selection: {}", cursor);

    println!("\nPoliteness:");
    println!("  List delay: {}ms", config.crawler.list_delay_ms);
    println!("  View delay: {}ms", config.crawler.view_delay_ms);
    println!("  Download delay: {}ms", config.crawler.download_delay_ms);
    if !cursor.is_explicit() {
        println!(
            "  Stop after {} consecutive empty pages",
            config.crawler.max_empty_pages
        );
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.user_agent.header_value());
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Attempts per request: {}", config.http.max_attempts);

    println!("\nOutput:");
    println!("  Downloads: {}", config.output.download_dir.display());
    println!("  Logs: {}", config.output.log_dir.display());
    match &config.output.state_db {
        Some(path) => println!("  State database: {}", path.display()),
        None => println!("  State database: (none)"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows totals from the state database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &config.output.state_db else {
        return Err("--stats needs a state database (--state-db or output.state-db)".into());
    };

    println!("Database: {}\n", path.display());

    let storage = open_storage(path)?;
    let stats = load_statistics(&storage)?;

    println!("Runs: {}", stats.runs);
    println!("Completed posts: {}", stats.done_posts);
    println!("Saved files: {}", stats.downloads);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    cursor: PageCursor,
) -> Result<(), Box<dyn std::error::Error>> {
    match crawl(config, config_hash, cursor).await {
        Ok(stats) => {
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crawler_20240101_000000.log");

        writeln!(open_log_file(&path).unwrap(), "first run").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second run").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }
}
