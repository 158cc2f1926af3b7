//! Configuration module for the board crawler
//!
//! Every section has defaults targeting the MOHW notice board, so a
//! configuration file is optional. When one is given it is parsed as TOML
//! and validated before any network activity.
//!
//! # Example
//!
//! ```no_run
//! use board_pdf_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawling board {}", config.board.bid);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BoardConfig, Config, CrawlerConfig, HttpConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
