//! Download module for attachment files
//!
//! This module handles:
//! - Resolving safe filenames from server headers and link text
//! - Rejecting responses that are not PDFs
//! - Streaming PDFs to disk without overwriting existing files

mod filename;
mod manager;

pub use filename::{
    resolve_filename, resolve_pdf_filename, sanitize_filename, FilenameResolution,
    MAX_FILENAME_CHARS, PDF_EXT, PLACEHOLDER_STEM,
};
pub use manager::{DownloadManager, DownloadOutcome, DownloadedFile, CHUNK_SIZE};
