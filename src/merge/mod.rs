//! Merge module for combining downloaded PDFs
//!
//! This module handles:
//! - Finding every PDF under a directory tree, in a stable order
//! - Appending the pages of each readable PDF to one output document
//! - Reporting files that could not be read or parsed

mod writer;

pub use writer::{LopdfPageWriter, PageWriter};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while merging
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Input directory does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("No PDF files found under {}", .0.display())]
    NoPdfs(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Input files whose pages made it into the output
    pub merged: usize,

    /// Total pages written
    pub pages: u32,

    /// Files left out, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Recursively lists PDF files under `root`
///
/// Matches regular files with a case-insensitive `.pdf` extension. The result
/// is sorted by lowercase path string and holds each path once.
pub fn collect_pdfs(root: &Path) -> Result<Vec<PathBuf>, MergeError> {
    if !root.is_dir() {
        return Err(MergeError::InputMissing(root.to_path_buf()));
    }

    // Keyed by lowercase path; ties broken by the path itself.
    let mut found: BTreeSet<(String, PathBuf)> = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && has_pdf_extension(&path) {
                let key = path.to_string_lossy().to_lowercase();
                found.insert((key, path));
            }
        }
    }

    if found.is_empty() {
        return Err(MergeError::NoPdfs(root.to_path_buf()));
    }

    Ok(found.into_iter().map(|(_, path)| path).collect())
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Appends every page of every readable input, in order, and writes `output`
///
/// A file that cannot be read or parsed is recorded in the report and the
/// merge continues with the next one. Parent directories of `output` are
/// created as needed.
///
/// # Returns
///
/// * `Ok(MergeReport)` - Output written
/// * `Err(MergeError)` - No input was usable, or writing failed
pub fn merge_pdfs(
    inputs: &[PathBuf],
    output: &Path,
    writer: &mut dyn PageWriter,
) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();

    for path in inputs {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read PDF: {}", e);
                report.skipped.push((path.clone(), e.to_string()));
                continue;
            }
        };

        match writer.append(&bytes) {
            Ok(pages) => {
                tracing::debug!(path = %path.display(), pages, "Appended PDF");
                report.merged += 1;
                report.pages += pages;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping unreadable PDF: {}", e);
                report.skipped.push((path.clone(), e.to_string()));
            }
        }
    }

    if report.merged == 0 {
        return Err(MergeError::Pdf("none of the input files could be merged".to_string()));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    writer.write(output)?;

    Ok(report)
}
