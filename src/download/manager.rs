//! Streaming PDF downloads into a flat directory
//!
//! The filename is settled before anything touches the disk, the target path
//! is claimed atomically, and the body is copied chunk by chunk.

use crate::crawler::HttpFetcher;
use crate::download::filename::{
    resolve_pdf_filename, FilenameResolution, MAX_COLLISION_SUFFIX, PDF_EXT,
};
use crate::CrawlError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Size of the write buffer between the network and the file
pub const CHUNK_SIZE: usize = 8192;

/// A file written by the download manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub source_url: Url,
    pub bytes: u64,
}

/// Result of a download attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(DownloadedFile),

    /// Response was not a PDF; nothing was written
    SkippedNonPdf {
        filename: String,
        content_type: String,
    },
}

/// Downloads attachments into one flat directory
#[derive(Debug, Clone)]
pub struct DownloadManager {
    fetcher: HttpFetcher,
    target_dir: PathBuf,
}

impl DownloadManager {
    pub fn new(fetcher: HttpFetcher, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            target_dir: target_dir.into(),
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Fetches `url` and saves it as a PDF under the target directory
    ///
    /// # Arguments
    ///
    /// * `url` - The attachment URL
    /// * `fallback_name` - Name to use when the server offers none
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadOutcome::Saved)` - File written to a path no other file had
    /// * `Ok(DownloadOutcome::SkippedNonPdf)` - Not a PDF, no file created
    /// * `Err(CrawlError)` - Fetch failed after retries, or writing failed
    pub async fn download(&self, url: &Url, fallback_name: &str) -> Result<DownloadOutcome, CrawlError> {
        let mut response = self.fetcher.get(url.as_str(), &[]).await?;

        let filename = match resolve_pdf_filename(response.headers(), fallback_name) {
            FilenameResolution::Pdf(name) => name,
            FilenameResolution::NotPdf {
                filename,
                content_type,
            } => {
                return Ok(DownloadOutcome::SkippedNonPdf {
                    filename,
                    content_type,
                })
            }
        };

        tokio::fs::create_dir_all(&self.target_dir).await?;
        let (path, file) = claim_path(&self.target_dir, &filename).await?;

        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut bytes: u64 = 0;

        let copied: Result<(), CrawlError> = async {
            while let Some(chunk) = response.chunk().await.map_err(|source| CrawlError::Http {
                url: url.to_string(),
                source,
            })? {
                writer.write_all(&chunk).await?;
                bytes += chunk.len() as u64;
            }
            writer.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = copied {
            drop(writer);
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), "Failed to remove partial file: {}", remove_err);
            }
            return Err(e);
        }

        Ok(DownloadOutcome::Saved(DownloadedFile {
            path,
            source_url: url.clone(),
            bytes,
        }))
    }
}

/// Creates the first free path for `filename` in `dir`
///
/// `name.pdf`, then `name_1.pdf`, `name_2.pdf`, and so on. The existence
/// check and the creation are one filesystem operation, so two downloads can
/// never end up sharing a path.
async fn claim_path(dir: &Path, filename: &str) -> Result<(PathBuf, File), CrawlError> {
    for candidate in candidates(dir, filename) {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(CrawlError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free filename for {} in {}", filename, dir.display()),
    )))
}

/// `filename`, then `{stem}_{n}.pdf` for n = 1, 2, ...
fn candidates<'a>(dir: &'a Path, filename: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    std::iter::once(dir.join(filename)).chain(
        (1..=MAX_COLLISION_SUFFIX).map(move |n| dir.join(format!("{}_{}.{}", stem, n, PDF_EXT))),
    )
}
