//! Filename resolution for downloaded attachments
//!
//! Board servers describe attachments through `Content-Disposition`, often
//! with percent-encoded Korean names. This module picks the best name on
//! offer, strips anything unsafe, and insists on a `.pdf` extension.

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use std::path::Path;
use std::sync::LazyLock;

/// Extension every saved file carries
pub const PDF_EXT: &str = "pdf";

/// Stem used when sanitizing leaves nothing behind
pub const PLACEHOLDER_STEM: &str = "document";

/// Longest sanitized filename, in characters
pub const MAX_FILENAME_CHARS: usize = 200;

/// Upper bound on collision suffixes tried for one filename
pub const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Longest file name most filesystems accept, in bytes
const MAX_NAME_BYTES: usize = 255;

/// Byte budget for a stem so that `{stem}_{MAX_COLLISION_SUFFIX}.pdf` still fits
const MAX_STEM_BYTES: usize = MAX_NAME_BYTES - "_10000.pdf".len();

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.\s가-힣()_\[\]]+").unwrap());

/// Outcome of resolving an attachment's filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameResolution {
    /// Safe filename ending in `.pdf`
    Pdf(String),

    /// Neither the name nor the content type says PDF; do not save it
    NotPdf {
        filename: String,
        content_type: String,
    },
}

/// Picks the raw filename from `Content-Disposition`, else `fallback`
///
/// `filename*` (RFC 5987, `charset'lang'value`) wins over `filename`; both are
/// percent-decoded. Header bytes are read as UTF-8, lossily, since some
/// servers send raw non-ASCII names.
pub fn resolve_filename(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| filename_from_disposition(&String::from_utf8_lossy(value.as_bytes())))
        .unwrap_or_else(|| fallback.to_string())
}

/// Parses the filename parameters of a `Content-Disposition` value
fn filename_from_disposition(disposition: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in disposition.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"');

        match key.as_str() {
            "filename*" if extended.is_none() => {
                // charset'lang'value; lang may be empty
                let mut fields = value.splitn(3, '\'');
                let encoded = match (fields.next(), fields.next(), fields.next()) {
                    (Some(_), Some(_), Some(encoded)) => encoded,
                    _ => value,
                };
                extended = Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
            }
            "filename" if plain.is_none() => {
                plain = Some(percent_decode_str(value).decode_utf8_lossy().into_owned());
            }
            _ => {}
        }
    }

    extended
        .filter(|name| !name.trim().is_empty())
        .or(plain)
        .filter(|name| !name.trim().is_empty())
}

/// Replaces every run of disallowed characters with `_`, trims, and
/// truncates to `MAX_FILENAME_CHARS`
///
/// Allowed: word characters, `-`, `.`, whitespace, Hangul syllables,
/// parentheses, brackets and `_`. Path separators never survive.
///
/// ```
/// use board_pdf_crawler::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c.pdf"), "a_b_c.pdf");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced = DISALLOWED.replace_all(name, "_");
    replaced.trim().chars().take(MAX_FILENAME_CHARS).collect()
}

/// Cuts `stem` to at most `max_bytes` bytes on a char boundary
fn truncate_to_bytes(stem: &str, max_bytes: usize) -> &str {
    if stem.len() <= max_bytes {
        return stem;
    }
    let mut end = max_bytes;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    stem[..end].trim_end()
}

/// Resolves, sanitizes and checks the filename of a response
///
/// A name already ending in `.pdf` is kept (stem re-sanitized). Any other name
/// is coerced to `.pdf` only when `Content-Type` declares
/// `application/pdf`; otherwise the download is rejected as non-PDF. The stem
/// is cut so the name stays under the 255-byte filesystem limit even with a
/// collision suffix.
pub fn resolve_pdf_filename(headers: &HeaderMap, fallback: &str) -> FilenameResolution {
    let filename = sanitize_filename(&resolve_filename(headers, fallback));
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).to_lowercase())
        .unwrap_or_default();

    let path = Path::new(&filename);
    let is_pdf_name = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(PDF_EXT))
        .unwrap_or(false);

    if !is_pdf_name && !content_type.contains("application/pdf") {
        return FilenameResolution::NotPdf {
            filename,
            content_type,
        };
    }

    let stem = path
        .file_stem()
        .map(|stem| sanitize_filename(&stem.to_string_lossy()))
        .map(|stem| truncate_to_bytes(&stem, MAX_STEM_BYTES).to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_STEM.to_string());

    FilenameResolution::Pdf(format!("{}.{}", stem, PDF_EXT))
}
