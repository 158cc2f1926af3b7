//! URL handling for board links
//!
//! This module resolves relative links against the board root and derives the
//! stable post identity used for deduplication.

mod query;

pub use query::{canonical_query, first_query_value};

use sha2::{Digest, Sha256};
use url::Url;

/// Derives the identity of a post from its detail URL
///
/// The first non-empty value among `id_params` wins. When none is present the
/// identity is the SHA-256 digest of the canonical (sorted) query string, so
/// two links differing only in parameter order map to the same post.
///
/// # Examples
///
/// ```
/// use board_pdf_crawler::url::post_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://www.mohw.go.kr/board.es?mid=a1&bid=0026&list_no=42").unwrap();
/// let ids = vec!["list_no".to_string(), "bno".to_string()];
/// assert_eq!(post_id_from_url(&url, &ids), "42");
/// ```
pub fn post_id_from_url(url: &Url, id_params: &[String]) -> String {
    for param in id_params {
        if let Some(value) = first_query_value(url, param) {
            return value;
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical_query(url).as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only anchors, `javascript:`,
/// `mailto:`, `tel:` and `data:` links, and anything that does not resolve to
/// http or https.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
