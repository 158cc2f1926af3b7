//! HTML extraction for list and detail pages
//!
//! This module turns board markup into crawl records:
//! - List pages yield `Post` candidates (one per detail link)
//! - Detail pages yield `FileLink` candidates pointing at PDFs
//! - Detail pages also yield loosely-extracted notice metadata
//!
//! The orchestrator only talks to the `ListExtractor` and `DetailExtractor`
//! traits; `BoardExtractor` is the scraper-backed implementation for boards
//! shaped like `board.es?mid=..&bid=..&list_no=..`.

use crate::config::BoardConfig;
use crate::url::{post_id_from_url, resolve_link};
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use url::Url;

static NOTICE_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"제?\s*(\d{4}-\d+)\s*호").unwrap());
static EFFECTIVE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(시행\s*:?|시행일\s*:?)[^\d]*(\d{4}[.\-]\d{1,2}[.\-]\d{1,2})").unwrap()
});
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// One entry of the board listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Stable identity (see `post_id_from_url`)
    pub post_id: String,

    /// Anchor text from the listing
    pub title: String,

    /// Absolute URL of the detail page
    pub detail_url: Url,
}

/// A candidate attachment found on a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    /// Name shown for the link, used as the fallback filename
    pub display_name: String,

    /// Absolute download URL
    pub url: Url,
}

/// Best-effort metadata from a detail page; absence of a field is normal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeMeta {
    pub title_in_list: String,

    /// Notice number such as `2024-123`
    pub notice_no: Option<String>,

    /// Effective date as written on the page (e.g. `2024.1.15`)
    pub effective: Option<String>,
}

/// Extracts post candidates from list-page markup
pub trait ListExtractor: Send + Sync {
    /// Returns posts deduplicated by post id; order carries no meaning
    fn extract_posts(&self, html: &str) -> Vec<Post>;
}

/// Extracts file links and metadata from detail-page markup
pub trait DetailExtractor: Send + Sync {
    /// Returns file links deduplicated by URL, in document order
    fn extract_files(&self, html: &str) -> Vec<FileLink>;

    fn extract_meta(&self, title: &str, html: &str) -> NoticeMeta {
        extract_notice_meta(title, html)
    }
}

/// Scraper-backed extractor for `board.es`-style boards
#[derive(Debug, Clone)]
pub struct BoardExtractor {
    base_url: Url,
    list_path: String,
    mid_marker: String,
    bid_marker: String,
    view_markers: Vec<String>,
    id_params: Vec<String>,
    preview_marker: String,
}

impl BoardExtractor {
    pub fn new(config: &BoardConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            base_url,
            list_path: config.list_path.clone(),
            mid_marker: format!("mid={}", config.mid),
            bid_marker: format!("bid={}", config.bid),
            view_markers: config.view_markers.clone(),
            id_params: config.id_params.clone(),
            preview_marker: config.preview_marker.to_lowercase(),
        })
    }

    /// True for hrefs that point at a detail page of this board
    fn is_detail_href(&self, href: &str) -> bool {
        href.contains(&self.list_path)
            && href.contains(&self.mid_marker)
            && href.contains(&self.bid_marker)
            && self.view_markers.iter().any(|m| href.contains(m.as_str()))
    }
}

impl ListExtractor for BoardExtractor {
    fn extract_posts(&self, html: &str) -> Vec<Post> {
        let document = Html::parse_document(html);
        let mut posts: Vec<Post> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for element in document.select(&ANCHORS) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if !self.is_detail_href(href) {
                continue;
            }
            let Some(detail_url) = resolve_link(href, &self.base_url) else {
                continue;
            };

            let post = Post {
                post_id: post_id_from_url(&detail_url, &self.id_params),
                title: element_text(&element),
                detail_url,
            };

            match slots.get(&post.post_id) {
                Some(&slot) => posts[slot] = post,
                None => {
                    slots.insert(post.post_id.clone(), posts.len());
                    posts.push(post);
                }
            }
        }

        posts
    }
}

impl DetailExtractor for BoardExtractor {
    fn extract_files(&self, html: &str) -> Vec<FileLink> {
        let document = Html::parse_document(html);
        let mut files = Vec::new();
        let mut seen: HashSet<Url> = HashSet::new();

        for element in document.select(&ANCHORS) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let low_href = href.to_lowercase();
            if low_href.contains(&self.preview_marker) {
                continue;
            }
            let Some(url) = resolve_link(href, &self.base_url) else {
                continue;
            };

            let display_name = display_name(&element, &url);
            let has_pdf_hint =
                display_name.to_lowercase().contains(".pdf") || low_href.contains(".pdf");
            if !has_pdf_hint {
                continue;
            }

            if seen.insert(url.clone()) {
                files.push(FileLink { display_name, url });
            }
        }

        files
    }
}

/// Pulls the notice number and effective date out of a detail page
///
/// Never fails; fields that do not match stay `None`.
///
/// # Example
///
/// ```
/// use board_pdf_crawler::crawler::extract_notice_meta;
///
/// let meta = extract_notice_meta("고시", "보건복지부 고시 제2024-12호 (시행: 2024. 3. 1.) 2024.3.1");
/// assert_eq!(meta.notice_no.as_deref(), Some("2024-12"));
/// ```
pub fn extract_notice_meta(title: &str, html: &str) -> NoticeMeta {
    let notice_no = NOTICE_NO
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let effective = EFFECTIVE_DATE
        .captures(html)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string());

    NoticeMeta {
        title_in_list: title.to_string(),
        notice_no,
        effective,
    }
}

/// Whitespace-normalized text content of an element
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `title` attribute, else anchor text, else last URL path segment
fn display_name(element: &ElementRef<'_>, url: &Url) -> String {
    let title_attr = element.value().attr("title").unwrap_or("").trim();
    if !title_attr.is_empty() {
        return title_attr.to_string();
    }

    let text = element_text(element);
    if !text.is_empty() {
        return text;
    }

    url.path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("")
        .to_string()
}
