//! Page selection for a crawl run
//!
//! A run either visits an explicit set of page numbers or sweeps forward from
//! a start page until an end page or the end-of-board heuristic stops it.

use crate::ConfigError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Widest range a single `a-b` token may expand to
const MAX_RANGE_SPAN: u32 = 100_000;

/// Which list pages a run visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Exactly these pages, ascending, each once
    Explicit(BTreeSet<u32>),

    /// From `start` upward until `end` (inclusive) or the board runs dry
    Sweep { start: u32, end: Option<u32> },
}

impl PageCursor {
    /// Builds a sweep, clamping `start` to 1 and dropping an `end` below it
    pub fn sweep(start: u32, end: Option<u32>) -> Self {
        let start = start.max(1);
        Self::Sweep {
            start,
            end: end.filter(|&e| e >= start),
        }
    }

    pub fn explicit(pages: impl IntoIterator<Item = u32>) -> Self {
        Self::Explicit(pages.into_iter().filter(|&p| p >= 1).collect())
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(pages) => {
                let list = pages
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "pages [{}]", list)
            }
            Self::Sweep { start, end: Some(end) } => write!(f, "sweep {}..={}", start, end),
            Self::Sweep { start, end: None } => write!(f, "sweep {}..", start),
        }
    }
}

/// A parsed `--pages` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageList(pub BTreeSet<u32>);

impl FromStr for PageList {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_page_list(s).map(PageList)
    }
}

impl From<PageList> for PageCursor {
    fn from(list: PageList) -> Self {
        PageCursor::Explicit(list.0)
    }
}

/// Parses a page list such as `"1,3,5-7"`
///
/// Tokens are separated by commas; blank tokens are ignored. A range `a-b`
/// with `a > b` is swapped, and page numbers below 1 are dropped. Any token
/// that is not a number or range, or a list that ends up with no page at all,
/// is an error.
///
/// # Example
///
/// ```
/// use board_pdf_crawler::crawler::parse_page_list;
///
/// let pages = parse_page_list("1,3,5-7").unwrap();
/// assert_eq!(pages.into_iter().collect::<Vec<_>>(), vec![1, 3, 5, 6, 7]);
/// ```
pub fn parse_page_list(input: &str) -> Result<BTreeSet<u32>, ConfigError> {
    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let token = part.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = token.split_once('-') {
            let invalid = || ConfigError::InvalidPage(format!("invalid page range token: {}", token));
            let start: u32 = start_str.trim().parse().map_err(|_| invalid())?;
            let end: u32 = end_str.trim().parse().map_err(|_| invalid())?;

            let (start, end) = if start > end { (end, start) } else { (start, end) };
            let start = start.max(1);
            if end < start {
                continue;
            }
            if end - start >= MAX_RANGE_SPAN {
                return Err(ConfigError::InvalidPage(format!(
                    "page range too large: {} (at most {} pages)",
                    token, MAX_RANGE_SPAN
                )));
            }
            pages.extend(start..=end);
        } else {
            let page: u32 = token
                .parse()
                .map_err(|_| ConfigError::InvalidPage(format!("invalid page token: {}", token)))?;
            if page >= 1 {
                pages.insert(page);
            }
        }
    }

    if pages.is_empty() {
        return Err(ConfigError::InvalidPage(format!(
            "no valid page numbers in '{}'",
            input
        )));
    }

    Ok(pages)
}
