//! Outcome definitions for list pages and posts
use std::fmt;

/// Result of processing one list page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// The list page yielded at least one post
    Productive {
        /// Posts extracted from the page
        posts: usize,
    },

    /// The list page was fetched but contained no posts
    Empty,

    /// The list page could not be fetched after all retries
    Failed,
}

impl PageOutcome {
    /// Productive pages reset the sweep's consecutive-empty counter
    pub fn is_productive(&self) -> bool {
        matches!(self, Self::Productive { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Productive { .. } => "productive",
            Self::Empty => "empty",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of processing one post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostOutcome {
    /// Skipped because the id was already in the done set
    AlreadyDone,

    /// Detail page handled and every link attempted
    Completed {
        saved: usize,
        skipped: usize,
        failed: usize,
    },

    /// Detail page could not be fetched; the post stays unmarked
    Failed,
}
