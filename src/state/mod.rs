//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DoneSet`: post ids whose processing has finished
//! - `PageOutcome`: how a single list page went, feeding sweep termination
//! - `PostOutcome`: how a single post went

mod done_set;
mod outcome;

pub use done_set::DoneSet;
pub use outcome::{PageOutcome, PostOutcome};
