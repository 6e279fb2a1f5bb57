//! Search request, result and progress types.

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
    /// Result cap; 0 selects the configured default
    pub max_results: u32,
    /// Also match every line that fails to decode as JSON
    pub errors_only: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            case_sensitive: false,
            use_regex: false,
            max_results: 0,
            errors_only: false,
        }
    }
}

impl SearchQuery {
    /// Literal, case-insensitive query for `text`
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Query matching lines that are not valid JSON
    pub fn errors() -> Self {
        Self {
            errors_only: true,
            ..Self::default()
        }
    }

    /// A query with nothing to look for yields no results and does not scan
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.errors_only
    }
}

/// A matching line plus the byte ranges of the matches within `record.raw`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: Record,
    pub ranges: Vec<(usize, usize)>,
}

/// Terminal outcome of one search run.
///
/// `interrupted` is set when the run stopped before end of file, either
/// because it was cancelled or because more matches existed than the cap
/// allows. The hits gathered up to that point are valid either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub hits: Vec<SearchHit>,
    pub interrupted: bool,
    pub cancelled: bool,
    pub lines_scanned: u64,
}

impl SearchResult {
    pub fn empty(query: SearchQuery) -> Self {
        Self {
            query,
            hits: Vec::new(),
            interrupted: false,
            cancelled: false,
            lines_scanned: 0,
        }
    }

    pub fn line_numbers(&self) -> Vec<u64> {
        self.hits.iter().map(|h| h.record.line_number).collect()
    }
}

/// Periodic progress event emitted while a search scans the file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub bytes_processed: u64,
    pub bytes_total: u64,
    /// `bytes_processed / bytes_total`, in `[0, 1]`
    pub progress: f64,
    pub lines_scanned: u64,
    pub matches: u64,
}

/// Lifecycle of the search slot of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}
