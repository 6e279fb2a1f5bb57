//! Protocol definitions shared between a host shell and the session worker.

use crate::error::JsonlError;
use crate::index::IndexSnapshot;
use crate::record::{IndexProgress, Page, Record};
use crate::search::{SearchProgress, SearchQuery, SearchResult};

/// Identifier attached to requests so responses can be correlated.
pub type RequestId = u64;

/// Commands sent from the host to the session worker.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Start the background index job. Progress arrives as `IndexProgress`;
    /// if indexing is already running or done the reply is `IndexStatus`.
    StartIndexing { request_id: RequestId },
    ReadPage {
        request_id: RequestId,
        page_number: u64,
        page_size: u64,
    },
    ReadLine {
        request_id: RequestId,
        line_number: u64,
    },
    PageForLine {
        request_id: RequestId,
        line_number: u64,
        page_size: u64,
    },
    /// Start a search, superseding the one in flight.
    Search {
        request_id: RequestId,
        query: SearchQuery,
    },
    CancelSearch,
    Shutdown,
}

/// Responses emitted by the session worker back to the host.
#[derive(Debug)]
pub enum SessionResponse {
    IndexProgress {
        request_id: RequestId,
        progress: IndexProgress,
    },
    IndexStatus {
        request_id: RequestId,
        snapshot: IndexSnapshot,
    },
    PageLoaded {
        request_id: RequestId,
        page: Page,
    },
    LineLoaded {
        request_id: RequestId,
        record: Option<Record>,
    },
    PageForLine {
        request_id: RequestId,
        page_number: u64,
    },
    SearchProgress {
        request_id: RequestId,
        progress: SearchProgress,
    },
    SearchFinished {
        request_id: RequestId,
        result: SearchResult,
    },
    Error {
        request_id: RequestId,
        error: JsonlError,
    },
}

impl SessionResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::IndexProgress { request_id, .. }
            | Self::IndexStatus { request_id, .. }
            | Self::PageLoaded { request_id, .. }
            | Self::LineLoaded { request_id, .. }
            | Self::PageForLine { request_id, .. }
            | Self::SearchProgress { request_id, .. }
            | Self::SearchFinished { request_id, .. }
            | Self::Error { request_id, .. } => *request_id,
        }
    }
}
