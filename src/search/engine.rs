//! Streaming search over the raw file.
//!
//! The scan ignores the sparse index and visits every line from the start. Every
//! `search_progress_interval` lines (starting before the first line) it emits a
//! progress event, yields to the scheduler and checks the cancellation token;
//! that is the only place cancellation is observed.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::file_handler::LineReader;
use crate::record::{Checkpoint, Record};
use crate::search::matcher::LineMatcher;
use crate::search::query::{SearchHit, SearchProgress, SearchQuery, SearchResult};
use std::borrow::Cow;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Scan `path` for lines matching `query`.
    ///
    /// A line matches when `errors_only` is set and the line fails to decode,
    /// or when the text matcher accepts its raw text. I/O errors end the run
    /// with `Err`; cancellation ends it with `interrupted = true`.
    pub async fn search<F>(
        &self,
        path: &Path,
        query: &SearchQuery,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<SearchResult>
    where
        F: FnMut(SearchProgress),
    {
        if query.is_empty() {
            return Ok(SearchResult::empty(query.clone()));
        }

        let matcher = (!query.text.is_empty())
            .then(|| LineMatcher::new(&query.text, query.case_sensitive, query.use_regex));
        let cap = self.config.resolve_max_results(query.max_results) as usize;
        let interval = self.config.search_progress_interval.max(1);

        let mut reader =
            LineReader::open(path, Checkpoint::START, self.config.read_window_bytes).await?;
        let bytes_total = reader.file_len();
        log::debug!(
            "search {:?} over {} ({} bytes)",
            query.text,
            path.display(),
            bytes_total
        );

        let mut result = SearchResult::empty(query.clone());
        loop {
            if result.lines_scanned % interval == 0 {
                on_progress(progress(
                    reader.bytes_consumed(),
                    bytes_total,
                    result.lines_scanned,
                    result.hits.len(),
                ));
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    log::debug!("search {:?} cancelled", query.text);
                    result.interrupted = true;
                    result.cancelled = true;
                    return Ok(result);
                }
            }

            let Some(line) = reader.next_line().await? else {
                break;
            };
            result.lines_scanned += 1;

            let text = line_text(line.number, line.bytes);
            let ranges = matcher
                .as_ref()
                .map(|m| m.find_ranges(&text))
                .unwrap_or_default();
            let text_hit = !ranges.is_empty();
            if !text_hit && !query.errors_only {
                continue;
            }

            let record = Record::from_line_bytes(line.number, line.offset, line.bytes);
            if !text_hit && !record.is_error() {
                continue;
            }

            if result.hits.len() == cap {
                // One match beyond the cap: more results exist than we keep
                result.interrupted = true;
                break;
            }
            result.hits.push(SearchHit { record, ranges });
        }

        if !result.interrupted {
            on_progress(SearchProgress {
                bytes_processed: bytes_total,
                bytes_total,
                progress: 1.0,
                lines_scanned: result.lines_scanned,
                matches: result.hits.len() as u64,
            });
        }
        log::info!(
            "search {:?}: {} hits in {} lines{}",
            query.text,
            result.hits.len(),
            result.lines_scanned,
            if result.interrupted { " (capped)" } else { "" }
        );
        Ok(result)
    }
}

/// Raw text the matcher sees, decoded the same way as [`Record::raw`]
fn line_text(line_number: u64, bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let bytes = if line_number == 1 {
        bytes.strip_prefix("\u{feff}".as_bytes()).unwrap_or(bytes)
    } else {
        bytes
    };
    String::from_utf8_lossy(bytes)
}

fn progress(done: u64, total: u64, lines: u64, matches: usize) -> SearchProgress {
    SearchProgress {
        bytes_processed: done,
        bytes_total: total,
        progress: if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64).min(1.0)
        },
        lines_scanned: lines,
        matches: matches as u64,
    }
}
