//! Random-access page reader.
//!
//! Seeks to the nearest checkpoint at or before the first requested line and
//! streams forward, decoding exactly the requested range. Works whether the
//! index is complete, partial, or not started.

use crate::config::EngineConfig;
use crate::error::{JsonlError, Result};
use crate::file_handler::LineReader;
use crate::index::SparseIndexer;
use crate::record::{Page, Record};
use std::path::{Path, PathBuf};

/// Page containing `line_number` for pages of `page_size` lines (1-based, minimum 1)
pub fn page_for_line(line_number: u64, page_size: u64) -> u64 {
    line_number.div_ceil(page_size.max(1)).max(1)
}

/// Number of navigable pages; always at least 1
pub fn total_pages(total_lines: u64, page_size: u64) -> u64 {
    total_lines.div_ceil(page_size.max(1)).max(1)
}

#[derive(Debug, Clone)]
pub struct PageReader {
    path: PathBuf,
    indexer: SparseIndexer,
    config: EngineConfig,
}

impl PageReader {
    pub fn new(indexer: SparseIndexer, config: EngineConfig) -> Self {
        Self {
            path: indexer.path().to_path_buf(),
            indexer,
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read page `page_number` (1-based). A `page_size` of 0 selects the configured default.
    pub async fn read_page(&self, page_number: u64, page_size: u64) -> Result<Page> {
        let page_size = self.config.resolve_page_size(page_size)?;
        let known_total = self.indexer.total_lines();

        if page_number == 0 {
            return Err(JsonlError::PageOutOfRange {
                page: page_number,
                total_pages: known_total.map_or(1, |t| total_pages(t, page_size)),
            });
        }
        if let Some(total) = known_total {
            let pages = total_pages(total, page_size);
            if page_number > pages {
                return Err(JsonlError::PageOutOfRange {
                    page: page_number,
                    total_pages: pages,
                });
            }
        }

        let start_line = (page_number - 1)
            .checked_mul(page_size)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| JsonlError::invalid_argument("page number overflows line range"))?;
        let (records, file_len) = self.read_range(start_line, page_size).await?;

        // Re-read the index state: it may have completed during the scan
        let (total_lines, is_indexed) = match self.indexer.total_lines() {
            Some(total) => (total, true),
            None => {
                let seen = records.last().map_or(0, |r| r.line_number);
                (self.indexer.estimate_total_lines(file_len).max(seen), false)
            }
        };

        Ok(Page {
            records,
            page_number,
            page_size,
            total_lines,
            total_pages: total_pages(total_lines, page_size),
            is_indexed,
        })
    }

    /// Read a single line, `None` when the line does not exist
    pub async fn read_line(&self, line_number: u64) -> Result<Option<Record>> {
        if line_number == 0 {
            return Ok(None);
        }
        if let Some(total) = self.indexer.total_lines() {
            if line_number > total {
                return Ok(None);
            }
        }
        let (mut records, _) = self.read_range(line_number, 1).await?;
        Ok(records.pop())
    }

    /// Decode up to `count` lines starting at `start_line`; also returns the file length
    async fn read_range(&self, start_line: u64, count: u64) -> Result<(Vec<Record>, u64)> {
        let checkpoint = self.indexer.nearest_checkpoint(start_line);
        let mut reader =
            LineReader::open(&self.path, checkpoint, self.config.read_window_bytes).await?;
        let file_len = reader.file_len();
        log::debug!(
            "reading {} lines from line {} (checkpoint line {}, offset {})",
            count,
            start_line,
            checkpoint.line,
            checkpoint.offset
        );

        let capacity = count.min(self.config.max_page_size) as usize;
        let mut records = Vec::with_capacity(capacity);
        while (records.len() as u64) < count {
            let Some(line) = reader.next_line().await? else {
                break;
            };
            if line.number < start_line {
                continue;
            }
            records.push(Record::from_line_bytes(line.number, line.offset, line.bytes));
        }
        Ok((records, file_len))
    }
}
