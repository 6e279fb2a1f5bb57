//! Newline counting over raw chunks.
//!
//! Uses `memchr` for SIMD newline detection. A checkpoint whose line would start
//! exactly at the end of the current chunk is held back until the next non-empty
//! chunk proves the line exists, so no checkpoint ever points past the last line.

use crate::record::Checkpoint;
use memchr::memchr_iter;

#[derive(Debug, Clone)]
pub struct StrideScanner {
    stride: u64,
    /// Line currently being scanned (1-based)
    line: u64,
    last_checkpoint_line: u64,
    /// Absolute offset of the next byte to scan
    offset: u64,
    /// Bytes seen since the last newline
    partial: bool,
    pending: Option<Checkpoint>,
}

impl StrideScanner {
    /// Start scanning at `from`, which must be a known line start
    pub fn new(stride: u64, from: Checkpoint) -> Self {
        Self {
            stride: stride.max(1),
            line: from.line,
            last_checkpoint_line: from.line,
            offset: from.offset,
            partial: false,
            pending: None,
        }
    }

    /// Scan one chunk that continues directly after the previous one
    pub fn scan(&mut self, chunk: &[u8], found: &mut Vec<Checkpoint>) {
        if chunk.is_empty() {
            return;
        }
        if let Some(checkpoint) = self.pending.take() {
            found.push(checkpoint);
        }

        let chunk_len = chunk.len();
        for pos in memchr_iter(b'\n', chunk) {
            self.line += 1;
            if self.line - self.last_checkpoint_line >= self.stride {
                self.last_checkpoint_line = self.line;
                let checkpoint = Checkpoint::new(self.line, self.offset + pos as u64 + 1);
                if pos + 1 < chunk_len {
                    found.push(checkpoint);
                } else {
                    self.pending = Some(checkpoint);
                }
            }
        }

        self.partial = chunk[chunk_len - 1] != b'\n';
        self.offset += chunk_len as u64;
    }

    /// Total lines once the whole file has been scanned.
    ///
    /// An unterminated trailing line counts when it holds at least one byte.
    pub fn total_lines(&self) -> u64 {
        self.line - 1 + u64::from(self.partial)
    }
}
