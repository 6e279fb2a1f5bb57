//! Windowed async line reader.
//!
//! Reads the file in fixed-size windows and splits on the `\n` byte. The
//! unterminated tail of a window is carried as raw bytes into the next one, so
//! a multi-byte character that straddles a window boundary reaches the decoder
//! whole and every line keeps its exact byte offset.

use crate::error::{JsonlError, Result};
use crate::record::Checkpoint;
use memchr::memchr;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// One complete line as raw bytes, without its `\n` terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number
    pub number: u64,
    /// Byte offset of the first byte of the line
    pub offset: u64,
    pub bytes: &'a [u8],
}

/// Open a file for reading, mapping a missing file to [`JsonlError::FileNotFound`]
pub(crate) async fn open_file(path: &Path) -> Result<File> {
    File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => JsonlError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => JsonlError::file_error(format!("Failed to open file: {}", path.display()), e),
    })
}

/// Forward-only line reader starting at a known checkpoint
#[derive(Debug)]
pub struct LineReader {
    file: File,
    /// Carry bytes followed by the most recent window
    buffer: Vec<u8>,
    /// Start of the unconsumed part of `buffer`
    pos: usize,
    /// File offset of `buffer[pos]`
    offset: u64,
    next_line: u64,
    window_bytes: usize,
    file_len: u64,
    eof: bool,
}

impl LineReader {
    /// Open `path` and position the reader at `start`
    pub async fn open(path: &Path, start: Checkpoint, window_bytes: usize) -> Result<Self> {
        let mut file = open_file(path).await?;
        let file_len = file
            .metadata()
            .await
            .map_err(|e| JsonlError::file_error("Failed to get file metadata", e))?
            .len();
        file.seek(SeekFrom::Start(start.offset))
            .await
            .map_err(|e| JsonlError::file_error("Failed to seek to checkpoint", e))?;

        Ok(Self {
            file,
            buffer: Vec::with_capacity(window_bytes.max(1) * 2),
            pos: 0,
            offset: start.offset,
            next_line: start.line,
            window_bytes: window_bytes.max(1),
            file_len,
            eof: false,
        })
    }

    /// Return the next complete line, or `None` at end of file.
    ///
    /// A final line without a terminator is returned when it is non-empty.
    pub async fn next_line(&mut self) -> Result<Option<RawLine<'_>>> {
        let (start, end) = loop {
            if let Some(i) = memchr(b'\n', &self.buffer[self.pos..]) {
                let start = self.pos;
                self.pos += i + 1;
                break (start, start + i);
            }
            if self.eof {
                if self.pos < self.buffer.len() {
                    let start = self.pos;
                    self.pos = self.buffer.len();
                    break (start, self.pos);
                }
                return Ok(None);
            }
            self.fill().await?;
        };

        let line = RawLine {
            number: self.next_line,
            offset: self.offset,
            bytes: &self.buffer[start..end],
        };
        self.offset += (self.pos - start) as u64;
        self.next_line += 1;
        Ok(Some(line))
    }

    /// Bytes consumed so far, measured from the start of the file
    pub fn bytes_consumed(&self) -> u64 {
        self.offset
    }

    /// File length observed when the reader was opened
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    async fn fill(&mut self) -> Result<()> {
        // Keep only the carried partial line
        self.buffer.drain(..self.pos);
        self.pos = 0;

        let carried = self.buffer.len();
        self.buffer.resize(carried + self.window_bytes, 0);
        let n = self
            .file
            .read(&mut self.buffer[carried..])
            .await
            .map_err(|e| JsonlError::file_error("Failed to read file window", e))?;
        self.buffer.truncate(carried + n);
        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }
}
