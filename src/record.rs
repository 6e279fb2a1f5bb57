//! Data model shared by the indexer, the page reader and the search engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Byte-order mark stripped from the first line of a file
const BOM: char = '\u{feff}';

/// A verified mapping from a 1-based line number to the byte offset where that line begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub line: u64,
    pub offset: u64,
}

impl Checkpoint {
    /// The seed checkpoint every index starts with
    pub const START: Checkpoint = Checkpoint { line: 1, offset: 0 };

    pub fn new(line: u64, offset: u64) -> Self {
        Self { line, offset }
    }
}

/// Progress event emitted by the background indexer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexProgress {
    pub scanned_lines: u64,
    /// Fraction of the file scanned, in `[0, 1]`
    pub progress: f64,
    pub indexed: bool,
}

/// One decoded (or decode-failed) line of the file.
///
/// `parsed` is `Some(Value::Null)` for blank lines, `None` when the line failed
/// to decode (in which case `parse_error` carries the decoder message).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub line_number: u64,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub byte_offset: u64,
}

impl Record {
    /// Build a record from the bytes of one line, excluding its `\n` terminator.
    ///
    /// A trailing `\r` is removed, invalid UTF-8 is replaced lossily and a BOM is
    /// stripped only on line 1.
    pub fn from_line_bytes(line_number: u64, byte_offset: u64, bytes: &[u8]) -> Self {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let mut raw = String::from_utf8_lossy(bytes).into_owned();
        if line_number == 1 && raw.starts_with(BOM) {
            raw.replace_range(..BOM.len_utf8(), "");
        }

        let (parsed, parse_error) = decode_json(&raw);
        Self {
            line_number,
            raw,
            parsed,
            parse_error,
            byte_offset,
        }
    }

    /// True when the line holds only whitespace
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// True when the line is non-blank and not valid JSON
    pub fn is_error(&self) -> bool {
        self.parse_error.is_some()
    }

    /// Pretty-printed JSON for parsed lines, the raw text otherwise
    pub fn pretty(&self) -> String {
        match &self.parsed {
            Some(value) if !self.is_blank() => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| self.raw.clone())
            }
            _ => self.raw.clone(),
        }
    }
}

fn decode_json(raw: &str) -> (Option<Value>, Option<String>) {
    if raw.trim().is_empty() {
        return (Some(Value::Null), None);
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

/// One page of records plus pagination metadata.
///
/// When `is_indexed` is false, `total_lines` and `total_pages` are estimates
/// and should be presented as lower bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<Record>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_lines: u64,
    pub total_pages: u64,
    pub is_indexed: bool,
}
