//! File access for the page reader and the search scan.
//!
//! Files are never loaded whole: every operation opens its own handle, seeks to
//! a checkpoint and streams forward window by window.

pub mod lines;
pub mod validation;

pub(crate) use lines::open_file;
pub use lines::{LineReader, RawLine};
pub use validation::validate_file_path;
