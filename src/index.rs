//! Sparse line index.
//!
//! A checkpoint (`line -> byte offset`) is recorded every N lines by a background
//! job. The page reader seeks to the nearest checkpoint and scans forward, so the
//! index only ever accelerates reads; it is never needed for correctness.

pub mod checkpoints;
pub mod indexer;
pub mod scanner;

pub use checkpoints::CheckpointList;
pub use indexer::{IndexSnapshot, SparseIndexer};
pub use scanner::StrideScanner;
