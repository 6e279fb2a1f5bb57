//! # jsonlens - Paged JSON Lines Engine
//!
//! Opens arbitrarily large `.jsonl` files and serves them a page at a time
//! without ever holding the whole file in memory.
//!
//! ## Features
//!
//! - **Sparse Indexing**: a background task records a checkpoint every N lines
//!   so later page reads seek close to their target
//! - **Paged Reads**: any page is readable at any time, before, during or after indexing
//! - **Streaming Search**: literal, regex and decode-error search with
//!   progress events, a result cap and cooperative cancellation
//! - **Sessions**: one owned session per open file, with last-request-wins search
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Engine tunables
//! - [`record`] - Checkpoints, records and pages
//! - [`file_handler`] - File validation and the windowed line reader
//! - [`index`] - Sparse checkpoint index built in the background
//! - [`reader`] - Page and line reads over the index
//! - [`search`] - Search engine built on the ripgrep matcher crates
//! - [`session`] - Per-file sessions and the path-keyed session manager
//! - [`protocol`] / [`worker`] - Channel protocol for driving a session from a host

pub mod config;
pub mod error;
pub mod file_handler;
pub mod index;
pub mod protocol;
pub mod reader;
pub mod record;
pub mod search;
pub mod session;
pub mod worker;

pub use config::EngineConfig;
pub use error::{JsonlError, Result};
pub use index::{IndexSnapshot, SparseIndexer};
pub use reader::{page_for_line, total_pages, PageReader};
pub use record::{Checkpoint, IndexProgress, Page, Record};
pub use search::{SearchEngine, SearchHit, SearchProgress, SearchQuery, SearchResult, SearchStatus};
pub use session::{FileSession, IndexEvent, SearchEvent, SessionManager};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
