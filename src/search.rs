pub mod engine;
pub mod matcher;
pub mod query;

pub use engine::SearchEngine;
pub use matcher::LineMatcher;
pub use query::{SearchHit, SearchProgress, SearchQuery, SearchResult, SearchStatus};
