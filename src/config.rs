//! Engine tuning knobs.
//!
//! Every field has a default, so callers only construct an [`EngineConfig`]
//! when they want to override something. With the `config` feature enabled the
//! values can also be read from `<config_dir>/jsonlens/config.toml`.

use crate::error::{JsonlError, Result};
use serde::{Deserialize, Serialize};

/// Tuning parameters shared by the indexer, page reader and search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record a checkpoint every `stride_lines` lines
    pub stride_lines: u64,
    /// Chunk size used by the background indexer
    pub index_chunk_bytes: usize,
    /// Window size used by the page reader and the search scan
    pub read_window_bytes: usize,
    /// Page size substituted when a caller asks for a page size of 0
    pub default_page_size: u64,
    /// Largest page size a caller may request
    pub max_page_size: u64,
    /// Result cap substituted when a query carries `max_results == 0`
    pub default_max_results: u32,
    /// Lines between search progress events, yields and cancellation checks
    pub search_progress_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stride_lines: 1000,
            index_chunk_bytes: 64 * 1024,
            read_window_bytes: 64 * 1024,
            default_page_size: 100,
            max_page_size: 10_000,
            default_max_results: 1000,
            search_progress_interval: 1000,
        }
    }
}

impl EngineConfig {
    /// Reject values that would stall or divide by zero
    pub fn validate(&self) -> Result<()> {
        if self.stride_lines == 0 {
            return Err(JsonlError::config("stride_lines must be at least 1"));
        }
        if self.index_chunk_bytes == 0 || self.read_window_bytes == 0 {
            return Err(JsonlError::config("chunk and window sizes must be non-zero"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(JsonlError::config(format!(
                "default_page_size must be in 1..={}",
                self.max_page_size
            )));
        }
        if self.search_progress_interval == 0 {
            return Err(JsonlError::config(
                "search_progress_interval must be at least 1",
            ));
        }
        Ok(())
    }

    /// Resolve a caller page size (0 = default) and enforce the upper bound
    pub fn resolve_page_size(&self, page_size: u64) -> Result<u64> {
        match page_size {
            0 => Ok(self.default_page_size),
            n if n > self.max_page_size => Err(JsonlError::invalid_argument(format!(
                "page size {} exceeds maximum {}",
                n, self.max_page_size
            ))),
            n => Ok(n),
        }
    }

    /// Resolve a query result cap (0 = default)
    pub fn resolve_max_results(&self, max_results: u32) -> u32 {
        if max_results == 0 {
            self.default_max_results
        } else {
            max_results
        }
    }
}

#[cfg(feature = "config")]
impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| JsonlError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            JsonlError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `<config_dir>/jsonlens/config.toml`, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(Self::default());
        };
        let path = dir.join("jsonlens").join("config.toml");
        if !path.is_file() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}
