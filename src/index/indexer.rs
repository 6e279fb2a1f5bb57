//! Background sparse indexer.
//!
//! A single tokio task per file scans the file once, publishing a checkpoint
//! every `stride` lines. After each checkpoint it reports progress and yields
//! to the scheduler; the stop flag is observed at those yield points and after
//! every chunk read.

use crate::error::{JsonlError, Result};
use crate::file_handler::open_file;
use crate::index::checkpoints::CheckpointList;
use crate::index::scanner::StrideScanner;
use crate::record::{Checkpoint, IndexProgress};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinHandle;

/// Point-in-time view of an index, for status display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub checkpoints: usize,
    pub last_checkpoint: Option<Checkpoint>,
    pub total_lines: Option<u64>,
    pub active: bool,
}

impl IndexSnapshot {
    pub fn indexed(&self) -> bool {
        self.total_lines.is_some()
    }
}

#[derive(Debug, Default)]
struct IndexState {
    checkpoints: CheckpointList,
    total_lines: RwLock<Option<u64>>,
    active: AtomicBool,
    /// Bumped on every start and stop; a job only writes while its generation is current
    generation: AtomicU64,
}

impl IndexState {
    fn is_current(&self, generation: u64) -> bool {
        self.active.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Sparse line index for one file
#[derive(Debug, Clone)]
pub struct SparseIndexer {
    path: PathBuf,
    state: Arc<IndexState>,
}

impl SparseIndexer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(IndexState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the background scan.
    ///
    /// Returns `None` without doing anything when a job is already running or
    /// the index is complete. A job started after [`stop`](Self::stop) or after
    /// an I/O failure resumes from the last published checkpoint.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(
        &self,
        stride_lines: u64,
        chunk_bytes: usize,
        on_progress: F,
    ) -> Option<JoinHandle<Result<()>>>
    where
        F: FnMut(IndexProgress) + Send + 'static,
    {
        if self.is_indexed() {
            return None;
        }
        if self
            .state
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let job = IndexJob {
            state: Arc::clone(&self.state),
            path: self.path.clone(),
            stride: stride_lines.max(1),
            chunk_bytes: chunk_bytes.max(1),
            generation,
        };
        log::debug!(
            "starting index job #{} for {} (stride {})",
            generation,
            self.path.display(),
            job.stride
        );
        Some(tokio::spawn(job.run(on_progress)))
    }

    /// Signal the running job to stop at its next yield point
    pub fn stop(&self) {
        if self.state.active.swap(false, Ordering::SeqCst) {
            self.state.generation.fetch_add(1, Ordering::SeqCst);
            log::debug!("stopping index job for {}", self.path.display());
        }
    }

    /// Greatest checkpoint at or before `target_line`; `{1, 0}` when nothing is indexed yet
    pub fn nearest_checkpoint(&self, target_line: u64) -> Checkpoint {
        self.state.checkpoints.nearest(target_line)
    }

    /// Exact total once indexed, otherwise an extrapolation from the last checkpoint.
    ///
    /// Returns 0 while no checkpoint beyond the seed exists.
    pub fn estimate_total_lines(&self, file_size: u64) -> u64 {
        if let Some(total) = self.total_lines() {
            return total;
        }
        match self.state.checkpoints.last() {
            Some(last) if last.line > 1 && last.offset > 0 => {
                let lines_per_byte = (last.line - 1) as f64 / last.offset as f64;
                (file_size as f64 * lines_per_byte).ceil() as u64
            }
            _ => 0,
        }
    }

    pub fn total_lines(&self) -> Option<u64> {
        *self.state.total_lines.read()
    }

    pub fn is_indexed(&self) -> bool {
        self.total_lines().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.state.checkpoints.to_vec()
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            checkpoints: self.state.checkpoints.len(),
            last_checkpoint: self.state.checkpoints.last(),
            total_lines: self.total_lines(),
            active: self.is_active(),
        }
    }
}

struct IndexJob {
    state: Arc<IndexState>,
    path: PathBuf,
    stride: u64,
    chunk_bytes: usize,
    generation: u64,
}

impl IndexJob {
    async fn run<F>(self, mut on_progress: F) -> Result<()>
    where
        F: FnMut(IndexProgress),
    {
        let result = self.scan(&mut on_progress).await;

        // Leave the flag alone if a newer job has taken over
        if self.state.generation.load(Ordering::SeqCst) == self.generation {
            self.state.active.store(false, Ordering::SeqCst);
        }
        if let Err(e) = &result {
            log::warn!("index job for {} aborted: {}", self.path.display(), e);
        }
        result
    }

    async fn scan<F>(&self, on_progress: &mut F) -> Result<()>
    where
        F: FnMut(IndexProgress),
    {
        let mut file = open_file(&self.path).await?;
        let file_size = file
            .metadata()
            .await
            .map_err(|e| JsonlError::file_error("Failed to get file metadata", e))?
            .len();

        self.state.checkpoints.seed();
        let resume = self
            .state
            .checkpoints
            .last()
            .unwrap_or(Checkpoint::START);
        file.seek(SeekFrom::Start(resume.offset))
            .await
            .map_err(|e| JsonlError::file_error("Failed to seek to checkpoint", e))?;

        let mut scanner = StrideScanner::new(self.stride, resume);
        let mut chunk = vec![0u8; self.chunk_bytes];
        let mut found = Vec::new();

        loop {
            let n = file
                .read(&mut chunk)
                .await
                .map_err(|e| JsonlError::file_error("Failed to read index chunk", e))?;
            if !self.state.is_current(self.generation) {
                log::debug!("index job #{} stopped", self.generation);
                return Ok(());
            }
            if n == 0 {
                break;
            }

            scanner.scan(&chunk[..n], &mut found);
            for checkpoint in found.drain(..) {
                self.state.checkpoints.publish(checkpoint);
                on_progress(IndexProgress {
                    scanned_lines: checkpoint.line - 1,
                    progress: fraction(checkpoint.offset, file_size),
                    indexed: false,
                });

                tokio::task::yield_now().await;
                if !self.state.is_current(self.generation) {
                    log::debug!("index job #{} stopped", self.generation);
                    return Ok(());
                }
            }
        }

        let total = scanner.total_lines();
        *self.state.total_lines.write() = Some(total);
        self.state.active.store(false, Ordering::SeqCst);
        log::info!(
            "indexed {}: {} lines, {} checkpoints",
            self.path.display(),
            total,
            self.state.checkpoints.len()
        );
        on_progress(IndexProgress {
            scanned_lines: total,
            progress: 1.0,
            indexed: true,
        });
        Ok(())
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|i| format!("{{\"n\":{i}}}\n")).collect()
    }

    #[tokio::test]
    async fn test_full_index() {
        let file = create_test_file(numbered_lines(25).as_bytes());
        let indexer = SparseIndexer::new(file.path());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let handle = indexer
            .start(10, 16, move |p| sink.lock().push(p))
            .expect("job should start");
        handle.await.unwrap().unwrap();

        assert_eq!(indexer.total_lines(), Some(25));
        assert!(!indexer.is_active());
        let checkpoints = indexer.checkpoints();
        assert_eq!(checkpoints[0], Checkpoint::START);
        assert_eq!(
            checkpoints.iter().map(|c| c.line).collect::<Vec<_>>(),
            vec![1, 11, 21]
        );

        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert!(!events[0].indexed);
        let last = events.last().unwrap();
        assert!(last.indexed);
        assert_eq!(last.progress, 1.0);
        assert_eq!(last.scanned_lines, 25);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_after_completion() {
        let file = create_test_file(b"{}\n{}\n");
        let indexer = SparseIndexer::new(file.path());
        indexer.start(1, 8, |_| {}).unwrap().await.unwrap().unwrap();
        assert!(indexer.start(1, 8, |_| {}).is_none());
    }

    #[tokio::test]
    async fn test_second_start_while_active_is_noop() {
        let file = create_test_file(numbered_lines(2000).as_bytes());
        let indexer = SparseIndexer::new(file.path());
        let first = indexer.start(1, 64, |_| {}).unwrap();
        assert!(indexer.start(1, 64, |_| {}).is_none());
        first.await.unwrap().unwrap();
        assert_eq!(indexer.total_lines(), Some(2000));
    }

    #[tokio::test]
    async fn test_nearest_before_start() {
        let indexer = SparseIndexer::new("/does/not/matter.jsonl");
        assert_eq!(indexer.nearest_checkpoint(1_000), Checkpoint::START);
        assert_eq!(indexer.estimate_total_lines(10_000), 0);
    }

    #[tokio::test]
    async fn test_stop_leaves_partial_index_and_resume_completes() {
        let file = create_test_file(numbered_lines(5000).as_bytes());
        let indexer = SparseIndexer::new(file.path());
        let stopper = indexer.clone();
        let handle = indexer
            .start(10, 128, move |p| {
                if p.scanned_lines >= 100 {
                    stopper.stop();
                }
            })
            .unwrap();
        handle.await.unwrap().unwrap();

        assert!(!indexer.is_active());
        assert!(indexer.total_lines().is_none());
        let partial = indexer.checkpoints();
        assert!(partial.len() > 1);
        assert!(partial.windows(2).all(|w| w[0].line < w[1].line && w[0].offset < w[1].offset));

        indexer.start(10, 128, |_| {}).unwrap().await.unwrap().unwrap();
        assert_eq!(indexer.total_lines(), Some(5000));
        let full = indexer.checkpoints();
        assert_eq!(&full[..partial.len()], &partial[..]);
        assert!(full.windows(2).all(|w| w[0].line < w[1].line && w[0].offset < w[1].offset));
    }

    #[tokio::test]
    async fn test_missing_file_marks_inactive() {
        let indexer = SparseIndexer::new("/no/such/file.jsonl");
        let result = indexer.start(10, 64, |_| {}).unwrap().await.unwrap();
        assert!(result.is_err());
        assert!(!indexer.is_active());
        assert!(!indexer.is_indexed());
    }

    #[tokio::test]
    async fn test_estimate_tracks_uniform_lines() {
        let file = create_test_file(numbered_lines(9000).as_bytes());
        let indexer = SparseIndexer::new(file.path());
        let size = std::fs::metadata(file.path()).unwrap().len();
        let stopper = indexer.clone();
        indexer
            .start(100, 256, move |p| {
                if p.scanned_lines >= 3000 {
                    stopper.stop();
                }
            })
            .unwrap()
            .await
            .unwrap()
            .unwrap();

        let estimate = indexer.estimate_total_lines(size) as f64;
        assert!((estimate - 9000.0).abs() / 9000.0 < 0.15, "estimate {estimate}");
    }

    #[tokio::test]
    async fn test_empty_file_indexes_to_zero() {
        let file = create_test_file(b"");
        let indexer = SparseIndexer::new(file.path());
        indexer.start(10, 64, |_| {}).unwrap().await.unwrap().unwrap();
        assert_eq!(indexer.total_lines(), Some(0));
        assert_eq!(indexer.checkpoints(), vec![Checkpoint::START]);
        assert!(indexer.snapshot().indexed());
    }
}
