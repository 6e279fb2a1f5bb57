//! Per-file sessions.
//!
//! A [`FileSession`] owns everything that belongs to one open file: its sparse
//! index job, a page reader over it, and a single search slot. Starting a new
//! search cancels the previous one and waits for it to finish before the new
//! scan begins, so at most one scan per session reports results.
//!
//! [`SessionManager`] is the path-keyed surface a host shell talks to. It is an
//! ordinary value owned by the host, not ambient global state.

use crate::config::EngineConfig;
use crate::error::{JsonlError, Result};
use crate::file_handler::validate_file_path;
use crate::index::{IndexSnapshot, SparseIndexer};
use crate::reader::{page_for_line, PageReader};
use crate::record::{IndexProgress, Page, Record};
use crate::search::{SearchEngine, SearchProgress, SearchQuery, SearchResult, SearchStatus};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Stream of index events, ending when the job completes, stops or fails
pub type IndexStream = UnboundedReceiverStream<IndexEvent>;

/// Stream of search events, ending after `Finished` or `Failed`
pub type SearchStream = UnboundedReceiverStream<SearchEvent>;

/// Event emitted by a running index job.
///
/// A job that was stopped ends its stream without `indexed = true` and without
/// `Failed`.
#[derive(Debug)]
pub enum IndexEvent {
    Progress(IndexProgress),
    Failed(JsonlError),
}

/// Event emitted by a running search
#[derive(Debug)]
pub enum SearchEvent {
    Progress(SearchProgress),
    Finished(SearchResult),
    Failed(JsonlError),
}

struct ActiveSearch {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owned state for one open file
pub struct FileSession {
    path: PathBuf,
    config: EngineConfig,
    indexer: SparseIndexer,
    reader: PageReader,
    engine: SearchEngine,
    search: tokio::sync::Mutex<Option<ActiveSearch>>,
    status: Arc<Mutex<SearchStatus>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for FileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSession")
            .field("path", &self.path)
            .field("index", &self.indexer.snapshot())
            .field("search", &*self.status.lock())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl FileSession {
    /// Validate `path` and set up the session; indexing is not started yet
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.validate()?;
        validate_file_path(&path)?;

        let indexer = SparseIndexer::new(&path);
        let reader = PageReader::new(indexer.clone(), config.clone());
        Ok(Self {
            engine: SearchEngine::new(config.clone()),
            path,
            config,
            indexer,
            reader,
            search: tokio::sync::Mutex::new(None),
            status: Arc::new(Mutex::new(SearchStatus::Idle)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn indexer(&self) -> &SparseIndexer {
        &self.indexer
    }

    pub fn index_snapshot(&self) -> IndexSnapshot {
        self.indexer.snapshot()
    }

    pub fn search_status(&self) -> SearchStatus {
        *self.status.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start the background index job and return its event stream.
    ///
    /// Returns `None` when indexing is already running or complete. An I/O
    /// failure of the job arrives as the last event, `IndexEvent::Failed`.
    pub fn start_indexing(&self) -> Option<IndexStream> {
        if self.is_closed() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let progress_tx = tx.clone();
        let job = self.indexer.start(
            self.config.stride_lines,
            self.config.index_chunk_bytes,
            move |progress| {
                let _ = progress_tx.send(IndexEvent::Progress(progress));
            },
        )?;

        let path = self.path.clone();
        tokio::spawn(async move {
            let failure = match job.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e,
                Err(e) => JsonlError::other(format!(
                    "index task for {} died: {}",
                    path.display(),
                    e
                )),
            };
            let _ = tx.send(IndexEvent::Failed(failure));
        });
        Some(UnboundedReceiverStream::new(rx))
    }

    /// Start indexing and wait until the job ends.
    ///
    /// `Ok(None)` when there was nothing to start; otherwise the last progress
    /// event, which has `indexed = false` if the job was stopped.
    pub async fn index_to_completion(&self) -> Result<Option<IndexProgress>> {
        let Some(mut stream) = self.start_indexing() else {
            return Ok(None);
        };
        let mut last = None;
        while let Some(event) = stream.next().await {
            match event {
                IndexEvent::Progress(progress) => last = Some(progress),
                IndexEvent::Failed(e) => return Err(e),
            }
        }
        Ok(last)
    }

    pub async fn read_page(&self, page_number: u64, page_size: u64) -> Result<Page> {
        self.ensure_open()?;
        self.reader.read_page(page_number, page_size).await
    }

    pub async fn read_line(&self, line_number: u64) -> Result<Option<Record>> {
        self.ensure_open()?;
        self.reader.read_line(line_number).await
    }

    /// Page containing `line_number`; a `page_size` of 0 selects the default
    pub fn page_for_line(&self, line_number: u64, page_size: u64) -> Result<u64> {
        let page_size = self.config.resolve_page_size(page_size)?;
        Ok(page_for_line(line_number, page_size))
    }

    /// Start a search, cancelling and awaiting any search already running.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchStream> {
        self.ensure_open()?;

        let mut slot = self.search.lock().await;
        if let Some(previous) = slot.take() {
            previous.token.cancel();
            if let Err(e) = previous.handle.await {
                log::warn!("previous search task for {} died: {}", self.path.display(), e);
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let engine = self.engine.clone();
        let path = self.path.clone();
        let status = Arc::clone(&self.status);
        let task_token = token.clone();

        *status.lock() = SearchStatus::Running;
        let handle = tokio::spawn(async move {
            let outcome = engine
                .search(&path, &query, &task_token, |progress| {
                    let _ = tx.send(SearchEvent::Progress(progress));
                })
                .await;
            let event = match outcome {
                Ok(result) => {
                    *status.lock() = if result.cancelled {
                        SearchStatus::Cancelled
                    } else {
                        SearchStatus::Completed
                    };
                    SearchEvent::Finished(result)
                }
                Err(e) => {
                    *status.lock() = SearchStatus::Failed;
                    SearchEvent::Failed(e)
                }
            };
            let _ = tx.send(event);
        });

        *slot = Some(ActiveSearch { token, handle });
        Ok(UnboundedReceiverStream::new(rx))
    }

    /// Run a search and wait for its terminal event
    pub async fn search_to_completion(&self, query: SearchQuery) -> Result<SearchResult> {
        let mut stream = self.search(query).await?;
        while let Some(event) = stream.next().await {
            match event {
                SearchEvent::Progress(_) => {}
                SearchEvent::Finished(result) => return Ok(result),
                SearchEvent::Failed(e) => return Err(e),
            }
        }
        Err(JsonlError::search("search task ended without a result"))
    }

    /// Signal the running search, if any, to stop at its next polling point
    pub async fn cancel_search(&self) {
        if let Some(active) = self.search.lock().await.as_ref() {
            active.token.cancel();
        }
    }

    /// Stop indexing, cancel and await the running search, and reject further requests
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.indexer.stop();
        if let Some(active) = self.search.lock().await.take() {
            active.token.cancel();
            let _ = active.handle.await;
        }
        log::debug!("closed session for {}", self.path.display());
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(JsonlError::SessionClosed {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

/// Path-keyed collection of open sessions
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    config: EngineConfig,
    sessions: Arc<Mutex<HashMap<PathBuf, Arc<FileSession>>>>,
}

impl SessionManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open a session for `path` and start indexing it.
    ///
    /// Opening a path that already has a session returns the existing session
    /// and no index stream.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<(Arc<FileSession>, Option<IndexStream>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(existing) = self.sessions.lock().get(&path) {
            return Ok((Arc::clone(existing), None));
        }

        // Validation touches the file system; keep it outside the lock
        let fresh = Arc::new(FileSession::open(&path, self.config.clone())?);
        let session = match self.sessions.lock().entry(path) {
            Entry::Occupied(entry) => return Ok((Arc::clone(entry.get()), None)),
            Entry::Vacant(entry) => Arc::clone(entry.insert(fresh)),
        };

        log::info!("opened session for {}", session.path().display());
        let stream = session.start_indexing();
        Ok((session, stream))
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<FileSession>> {
        let path = path.as_ref();
        self.sessions
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| JsonlError::SessionClosed {
                path: path.to_path_buf(),
            })
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.sessions.lock().keys().cloned().collect()
    }

    /// Start indexing for an open session; `None` when it already ran or is running
    pub fn start_indexing(&self, path: impl AsRef<Path>) -> Result<Option<IndexStream>> {
        Ok(self.get(path)?.start_indexing())
    }

    /// Page containing `line_number`; a `page_size` of 0 selects the default
    pub fn page_for_line(&self, line_number: u64, page_size: u64) -> Result<u64> {
        let page_size = self.config.resolve_page_size(page_size)?;
        Ok(page_for_line(line_number, page_size))
    }

    pub async fn read_page(&self, path: impl AsRef<Path>, page: u64, page_size: u64) -> Result<Page> {
        self.get(path)?.read_page(page, page_size).await
    }

    pub async fn read_line(&self, path: impl AsRef<Path>, line_number: u64) -> Result<Option<Record>> {
        self.get(path)?.read_line(line_number).await
    }

    pub async fn search(&self, path: impl AsRef<Path>, query: SearchQuery) -> Result<SearchStream> {
        self.get(path)?.search(query).await
    }

    pub async fn cancel_search(&self, path: impl AsRef<Path>) -> Result<()> {
        self.get(path)?.cancel_search().await;
        Ok(())
    }

    /// Release the session for `path`; returns whether one was open
    pub async fn close_session(&self, path: impl AsRef<Path>) -> bool {
        let removed = self.sessions.lock().remove(path.as_ref());
        match removed {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }
}
