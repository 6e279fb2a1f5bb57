use crate::error::Result;
use crate::protocol::{RequestId, SessionCommand, SessionResponse};
use crate::session::{FileSession, IndexEvent, SearchEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;

/// Run the session worker processing commands from the host.
///
/// Page and line reads are answered in order. Index and search events are
/// forwarded from background tasks as they arrive, tagged with the id of the
/// command that started them.
pub async fn session_worker_loop(
    mut rx: Receiver<SessionCommand>,
    tx: Sender<SessionResponse>,
    session: Arc<FileSession>,
) {
    let mut state = WorkerState::new(session, tx.clone());

    while let Some(cmd) = rx.recv().await {
        let outcome = state.handle_command(cmd).await;
        if let Some(response) = outcome.response {
            if tx.send(response).await.is_err() {
                break;
            }
        }

        if outcome.done {
            break;
        }
    }

    state.shutdown().await;
}

struct WorkerState {
    session: Arc<FileSession>,
    tx: Sender<SessionResponse>,
    forwarders: Vec<JoinHandle<()>>,
}

impl WorkerState {
    fn new(session: Arc<FileSession>, tx: Sender<SessionResponse>) -> Self {
        Self {
            session,
            tx,
            forwarders: Vec::new(),
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> HandlerOutcome {
        self.forwarders.retain(|handle| !handle.is_finished());

        match cmd {
            SessionCommand::StartIndexing { request_id } => self.start_indexing(request_id),
            SessionCommand::ReadPage {
                request_id,
                page_number,
                page_size,
            } => HandlerOutcome::from_result(
                request_id,
                self.session
                    .read_page(page_number, page_size)
                    .await
                    .map(|page| SessionResponse::PageLoaded { request_id, page }),
            ),
            SessionCommand::ReadLine {
                request_id,
                line_number,
            } => HandlerOutcome::from_result(
                request_id,
                self.session
                    .read_line(line_number)
                    .await
                    .map(|record| SessionResponse::LineLoaded { request_id, record }),
            ),
            SessionCommand::PageForLine {
                request_id,
                line_number,
                page_size,
            } => HandlerOutcome::from_result(
                request_id,
                self.session
                    .page_for_line(line_number, page_size)
                    .map(|page_number| SessionResponse::PageForLine {
                        request_id,
                        page_number,
                    }),
            ),
            SessionCommand::Search { request_id, query } => {
                match self.session.search(query).await {
                    Ok(stream) => {
                        let tx = self.tx.clone();
                        self.forwarders.push(tokio::spawn(async move {
                            let mut stream = stream.map(|event| match event {
                                SearchEvent::Progress(progress) => {
                                    SessionResponse::SearchProgress {
                                        request_id,
                                        progress,
                                    }
                                }
                                SearchEvent::Finished(result) => {
                                    SessionResponse::SearchFinished { request_id, result }
                                }
                                SearchEvent::Failed(error) => {
                                    SessionResponse::Error { request_id, error }
                                }
                            });
                            while let Some(response) = stream.next().await {
                                if tx.send(response).await.is_err() {
                                    break;
                                }
                            }
                        }));
                        HandlerOutcome::continue_without_response()
                    }
                    Err(error) => HandlerOutcome::respond(SessionResponse::Error { request_id, error }),
                }
            }
            SessionCommand::CancelSearch => {
                self.session.cancel_search().await;
                HandlerOutcome::continue_without_response()
            }
            SessionCommand::Shutdown => HandlerOutcome::exit(),
        }
    }

    fn start_indexing(&mut self, request_id: RequestId) -> HandlerOutcome {
        let Some(mut stream) = self.session.start_indexing() else {
            return HandlerOutcome::respond(SessionResponse::IndexStatus {
                request_id,
                snapshot: self.session.index_snapshot(),
            });
        };

        let tx = self.tx.clone();
        self.forwarders.push(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let response = match event {
                    IndexEvent::Progress(progress) => SessionResponse::IndexProgress {
                        request_id,
                        progress,
                    },
                    IndexEvent::Failed(error) => SessionResponse::Error { request_id, error },
                };
                if tx.send(response).await.is_err() {
                    break;
                }
            }
        }));
        HandlerOutcome::continue_without_response()
    }

    async fn shutdown(self) {
        self.session.cancel_search().await;
        for handle in self.forwarders {
            handle.abort();
        }
    }
}

struct HandlerOutcome {
    response: Option<SessionResponse>,
    done: bool,
}

impl HandlerOutcome {
    fn respond(response: SessionResponse) -> Self {
        Self {
            response: Some(response),
            done: false,
        }
    }

    fn from_result(request_id: RequestId, result: Result<SessionResponse>) -> Self {
        match result {
            Ok(response) => Self::respond(response),
            Err(error) => Self::respond(SessionResponse::Error { request_id, error }),
        }
    }

    fn continue_without_response() -> Self {
        Self {
            response: None,
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            response: None,
            done: true,
        }
    }
}
