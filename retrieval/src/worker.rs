//! Task/worker boundary.
//!
//! CPU-heavy index builds, searches, and parses run on a dedicated worker
//! task that communicates with callers exclusively through tagged request
//! and reply messages. Every request carries a correlation id and a
//! deadline; a request whose timer fires is rejected and its correlation
//! entry removed exactly once, so a late worker reply finds nothing to
//! resolve. When the worker task stops, every pending request is rejected
//! and the next request lazily re-creates the worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use aether_indexing::{SearchOptions, SourceFile, TfIdfIndex};
use aether_store::SymbolSpan;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WorkerError;
use crate::knowledge::SyntaxParser;

/// Default deadline for one worker round-trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A request crossing the worker boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Build the lexical index over a corpus.
    IndexBuild { files: Vec<SourceFile> },
    /// Search the previously built lexical index.
    IndexSearch {
        query: String,
        top_k: Option<usize>,
        options: SearchOptions,
    },
    /// Parse content into symbol spans.
    Parse {
        language_id: String,
        content: String,
    },
}

/// A reply crossing the worker boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WorkerReply {
    /// The lexical index was (re)built.
    Built { doc_count: usize },
    /// Lexical search results.
    SearchResults { results: Vec<IndexSearchResult> },
    /// Symbol spans produced by the parser, empty when no parser is
    /// available or parsing failed.
    Parsed { symbols: Vec<SymbolSpan> },
    /// The worker could not serve the request.
    Error { message: String },
}

/// One lexical hit as reported across the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSearchResult {
    pub file_id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub score: f32,
}

struct Envelope {
    id: Uuid,
    request: WorkerRequest,
}

type PendingMap = StdMutex<HashMap<Uuid, oneshot::Sender<WorkerReply>>>;

struct WorkerHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    pending: Arc<PendingMap>,
}

/// Caller-side handle to the worker task.
pub struct WorkerBridge {
    parser: Option<Arc<dyn SyntaxParser>>,
    request_timeout: Duration,
    inner: Arc<Mutex<Option<WorkerHandle>>>,
}

impl WorkerBridge {
    /// Create a bridge. The worker task itself is created lazily on the
    /// first request.
    pub fn new() -> Self {
        Self {
            parser: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach a syntax parser served through `Parse` requests.
    pub fn with_parser(mut self, parser: Arc<dyn SyntaxParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Override the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Send a request and await its reply.
    ///
    /// `timeout` overrides the bridge-wide deadline for this request. An
    /// expired deadline yields [`WorkerError::Timeout`]; a worker that
    /// stopped before replying yields [`WorkerError::Crashed`]; an error
    /// reply yields [`WorkerError::Worker`].
    pub async fn post_request(
        &self,
        request: WorkerRequest,
        timeout: Option<Duration>,
    ) -> Result<WorkerReply, WorkerError> {
        let timeout = timeout.unwrap_or(self.request_timeout);
        let (tx, pending) = self.ensure_worker().await;

        let id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, reply_tx);

        if tx.send(Envelope { id, request }).is_err() {
            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            return Err(WorkerError::Crashed);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(WorkerReply::Error { message })) => Err(WorkerError::Worker(message)),
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped: the worker stopped and the monitor drained
            // the pending map.
            Ok(Err(_)) => Err(WorkerError::Crashed),
            Err(_) => {
                pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                Err(WorkerError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Build the lexical index, returning the chunk count.
    pub async fn index_build(&self, files: Vec<SourceFile>) -> Result<usize, WorkerError> {
        match self
            .post_request(WorkerRequest::IndexBuild { files }, None)
            .await?
        {
            WorkerReply::Built { doc_count } => Ok(doc_count),
            other => Err(WorkerError::Worker(format!("unexpected reply: {other:?}"))),
        }
    }

    /// Search the lexical index.
    pub async fn index_search(
        &self,
        query: &str,
        top_k: Option<usize>,
        options: SearchOptions,
    ) -> Result<Vec<IndexSearchResult>, WorkerError> {
        let request = WorkerRequest::IndexSearch {
            query: query.to_string(),
            top_k,
            options,
        };
        match self.post_request(request, None).await? {
            WorkerReply::SearchResults { results } => Ok(results),
            other => Err(WorkerError::Worker(format!("unexpected reply: {other:?}"))),
        }
    }

    /// Parse content into symbol spans.
    pub async fn parse(
        &self,
        language_id: &str,
        content: &str,
    ) -> Result<Vec<SymbolSpan>, WorkerError> {
        let request = WorkerRequest::Parse {
            language_id: language_id.to_string(),
            content: content.to_string(),
        };
        match self.post_request(request, None).await? {
            WorkerReply::Parsed { symbols } => Ok(symbols),
            other => Err(WorkerError::Worker(format!("unexpected reply: {other:?}"))),
        }
    }

    /// Get or lazily create the worker task. Creation runs under the
    /// handle lock, so concurrent first requests share one worker.
    async fn ensure_worker(&self) -> (mpsc::UnboundedSender<Envelope>, Arc<PendingMap>) {
        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.as_ref() {
            // A closed channel means the worker stopped but the monitor has
            // not cleared the handle yet.
            if !handle.tx.is_closed() {
                return (handle.tx.clone(), Arc::clone(&handle.pending));
            }
        }

        info!("starting indexer worker");
        let (tx, rx) = mpsc::unbounded_channel();
        let pending: Arc<PendingMap> = Arc::new(StdMutex::new(HashMap::new()));

        let worker = tokio::spawn(run_worker(rx, Arc::clone(&pending), self.parser.clone()));

        // The monitor rejects everything in flight when the worker stops
        // and clears the handle so the next request re-creates it.
        let monitor_inner = Arc::clone(&self.inner);
        let monitor_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                warn!("indexer worker stopped abnormally: {e}");
            }
            monitor_pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            *monitor_inner.lock().await = None;
        });

        *guard = Some(WorkerHandle {
            tx: tx.clone(),
            pending: Arc::clone(&pending),
        });
        (tx, pending)
    }
}

impl Default for WorkerBridge {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    pending: Arc<PendingMap>,
    parser: Option<Arc<dyn SyntaxParser>>,
) {
    let mut index: Option<TfIdfIndex> = None;
    while let Some(Envelope { id, request }) = rx.recv().await {
        let reply = handle_request(&mut index, parser.as_ref(), request).await;
        let entry = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match entry {
            Some(reply_tx) => {
                let _ = reply_tx.send(reply);
            }
            // The caller timed out and removed its correlation entry.
            None => debug!(%id, "dropping reply for abandoned request"),
        }
    }
}

async fn handle_request(
    index: &mut Option<TfIdfIndex>,
    parser: Option<&Arc<dyn SyntaxParser>>,
    request: WorkerRequest,
) -> WorkerReply {
    match request {
        WorkerRequest::IndexBuild { files } => {
            let built = TfIdfIndex::build(&files);
            let doc_count = built.doc_count();
            *index = Some(built);
            debug!(doc_count, "lexical index built");
            WorkerReply::Built { doc_count }
        }
        WorkerRequest::IndexSearch {
            query,
            top_k,
            options,
        } => match index {
            None => WorkerReply::Error {
                message: "index not built".to_string(),
            },
            Some(index) => {
                let top_k = top_k.unwrap_or(aether_indexing::DEFAULT_TOP_K);
                let results = index
                    .search(&query, top_k, options)
                    .into_iter()
                    .map(|hit| IndexSearchResult {
                        file_id: hit.doc.file_id,
                        start_line: hit.doc.start_line,
                        end_line: hit.doc.end_line,
                        score: hit.score,
                    })
                    .collect();
                WorkerReply::SearchResults { results }
            }
        },
        WorkerRequest::Parse {
            language_id,
            content,
        } => {
            let symbols = match parser {
                Some(parser) => parser.parse(&language_id, &content).await.unwrap_or_default(),
                None => Vec::new(),
            };
            WorkerReply::Parsed { symbols }
        }
    }
}
