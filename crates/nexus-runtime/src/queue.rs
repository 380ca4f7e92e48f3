//! Background FIFO queue processing.
//!
//! One generic single-worker processor, instantiated twice: the
//! [`QueryQueue`] that serializes user queries, and the [`StatusQueue`]
//! that applies status updates to a UI panel abstraction in order.
//! Sharing the pattern amortizes the correctness reasoning.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{RuntimeError, RuntimeResult};

/// Processes one queue item at a time.
#[async_trait]
pub trait ItemProcessor<T>: Send + Sync {
    /// Handle one item. A returned error is logged; the worker
    /// continues with the next item.
    async fn process(&self, item: T) -> RuntimeResult<()>;
}

struct WorkerState<T> {
    tx: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Generic single-worker FIFO processor.
///
/// Items are processed strictly in enqueue order; one item fully
/// completes before the next begins. `stop()` cancels the worker and
/// waits for the in-flight item to finish — queued items behind it are
/// dropped, never run.
pub struct QueueProcessor<T> {
    name: String,
    processor: Arc<dyn ItemProcessor<T>>,
    state: Mutex<Option<WorkerState<T>>>,
    pending: Arc<AtomicUsize>,
}

impl<T> std::fmt::Debug for QueueProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("name", &self.name)
            .field("queue_size", &self.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> QueueProcessor<T> {
    /// Create a stopped processor.
    #[must_use]
    pub fn new(name: impl Into<String>, processor: Arc<dyn ItemProcessor<T>>) -> Self {
        Self {
            name: name.into(),
            processor,
            state: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start the worker task. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn start(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            debug!(queue = %self.name, "Worker already running");
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let processor = Arc::clone(&self.processor);
        let pending = Arc::clone(&self.pending);
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            loop {
                // Cancellation is only observed between items, so an
                // in-flight item always completes.
                let item = tokio::select! {
                    () = worker_cancel.cancelled() => break,
                    item = rx.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                };

                pending.fetch_sub(1, Ordering::SeqCst);
                if let Err(e) = processor.process(item).await {
                    error!(queue = %name, error = %e, "Item processing failed");
                }
            }
            debug!(queue = %name, "Worker exited");
        });

        info!(queue = %self.name, "Queue worker started");
        *state = Some(WorkerState { tx, cancel, handle });
    }

    /// Stop the worker, waiting for the in-flight item to drain.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn stop(&self) {
        let state = self.state.lock().expect("lock poisoned").take();
        let Some(state) = state else {
            return;
        };

        info!(queue = %self.name, "Stopping queue worker");
        state.cancel.cancel();
        drop(state.tx);
        if state.handle.await.is_err() {
            error!(queue = %self.name, "Worker task panicked");
        }
        self.pending.store(0, Ordering::SeqCst);
    }

    /// Enqueue an item for processing.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when the worker is not
    /// running.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn enqueue(&self, item: T) -> RuntimeResult<()> {
        let state = self.state.lock().expect("lock poisoned");
        let Some(state) = state.as_ref() else {
            return Err(RuntimeError::QueueNotRunning {
                name: self.name.clone(),
            });
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        state.tx.send(item).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            RuntimeError::QueueNotRunning {
                name: self.name.clone(),
            }
        })
    }

    /// Number of items waiting to be processed.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether the worker is running.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }
}

// ---------------------------------------------------------------------
// Query queue
// ---------------------------------------------------------------------

/// A queued user query with its monotonic id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    /// The query text.
    pub query: String,
    /// Monotonic id assigned at enqueue time.
    pub query_id: u64,
}

/// FIFO queue for sequential query processing.
///
/// Queries run strictly in submission order even when their processing
/// times vary wildly.
pub struct QueryQueue {
    processor: QueueProcessor<QueryItem>,
    next_query_id: AtomicU64,
}

impl std::fmt::Debug for QueryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryQueue")
            .field("queue_size", &self.queue_size())
            .finish_non_exhaustive()
    }
}

impl QueryQueue {
    /// Create a query queue over the given processor.
    #[must_use]
    pub fn new(processor: Arc<dyn ItemProcessor<QueryItem>>) -> Self {
        Self {
            processor: QueueProcessor::new("QueryQueue", processor),
            next_query_id: AtomicU64::new(0),
        }
    }

    /// Start the worker.
    pub fn start(&self) {
        self.processor.start();
    }

    /// Stop the worker, draining the in-flight query.
    pub async fn stop(&self) {
        self.processor.stop().await;
    }

    /// Enqueue a query; returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when the queue is
    /// stopped.
    pub fn enqueue(&self, query: impl Into<String>) -> RuntimeResult<u64> {
        let query = query.into();
        let query_id = self.next_query_id.fetch_add(1, Ordering::SeqCst);
        debug!(query_id, query = %query.chars().take(50).collect::<String>(), "Enqueued query");
        self.processor.enqueue(QueryItem { query, query_id })?;
        Ok(query_id)
    }

    /// Number of pending queries.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.processor.queue_size()
    }

    /// Whether the queue is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.processor.is_running()
    }
}

// ---------------------------------------------------------------------
// Status queue
// ---------------------------------------------------------------------

/// A tagged status update destined for the UI panel.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// A tool call started.
    ToolCall {
        /// Tool name.
        name: String,
        /// Tool parameters.
        params: Value,
    },
    /// A tool call finished.
    ToolResult {
        /// Tool name.
        name: String,
        /// Truncated result text.
        result: String,
        /// Whether the call succeeded.
        success: bool,
    },
    /// Informational message.
    Info(String),
    /// Error message.
    Error(String),
    /// Success message.
    Success(String),
    /// Visual divider.
    Divider,
    /// Plan progress snapshot: completed and pending step descriptions.
    PlanProgress {
        /// Completed step descriptions.
        completed: Vec<String>,
        /// Pending step descriptions.
        pending: Vec<String>,
    },
}

/// The UI panel abstraction the status queue drives.
///
/// Updates must be applied in the order received; the queue guarantees
/// that order matches enqueue order.
pub trait StatusSink: Send + Sync {
    /// Apply one update to the panel.
    fn apply(&self, update: StatusUpdate);
}

struct SinkProcessor {
    sink: Arc<dyn StatusSink>,
}

#[async_trait]
impl ItemProcessor<StatusUpdate> for SinkProcessor {
    async fn process(&self, item: StatusUpdate) -> RuntimeResult<()> {
        self.sink.apply(item);
        Ok(())
    }
}

/// Queue of asynchronous status updates for the UI.
pub struct StatusQueue {
    processor: QueueProcessor<StatusUpdate>,
}

impl std::fmt::Debug for StatusQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusQueue")
            .field("queue_size", &self.queue_size())
            .finish_non_exhaustive()
    }
}

impl StatusQueue {
    /// Create a status queue over a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            processor: QueueProcessor::new("StatusQueue", Arc::new(SinkProcessor { sink })),
        }
    }

    /// Start the worker.
    pub fn start(&self) {
        self.processor.start();
    }

    /// Stop the worker.
    pub async fn stop(&self) {
        self.processor.stop().await;
    }

    /// Queue any update.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when stopped.
    pub fn push(&self, update: StatusUpdate) -> RuntimeResult<()> {
        self.processor.enqueue(update)
    }

    /// Queue a tool-call update.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when stopped.
    pub fn add_tool_call(&self, name: impl Into<String>, params: Value) -> RuntimeResult<()> {
        self.push(StatusUpdate::ToolCall {
            name: name.into(),
            params,
        })
    }

    /// Queue a tool-result update.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when stopped.
    pub fn add_tool_result(
        &self,
        name: impl Into<String>,
        result: impl Into<String>,
        success: bool,
    ) -> RuntimeResult<()> {
        self.push(StatusUpdate::ToolResult {
            name: name.into(),
            result: result.into(),
            success,
        })
    }

    /// Queue an info message.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when stopped.
    pub fn add_info_message(&self, message: impl Into<String>) -> RuntimeResult<()> {
        self.push(StatusUpdate::Info(message.into()))
    }

    /// Queue an error message.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::QueueNotRunning`] when stopped.
    pub fn add_error_message(&self, message: impl Into<String>) -> RuntimeResult<()> {
        self.push(StatusUpdate::Error(message.into()))
    }

    /// Number of pending updates.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.processor.queue_size()
    }

    /// Whether the queue is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.processor.is_running()
    }
}
