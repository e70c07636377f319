//! Caller side of the message protocol.
//!
//! Each call registers a one-shot slot under a fresh id in the pending
//! table, sends the request and waits for the matching response. A call
//! settles exactly once: with its response, with a timeout, or with a
//! fault when the response channel closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::inference::{InferenceRequest, InferenceResponse};
use crate::pipeline::PipelineSignature;

use super::messages::{CallId, InitComplete, WorkerRequest, WorkerResponse};
use super::WorkerError;

type PendingCalls = Arc<Mutex<HashMap<CallId, oneshot::Sender<WorkerResponse>>>>;

/// Handle for calling a worker over channels.
///
/// Must be created inside a Tokio runtime; it spawns the task that routes
/// responses to their callers.
pub struct WorkerClient {
    requests: mpsc::Sender<WorkerRequest>,
    pending: PendingCalls,
    next_id: AtomicU64,
    call_timeout: Duration,
    router: JoinHandle<()>,
}

impl WorkerClient {
    pub fn new(
        requests: mpsc::Sender<WorkerRequest>,
        responses: mpsc::Receiver<WorkerResponse>,
        call_timeout: Duration,
    ) -> Self {
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let router = tokio::spawn(route_responses(responses, Arc::clone(&pending)));

        Self {
            requests,
            pending,
            next_id: AtomicU64::new(1),
            call_timeout,
            router,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Calls currently waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    /// Selects the pipeline for `signature` on the worker.
    pub async fn init(&self, signature: PipelineSignature) -> Result<InitComplete, WorkerError> {
        match self
            .call(|id| WorkerRequest::Init {
                id,
                payload: signature,
            })
            .await?
        {
            WorkerResponse::InitComplete { payload, .. } => Ok(payload),
            other => Err(unexpected(other)),
        }
    }

    /// Runs inference on the worker's selected pipeline.
    pub async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, WorkerError> {
        match self
            .call(|id| WorkerRequest::Inference {
                id,
                payload: request,
            })
            .await?
        {
            WorkerResponse::InferenceComplete { payload, .. } => Ok(*payload),
            other => Err(unexpected(other)),
        }
    }

    /// Sends one request and waits for its response.
    ///
    /// The timeout covers both the send, which blocks while the request
    /// channel is full, and the wait for the response.
    async fn call(
        &self,
        build: impl FnOnce(CallId) -> WorkerRequest,
    ) -> Result<WorkerResponse, WorkerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        // Clears the slot however this call ends, including when dropped
        let _slot = PendingSlot {
            pending: &self.pending,
            id,
        };

        let exchange = async {
            self.requests
                .send(build(id))
                .await
                .map_err(|_| WorkerError::Fault("worker request channel closed".to_string()))?;
            rx.await.map_err(|_| {
                WorkerError::Fault(format!("worker stopped before answering call {}", id))
            })
        };

        let response = match tokio::time::timeout(self.call_timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    id = id,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Worker call timed out"
                );
                return Err(WorkerError::Timeout {
                    id,
                    after: self.call_timeout,
                });
            }
        };

        match response {
            WorkerResponse::Error { payload, .. } => Err(WorkerError::Remote(payload)),
            other => Ok(other),
        }
    }
}

/// Removes a call's pending entry when dropped.
struct PendingSlot<'a> {
    pending: &'a PendingCalls,
    id: CallId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Delivers responses to waiting callers. When the worker side closes,
/// every outstanding call is rejected by dropping its slot.
async fn route_responses(mut responses: mpsc::Receiver<WorkerResponse>, pending: PendingCalls) {
    while let Some(response) = responses.recv().await {
        let id = response.id();
        match pending.lock().remove(&id) {
            Some(slot) => {
                let _ = slot.send(response);
            }
            None => debug!(id = id, "Dropping response for a call that already settled"),
        }
    }

    let outstanding: Vec<_> = pending.lock().drain().collect();
    if !outstanding.is_empty() {
        warn!(calls = outstanding.len(), "Worker closed, rejecting outstanding calls");
    }
}

fn unexpected(response: WorkerResponse) -> WorkerError {
    WorkerError::UnexpectedResponse {
        id: response.id(),
        response: response.type_name().to_string(),
    }
}
