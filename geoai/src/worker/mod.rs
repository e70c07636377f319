//! Message-passing boundary for running pipelines off the caller's task.
//!
//! A [`WorkerHost`] owns the registry and answers [`WorkerRequest`]s; a
//! [`WorkerClient`] correlates responses by id, applies a per-call timeout
//! and rejects outstanding calls if the host goes away. Only messages cross
//! the boundary.

mod client;
mod host;
mod messages;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, ErrorPayload};
use crate::pipeline::PipelineRegistry;
use crate::provider::AsyncHttpClient;

pub use client::WorkerClient;
pub use host::WorkerHost;
pub use messages::{CallId, InitComplete, WorkerRequest, WorkerResponse};

/// Default per-call timeout in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;

/// Default request channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Errors raised on the caller side of the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    /// No response arrived in time.
    #[error("Worker call {id} timed out after {after:?}")]
    Timeout { id: CallId, after: Duration },

    /// The worker went away with the call outstanding.
    #[error("Worker fault: {0}")]
    Fault(String),

    /// The worker answered with an error.
    #[error("{}", .0.message)]
    Remote(ErrorPayload),

    /// The worker answered with the wrong response type.
    #[error("Unexpected {response} response to worker call {id}")]
    UnexpectedResponse { id: CallId, response: String },
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Timeout { .. } => ErrorKind::Timeout,
            WorkerError::Fault(_) | WorkerError::UnexpectedResponse { .. } => ErrorKind::WorkerFault,
            WorkerError::Remote(payload) => payload.kind,
        }
    }
}

/// A running worker task.
pub struct WorkerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals shutdown and waits for the host loop to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a host serving `registry` and returns a client connected to it.
pub fn spawn_worker<C>(
    registry: Arc<PipelineRegistry<C>>,
    channel_capacity: usize,
    call_timeout: Duration,
) -> (WorkerClient, WorkerHandle)
where
    C: AsyncHttpClient + Clone + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(channel_capacity.max(1));
    let (response_tx, response_rx) = mpsc::channel(channel_capacity.max(1));
    let shutdown = CancellationToken::new();

    let host = WorkerHost::new(registry);
    let task = tokio::spawn(host.run(request_rx, response_tx, shutdown.clone()));
    let client = WorkerClient::new(request_tx, response_rx, call_timeout);

    (client, WorkerHandle { shutdown, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineSignature;
    use crate::provider::ProviderConfig;

    fn signature() -> PipelineSignature {
        PipelineSignature::new(ProviderConfig::esri_world_imagery(), "object-detection")
    }

    #[tokio::test]
    async fn test_call_times_out_when_worker_is_silent() {
        let (request_tx, mut request_rx) = mpsc::channel(4);
        let (_response_tx, response_rx) = mpsc::channel(4);
        let client = WorkerClient::new(request_tx, response_rx, Duration::from_millis(50));

        let err = client.init(signature()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(client.pending_calls(), 0);
        // The request did reach the worker side
        assert!(request_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_full_request_channel_still_times_out() {
        // Capacity one and nobody draining: the second send never completes
        let (request_tx, _request_rx) = mpsc::channel(1);
        let (_response_tx, response_rx) = mpsc::channel(1);
        let client = WorkerClient::new(request_tx, response_rx, Duration::from_millis(50));

        let first = client.init(signature()).await.unwrap_err();
        assert!(matches!(first, WorkerError::Timeout { .. }));

        let second = tokio::time::timeout(Duration::from_secs(2), client.init(signature()))
            .await
            .expect("call blocked past its own timeout")
            .unwrap_err();
        assert!(matches!(second, WorkerError::Timeout { id: 2, .. }));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_releases_its_slot() {
        let (request_tx, mut request_rx) = mpsc::channel(4);
        let (_response_tx, response_rx) = mpsc::channel(4);
        let client = WorkerClient::new(request_tx, response_rx, Duration::from_secs(60));

        let abandoned = tokio::time::timeout(Duration::from_millis(20), client.init(signature())).await;
        assert!(abandoned.is_err());
        assert!(request_rx.try_recv().is_ok());
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_fault_rejects_every_outstanding_call() {
        let (request_tx, mut request_rx) = mpsc::channel(4);
        let (response_tx, response_rx) = mpsc::channel(4);
        let client = Arc::new(WorkerClient::new(
            request_tx,
            response_rx,
            Duration::from_secs(60),
        ));

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.init(signature()).await })
            })
            .collect();

        for _ in 0..3 {
            request_rx.recv().await.unwrap();
        }
        drop(response_tx);

        for call in calls {
            let err = call.await.unwrap().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::WorkerFault);
        }
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_responses_routed_by_id() {
        let (request_tx, mut request_rx) = mpsc::channel(4);
        let (response_tx, response_rx) = mpsc::channel(4);
        let client = Arc::new(WorkerClient::new(request_tx, response_rx, Duration::from_secs(5)));

        let first = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.init(signature()).await }
        });
        let id_a = request_rx.recv().await.unwrap().id();
        let second = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.init(signature()).await }
        });
        let id_b = request_rx.recv().await.unwrap().id();
        assert_ne!(id_a, id_b);

        // Answer out of order
        for (id, model) in [(id_b, "second"), (id_a, "first")] {
            response_tx
                .send(WorkerResponse::InitComplete {
                    id,
                    payload: InitComplete {
                        model_id: model.to_string(),
                        provider: "esri".to_string(),
                    },
                })
                .await
                .unwrap();
        }

        assert_eq!(first.await.unwrap().unwrap().model_id, "first");
        assert_eq!(second.await.unwrap().unwrap().model_id, "second");
    }

    #[tokio::test]
    async fn test_remote_error_keeps_kind() {
        let (request_tx, mut request_rx) = mpsc::channel(4);
        let (response_tx, response_rx) = mpsc::channel(4);
        let client = WorkerClient::new(request_tx, response_rx, Duration::from_secs(5));

        tokio::spawn(async move {
            let request = request_rx.recv().await.unwrap();
            let _ = response_tx
                .send(WorkerResponse::Error {
                    id: request.id(),
                    payload: ErrorPayload {
                        kind: ErrorKind::UnknownTask,
                        message: "unknown task: nope".to_string(),
                    },
                })
                .await;
        });

        let err = client.init(signature()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTask);
        assert_eq!(err.to_string(), "unknown task: nope");
    }

    #[tokio::test]
    async fn test_closed_worker_fails_fast() {
        let (request_tx, request_rx) = mpsc::channel(4);
        let (_response_tx, response_rx) = mpsc::channel(4);
        drop(request_rx);
        let client = WorkerClient::new(request_tx, response_rx, Duration::from_secs(60));

        let err = client.init(signature()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Fault(_)));
        assert_eq!(client.pending_calls(), 0);
    }
}
