//! Worker side of the message protocol.
//!
//! The host owns a pipeline registry and serves requests from a channel,
//! one at a time, until the request channel closes or shutdown is
//! signalled. State never crosses the boundary except as messages.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::GeoAiError;
use crate::pipeline::{PipelineInstance, PipelineRegistry};
use crate::provider::AsyncHttpClient;

use super::messages::{InitComplete, WorkerRequest, WorkerResponse};

/// Serves [`WorkerRequest`]s against a registry.
pub struct WorkerHost<C> {
    registry: Arc<PipelineRegistry<C>>,
    active: Option<Arc<PipelineInstance<C>>>,
}

impl<C> WorkerHost<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    pub fn new(registry: Arc<PipelineRegistry<C>>) -> Self {
        Self {
            registry,
            active: None,
        }
    }

    /// Runs until shutdown, the request channel closes, or the caller stops
    /// listening for responses.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<WorkerRequest>,
        responses: mpsc::Sender<WorkerResponse>,
        shutdown: CancellationToken,
    ) {
        info!("Worker host starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Worker host shutting down");
                    break;
                }

                request = requests.recv() => {
                    let Some(request) = request else {
                        debug!("Worker request channel closed");
                        break;
                    };
                    let response = self.handle(request).await;
                    if responses.send(response).await.is_err() {
                        warn!("Worker response channel closed, stopping");
                        break;
                    }
                }
            }
        }

        info!("Worker host stopped");
    }

    /// Handles one request. Failures become `error` responses.
    pub async fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        let id = request.id();
        let started = Instant::now();

        let result = match request {
            WorkerRequest::Init { payload, .. } => self
                .registry
                .get(&payload)
                .await
                .map(|instance| {
                    let complete = InitComplete {
                        model_id: instance.spec().model_id.clone(),
                        provider: instance.provider().name().to_string(),
                    };
                    self.active = Some(instance);
                    WorkerResponse::InitComplete {
                        id,
                        payload: complete,
                    }
                }),
            WorkerRequest::Inference { payload, .. } => match &self.active {
                Some(instance) => instance.run(&payload).await.map(|response| {
                    WorkerResponse::InferenceComplete {
                        id,
                        payload: Box::new(response),
                    }
                }),
                None => Err(GeoAiError::InvalidInput(
                    "inference requested before init".to_string(),
                )),
            },
        };

        let response = result.unwrap_or_else(|e| {
            warn!(id = id, kind = ?e.kind(), error = %e, "Worker call failed");
            WorkerResponse::Error {
                id,
                payload: e.to_payload(),
            }
        });

        debug!(
            id = id,
            response = response.type_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Worker call handled"
        );
        response
    }
}
