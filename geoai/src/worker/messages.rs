//! Messages exchanged with a worker.
//!
//! Every request carries a caller-chosen `id`; the response to it echoes
//! that `id`. Both directions serialise as `{"id", "type", "payload"}`.

use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::inference::{InferenceRequest, InferenceResponse};
use crate::pipeline::PipelineSignature;

/// Correlation id chosen by the caller.
pub type CallId = u64;

/// Request sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Select (and build if needed) the pipeline for a signature.
    Init {
        id: CallId,
        payload: PipelineSignature,
    },
    /// Run the selected pipeline.
    Inference {
        id: CallId,
        payload: InferenceRequest,
    },
}

impl WorkerRequest {
    pub fn id(&self) -> CallId {
        match self {
            WorkerRequest::Init { id, .. } | WorkerRequest::Inference { id, .. } => *id,
        }
    }
}

/// Confirmation that a pipeline is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitComplete {
    pub model_id: String,
    pub provider: String,
}

/// Response from a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    InitComplete {
        id: CallId,
        payload: InitComplete,
    },
    InferenceComplete {
        id: CallId,
        payload: Box<InferenceResponse>,
    },
    Error {
        id: CallId,
        payload: ErrorPayload,
    },
}

impl WorkerResponse {
    pub fn id(&self) -> CallId {
        match self {
            WorkerResponse::InitComplete { id, .. }
            | WorkerResponse::InferenceComplete { id, .. }
            | WorkerResponse::Error { id, .. } => *id,
        }
    }

    /// The `type` tag, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            WorkerResponse::InitComplete { .. } => "init_complete",
            WorkerResponse::InferenceComplete { .. } => "inference_complete",
            WorkerResponse::Error { .. } => "error",
        }
    }
}
