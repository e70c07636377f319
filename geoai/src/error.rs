//! Crate-level error type.
//!
//! Every component has its own error enum. [`GeoAiError`] wraps them at the
//! pipeline boundary and classifies each failure with a machine-readable
//! [`ErrorKind`], which is what crosses the worker message boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigFileError;
use crate::inference::InferenceError;
use crate::mosaic::MosaicError;
use crate::pipeline::WeightCacheError;
use crate::provider::ProviderError;
use crate::raster::RasterError;
use crate::tile::TilePlanError;
use crate::worker::WorkerError;

/// Result type for pipeline operations.
pub type GeoAiResult<T> = Result<T, GeoAiError>;

/// Machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MaximumTileCountExceeded,
    UnknownTask,
    MissingInputField,
    ProviderInitialization,
    ModelInitialization,
    InvalidGeometry,
    TileFetch,
    ImageDecode,
    Inference,
    Timeout,
    WorkerFault,
    Configuration,
    InvalidInput,
}

/// Errors surfaced to pipeline callers.
#[derive(Debug)]
pub enum GeoAiError {
    /// Tile planning rejected the request.
    TilePlan(TilePlanError),

    /// Tile download or mosaic composition failed.
    Mosaic(MosaicError),

    /// Raster manipulation failed.
    Raster(RasterError),

    /// Task lookup, model loading, the session or output decoding failed.
    Inference(InferenceError),

    /// The provider configuration could not be turned into a provider.
    ProviderInitialization(ProviderError),

    /// Model weights could not be obtained.
    WeightCache(WeightCacheError),

    /// A required request field is absent.
    MissingInputField(String),

    /// The request geometry has the wrong type or shape.
    InvalidGeometry(String),

    /// Any other malformed request.
    InvalidInput(String),

    /// Configuration file error.
    Config(ConfigFileError),

    /// Cross-boundary call failure.
    Worker(WorkerError),

    /// An error shared between callers that joined one initialisation.
    Shared(Arc<GeoAiError>),
}

impl GeoAiError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoAiError::TilePlan(TilePlanError::MaximumTileCountExceeded { .. }) => {
                ErrorKind::MaximumTileCountExceeded
            }
            GeoAiError::TilePlan(_) | GeoAiError::Raster(_) | GeoAiError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            GeoAiError::Mosaic(MosaicError::TileFetch { .. } | MosaicError::Task(_)) => {
                ErrorKind::TileFetch
            }
            GeoAiError::Mosaic(_) => ErrorKind::ImageDecode,
            GeoAiError::Inference(InferenceError::UnknownTask(_)) => ErrorKind::UnknownTask,
            GeoAiError::Inference(InferenceError::ModelLoad(_)) | GeoAiError::WeightCache(_) => {
                ErrorKind::ModelInitialization
            }
            GeoAiError::Inference(_) => ErrorKind::Inference,
            GeoAiError::ProviderInitialization(_) => ErrorKind::ProviderInitialization,
            GeoAiError::MissingInputField(_) => ErrorKind::MissingInputField,
            GeoAiError::InvalidGeometry(_) => ErrorKind::InvalidGeometry,
            GeoAiError::Config(_) => ErrorKind::Configuration,
            GeoAiError::Worker(e) => e.kind(),
            GeoAiError::Shared(inner) => inner.kind(),
        }
    }

    /// Serialisable form for the worker `error` response.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl fmt::Display for GeoAiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoAiError::TilePlan(e) => write!(f, "Tile planning failed: {}", e),
            GeoAiError::Mosaic(e) => write!(f, "Mosaic acquisition failed: {}", e),
            GeoAiError::Raster(e) => write!(f, "Raster error: {}", e),
            GeoAiError::Inference(e) => write!(f, "Inference error: {}", e),
            GeoAiError::ProviderInitialization(e) => {
                write!(f, "Provider initialization failed: {}", e)
            }
            GeoAiError::WeightCache(e) => write!(f, "Model weights unavailable: {}", e),
            GeoAiError::MissingInputField(field) => {
                write!(f, "Missing required input field: {}", field)
            }
            GeoAiError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            GeoAiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            GeoAiError::Config(e) => write!(f, "Configuration error: {}", e),
            GeoAiError::Worker(e) => write!(f, "{}", e),
            GeoAiError::Shared(inner) => write!(f, "{}", inner),
        }
    }
}

impl std::error::Error for GeoAiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoAiError::TilePlan(e) => Some(e),
            GeoAiError::Mosaic(e) => Some(e),
            GeoAiError::Raster(e) => Some(e),
            GeoAiError::Inference(e) => Some(e),
            GeoAiError::ProviderInitialization(e) => Some(e),
            GeoAiError::WeightCache(e) => Some(e),
            GeoAiError::Config(e) => Some(e),
            GeoAiError::Worker(e) => Some(e),
            GeoAiError::Shared(inner) => inner.source(),
            GeoAiError::MissingInputField(_)
            | GeoAiError::InvalidGeometry(_)
            | GeoAiError::InvalidInput(_) => None,
        }
    }
}

impl From<TilePlanError> for GeoAiError {
    fn from(e: TilePlanError) -> Self {
        GeoAiError::TilePlan(e)
    }
}

impl From<MosaicError> for GeoAiError {
    fn from(e: MosaicError) -> Self {
        GeoAiError::Mosaic(e)
    }
}

impl From<RasterError> for GeoAiError {
    fn from(e: RasterError) -> Self {
        GeoAiError::Raster(e)
    }
}

impl From<InferenceError> for GeoAiError {
    fn from(e: InferenceError) -> Self {
        GeoAiError::Inference(e)
    }
}

impl From<WeightCacheError> for GeoAiError {
    fn from(e: WeightCacheError) -> Self {
        GeoAiError::WeightCache(e)
    }
}

impl From<ConfigFileError> for GeoAiError {
    fn from(e: ConfigFileError) -> Self {
        GeoAiError::Config(e)
    }
}

impl From<WorkerError> for GeoAiError {
    fn from(e: WorkerError) -> Self {
        GeoAiError::Worker(e)
    }
}

impl From<Arc<GeoAiError>> for GeoAiError {
    fn from(e: Arc<GeoAiError>) -> Self {
        GeoAiError::Shared(e)
    }
}

/// Error as carried in a worker `error` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
