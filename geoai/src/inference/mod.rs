//! Model tasks, tensors and output decoding.
//!
//! The crate does not run neural networks itself. It prepares input tensors
//! from a [`GeoRawImage`](crate::raster::GeoRawImage), hands them to an
//! [`InferenceSession`] and decodes the raw outputs into GeoJSON according
//! to the task's [`TaskKind`].

mod decode;
mod session;
mod task;
mod tensor;
mod types;

pub use decode::{decode_box_rows, decode_output, postprocess_detections, prepare_input};
pub use session::{BoxFuture, InferenceSession, ModelLoader};
pub use task::{TaskCatalog, TaskKind, TaskSpec, DEFAULT_MODELS_BASE_URL};
pub use tensor::Tensor;
pub use types::{
    Detections, InferenceError, InferenceInputs, InferenceRequest, InferenceResponse,
    PostProcessingParams, ResolvedPostProcessing,
};
