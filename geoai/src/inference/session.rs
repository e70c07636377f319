//! Inference collaborators.
//!
//! The neural-network runtime is outside this crate. A [`ModelLoader`] turns
//! weight bytes into an [`InferenceSession`]; a session maps one input
//! tensor to the model's raw output tensors.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::{InferenceError, TaskSpec, Tensor};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A loaded model.
///
/// Sessions are shared by every caller of a pipeline instance. Concurrent
/// `run` calls on one session are the implementation's concern.
pub trait InferenceSession: Send + Sync {
    /// Runs the model on an NCHW input tensor.
    fn run(&self, input: Tensor) -> BoxFuture<'_, Result<Vec<Tensor>, InferenceError>>;
}

/// Builds sessions from downloaded weights.
pub trait ModelLoader: Send + Sync {
    /// Loads the model described by `spec`.
    ///
    /// # Arguments
    ///
    /// * `spec` - Task description, including input size and labels
    /// * `params` - Caller-supplied model parameters from the pipeline signature
    /// * `weights` - Raw weight bytes from the weight cache
    fn load<'a>(
        &'a self,
        spec: &'a TaskSpec,
        params: &'a serde_json::Value,
        weights: Arc<Vec<u8>>,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceSession>, InferenceError>>;
}
