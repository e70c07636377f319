//! Inference collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::inference::{
    BoxFuture, InferenceError, InferenceSession, ModelLoader, TaskSpec, Tensor,
};

/// Session returning the same outputs for every input.
pub struct StaticSession {
    outputs: Vec<Tensor>,
}

impl StaticSession {
    pub fn new(outputs: Vec<Tensor>) -> Self {
        Self { outputs }
    }
}

impl InferenceSession for StaticSession {
    fn run(&self, _input: Tensor) -> BoxFuture<'_, Result<Vec<Tensor>, InferenceError>> {
        let outputs = self.outputs.clone();
        Box::pin(async move { Ok(outputs) })
    }
}

/// Loader that counts calls and hands out [`StaticSession`]s.
pub struct CountingLoader {
    outputs: Vec<Tensor>,
    delay: Duration,
    fail: bool,
    loads: AtomicUsize,
}

impl CountingLoader {
    pub fn new(outputs: Vec<Tensor>) -> Self {
        Self {
            outputs,
            delay: Duration::from_millis(20),
            fail: false,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for CountingLoader {
    fn load<'a>(
        &'a self,
        _spec: &'a TaskSpec,
        _params: &'a serde_json::Value,
        _weights: Arc<Vec<u8>>,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceSession>, InferenceError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(InferenceError::Session("weights rejected".to_string()));
            }
            let session: Arc<dyn InferenceSession> =
                Arc::new(StaticSession::new(self.outputs.clone()));
            Ok(session)
        })
    }
}
