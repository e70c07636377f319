//! Shared fixtures for integration tests: a scripted HTTP client and a
//! model loader handing out fixed outputs.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geoai::coord::GeoBoundingBox;
use geoai::geojson::Feature;
use geoai::inference::{
    BoxFuture, InferenceError, InferenceSession, ModelLoader, TaskCatalog, TaskSpec, Tensor,
    DEFAULT_MODELS_BASE_URL,
};
use geoai::pipeline::{PipelineRegistry, PipelineSignature, WeightCache};
use geoai::provider::{AsyncHttpClient, ProviderConfig, ProviderError};
use geoai::tile::TilePlanner;
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

pub const TILE_SIZE: u32 = 8;

/// Serves weights for `.onnx` URLs and a grey PNG tile for everything else.
#[derive(Clone, Default)]
pub struct TileServer {
    tile_requests: Arc<AtomicUsize>,
    weight_requests: Arc<AtomicUsize>,
}

impl TileServer {
    pub fn tile_requests(&self) -> usize {
        self.tile_requests.load(Ordering::SeqCst)
    }

    pub fn weight_requests(&self) -> usize {
        self.weight_requests.load(Ordering::SeqCst)
    }
}

impl AsyncHttpClient for TileServer {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        if url.ends_with(".onnx") {
            self.weight_requests.fetch_add(1, Ordering::SeqCst);
            return Ok(vec![0x42; 64]);
        }
        self.tile_requests.fetch_add(1, Ordering::SeqCst);
        let tile = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgb([120, 120, 120]));
        let mut bytes = Vec::new();
        tile.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;
        Ok(bytes)
    }
}

struct FixedSession {
    outputs: Vec<Tensor>,
}

impl InferenceSession for FixedSession {
    fn run(&self, _input: Tensor) -> BoxFuture<'_, Result<Vec<Tensor>, InferenceError>> {
        let outputs = self.outputs.clone();
        Box::pin(async move { Ok(outputs) })
    }
}

/// Counts loads and returns sessions producing `outputs`.
pub struct FixedLoader {
    outputs: Vec<Tensor>,
    delay: Duration,
    loads: AtomicUsize,
}

impl FixedLoader {
    pub fn new(outputs: Vec<Tensor>) -> Self {
        Self {
            outputs,
            delay: Duration::from_millis(25),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for FixedLoader {
    fn load<'a>(
        &'a self,
        _spec: &'a TaskSpec,
        _params: &'a serde_json::Value,
        _weights: Arc<Vec<u8>>,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceSession>, InferenceError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let session: Arc<dyn InferenceSession> = Arc::new(FixedSession {
                outputs: self.outputs.clone(),
            });
            Ok(session)
        })
    }
}

pub fn registry(
    dir: &TempDir,
    server: &TileServer,
    loader: Arc<FixedLoader>,
) -> PipelineRegistry<TileServer> {
    let weights = Arc::new(WeightCache::new(dir.path(), 1 << 20, server.clone()));
    PipelineRegistry::new(
        TaskCatalog::builtin(DEFAULT_MODELS_BASE_URL),
        weights,
        loader,
        server.clone(),
        TilePlanner::default(),
    )
}

pub fn tms() -> ProviderConfig {
    ProviderConfig::Tms {
        base_url: "https://tiles.test".to_string(),
        extension: "png".to_string(),
        api_key: None,
    }
}

pub fn detection_signature() -> PipelineSignature {
    PipelineSignature::new(tms(), "object-detection")
}

/// A few city blocks in lower Manhattan.
pub fn small_area() -> Feature {
    Feature::from_bbox(&GeoBoundingBox::new(-74.0060, 40.7120, -74.0040, 40.7135).unwrap())
}

/// Two overlapping boxes and one below the score threshold, in 640x640
/// model pixels.
pub fn box_rows() -> Tensor {
    Tensor::new(
        vec![1, 3, 6],
        vec![
            100.0, 100.0, 300.0, 300.0, 0.9, 0.0, //
            110.0, 110.0, 310.0, 310.0, 0.8, 0.0, //
            400.0, 400.0, 500.0, 500.0, 0.1, 2.0,
        ],
    )
    .unwrap()
}
