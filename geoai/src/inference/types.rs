//! Request, response and error types for inference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geojson::{Feature, FeatureCollection};
use crate::geometry::GeometryError;
use crate::provider::MapSourceParams;
use crate::raster::{GeoRawImage, RasterError};

/// Errors raised by decoding or by the inference collaborators.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// No task is registered under this model id.
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// A tensor has the wrong shape or length.
    #[error("invalid tensor: {0}")]
    InvalidTensor(String),

    /// The model could not be loaded.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The session failed while running.
    #[error("inference session failed: {0}")]
    Session(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Optional post-processing overrides; unset fields fall back to the task's
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessingParams {
    /// Minimum score, or mask probability, to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    /// Overlap above which two detections are duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_threshold: Option<f64>,
    /// Maximum detections returned, highest score first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Maximum masks vectorised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_masks: Option<usize>,
    /// Minimum area in raster pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    /// Sort by score before suppression instead of the greedy input-order pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_score: Option<bool>,
}

impl PostProcessingParams {
    /// Fills unset fields from `defaults`, then from built-in values.
    pub fn resolve(&self, defaults: &PostProcessingParams) -> ResolvedPostProcessing {
        ResolvedPostProcessing {
            threshold: self.threshold.or(defaults.threshold).unwrap_or(0.5),
            iou_threshold: self.iou_threshold.or(defaults.iou_threshold).unwrap_or(0.5),
            top_k: self.top_k.or(defaults.top_k),
            max_masks: self.max_masks.or(defaults.max_masks).unwrap_or(1),
            min_area: self.min_area.or(defaults.min_area).unwrap_or(0.0),
            sort_by_score: self.sort_by_score.or(defaults.sort_by_score).unwrap_or(false),
        }
    }
}

/// Post-processing settings with every value decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPostProcessing {
    pub threshold: f32,
    pub iou_threshold: f64,
    pub top_k: Option<usize>,
    pub max_masks: usize,
    pub min_area: f64,
    pub sort_by_score: bool,
}

/// Request inputs: the area of interest plus task-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceInputs {
    /// Area of interest; must be a `Polygon` feature
    #[serde(default)]
    pub polygon: Option<Feature>,
    /// Task-specific fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One inference call against a pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub inputs: InferenceInputs,
    #[serde(default)]
    pub map_source_params: Option<MapSourceParams>,
    #[serde(default)]
    pub post_processing_params: Option<PostProcessingParams>,
}

impl InferenceRequest {
    /// Request for an area with default parameters.
    pub fn for_polygon(polygon: Feature) -> Self {
        Self {
            inputs: InferenceInputs {
                polygon: Some(polygon),
                extra: Map::new(),
            },
            ..Default::default()
        }
    }
}

/// Detections in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Detections {
    /// One collection for single-output tasks
    Single(FeatureCollection),
    /// One collection per class for land-cover style output
    PerClass(Vec<FeatureCollection>),
}

impl Detections {
    /// Total number of features across collections.
    pub fn feature_count(&self) -> usize {
        match self {
            Detections::Single(fc) => fc.len(),
            Detections::PerClass(classes) => classes.iter().map(FeatureCollection::len).sum(),
        }
    }
}

/// Result of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub detections: Detections,
    pub geo_raw_image: GeoRawImage,
}
