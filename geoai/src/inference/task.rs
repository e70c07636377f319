//! Task catalogue.
//!
//! A model id resolves to a [`TaskSpec`]: the data that distinguishes one
//! detection model from another. Pre- and post-processing are shared per
//! [`TaskKind`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{InferenceError, PostProcessingParams};

/// Default host for published model weights.
pub const DEFAULT_MODELS_BASE_URL: &str = "https://huggingface.co/geobase";

/// Output family of a model; selects the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Rows of `[x1, y1, x2, y2, score, class]`
    ObjectDetection,
    /// Rows of `[x1, y1, x2, y2, x3, y3, x4, y4, score, class]`
    OrientedObjectDetection,
    /// Probability masks `[N, H, W]`
    MaskSegmentation,
    /// Class logits `[C, H, W]`
    LandCoverClassification,
}

/// Everything needed to run one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub model_id: String,
    pub task: TaskKind,
    pub weights_url: String,
    /// Zoom used when the request and provider do not choose one
    pub default_zoom: u8,
    pub input_width: u32,
    pub input_height: u32,
    /// Per-channel normalisation; its length is the model's channel count
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    /// Class index to label
    pub labels: Vec<String>,
    #[serde(default)]
    pub defaults: PostProcessingParams,
}

impl TaskSpec {
    /// Label for a class index, falling back to the index itself.
    pub fn label(&self, class: usize) -> String {
        self.labels
            .get(class)
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }
}

/// Registered tasks by model id.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    specs: BTreeMap<String, TaskSpec>,
}

impl TaskCatalog {
    /// An empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue of the published models, with weights under `base_url`.
    pub fn builtin(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let imagenet_mean = vec![0.485, 0.456, 0.406];
        let imagenet_std = vec![0.229, 0.224, 0.225];
        let unit_mean = vec![0.0, 0.0, 0.0];
        let unit_std = vec![1.0, 1.0, 1.0];

        let detection_defaults = PostProcessingParams {
            threshold: Some(0.5),
            iou_threshold: Some(0.5),
            top_k: Some(100),
            ..Default::default()
        };

        let specs = [
            TaskSpec {
                model_id: "object-detection".to_string(),
                task: TaskKind::ObjectDetection,
                weights_url: format!("{}/WALDO30_yolov8m_640x640/resolve/main/model.onnx", base),
                default_zoom: 18,
                input_width: 640,
                input_height: 640,
                mean: unit_mean.clone(),
                std: unit_std.clone(),
                labels: [
                    "LightVehicle",
                    "Person",
                    "Building",
                    "UtilityPole",
                    "Boat",
                    "Bike",
                    "Container",
                    "Truck",
                    "Gastank",
                    "Digger",
                    "Solarpanels",
                    "Bus",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                defaults: detection_defaults.clone(),
            },
            TaskSpec {
                model_id: "oriented-object-detection".to_string(),
                task: TaskKind::OrientedObjectDetection,
                weights_url: format!("{}/gghl-oriented-object-detection/resolve/main/model.onnx", base),
                default_zoom: 20,
                input_width: 800,
                input_height: 800,
                mean: unit_mean.clone(),
                std: unit_std.clone(),
                labels: [
                    "plane",
                    "ship",
                    "storage-tank",
                    "baseball-diamond",
                    "tennis-court",
                    "basketball-court",
                    "ground-track-field",
                    "harbor",
                    "bridge",
                    "large-vehicle",
                    "small-vehicle",
                    "helicopter",
                    "roundabout",
                    "soccer-ball-field",
                    "swimming-pool",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                defaults: PostProcessingParams {
                    threshold: Some(0.5),
                    iou_threshold: Some(0.45),
                    ..Default::default()
                },
            },
            TaskSpec {
                model_id: "building-footprint-segmentation".to_string(),
                task: TaskKind::MaskSegmentation,
                weights_url: format!("{}/building-footprint-segmentation/resolve/main/model.onnx", base),
                default_zoom: 18,
                input_width: 512,
                input_height: 512,
                mean: imagenet_mean.clone(),
                std: imagenet_std.clone(),
                labels: vec!["building".to_string()],
                defaults: PostProcessingParams {
                    threshold: Some(0.5),
                    max_masks: Some(1),
                    min_area: Some(20.0),
                    ..Default::default()
                },
            },
            TaskSpec {
                model_id: "land-cover-classification".to_string(),
                task: TaskKind::LandCoverClassification,
                weights_url: format!("{}/sparsemixseg-landcover/resolve/main/model.onnx", base),
                default_zoom: 15,
                input_width: 256,
                input_height: 256,
                mean: imagenet_mean,
                std: imagenet_std,
                labels: [
                    "bareland",
                    "rangeland",
                    "developed space",
                    "road",
                    "tree",
                    "water",
                    "agriculture land",
                    "buildings",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                defaults: PostProcessingParams::default(),
            },
        ];

        let mut catalog = Self::new();
        for spec in specs {
            catalog.register(spec);
        }
        catalog
    }

    /// Adds or replaces a task.
    pub fn register(&mut self, spec: TaskSpec) {
        self.specs.insert(spec.model_id.clone(), spec);
    }

    /// Looks up a task by model id.
    pub fn get(&self, model_id: &str) -> Result<&TaskSpec, InferenceError> {
        self.specs
            .get(model_id)
            .ok_or_else(|| InferenceError::UnknownTask(model_id.to_string()))
    }

    /// Registered model ids in sorted order.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}
