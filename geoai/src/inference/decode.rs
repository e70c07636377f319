//! Model input preparation and output decoding per task kind.

use tracing::debug;

use super::{
    Detections, InferenceError, ResolvedPostProcessing, TaskKind, TaskSpec, Tensor,
};
use crate::geojson::{Feature, FeatureCollection};
use crate::geometry::{
    contours_to_multipolygon, dedupe, dedupe_by_score, mask_to_polygon, BinaryMask,
    DetectionGeometry,
};
use crate::raster::GeoRawImage;

/// Resizes the raster to the model input and normalises it into a
/// `[1, C, H, W]` tensor.
pub fn prepare_input(image: &GeoRawImage, spec: &TaskSpec) -> Result<Tensor, InferenceError> {
    let resized = image.resize(spec.input_width, spec.input_height)?;
    let data = resized.to_chw_f32(&spec.mean, &spec.std);
    Tensor::new(
        vec![
            1,
            spec.mean.len(),
            spec.input_height as usize,
            spec.input_width as usize,
        ],
        data,
    )
}

/// Decodes raw outputs into world-space features.
///
/// `image` is the raster the model input was resized from; model pixels are
/// scaled back onto it before georeferencing.
pub fn decode_output(
    spec: &TaskSpec,
    outputs: &[Tensor],
    image: &GeoRawImage,
    params: &ResolvedPostProcessing,
) -> Result<Detections, InferenceError> {
    let primary = outputs
        .first()
        .ok_or_else(|| InferenceError::InvalidTensor("model produced no outputs".to_string()))?;
    let sx = image.width() as f64 / spec.input_width as f64;
    let sy = image.height() as f64 / spec.input_height as f64;

    let detections = match spec.task {
        TaskKind::ObjectDetection | TaskKind::OrientedObjectDetection => {
            let raw = decode_box_rows(primary, spec)?;
            let kept = postprocess_detections(raw, params, sx, sy);
            Detections::Single(kept.iter().map(|d| d.to_feature(image)).collect())
        }
        TaskKind::MaskSegmentation => {
            Detections::Single(decode_masks(primary, outputs.get(1), spec, image, params)?)
        }
        TaskKind::LandCoverClassification => {
            Detections::PerClass(decode_class_logits(primary, spec, image)?)
        }
    };

    debug!(
        model = %spec.model_id,
        features = detections.feature_count(),
        "Model output decoded"
    );
    Ok(detections)
}

/// Parses detection rows: 6 columns for axis-aligned boxes, 10 for oriented.
pub fn decode_box_rows(
    output: &Tensor,
    spec: &TaskSpec,
) -> Result<Vec<DetectionGeometry>, InferenceError> {
    let columns = match spec.task {
        TaskKind::OrientedObjectDetection => 10,
        _ => 6,
    };
    let shape = output.squeezed_shape(2);
    if shape.len() != 2 || shape[1] != columns {
        return Err(InferenceError::InvalidTensor(format!(
            "expected [N, {}] detection rows, got {:?}",
            columns,
            output.shape()
        )));
    }

    Ok(output
        .data()
        .chunks_exact(columns)
        .map(|row| {
            let score = row[columns - 2];
            let class = row[columns - 1].round().max(0.0) as usize;
            let label = spec.label(class);
            let v = |i: usize| row[i] as f64;
            if columns == 10 {
                DetectionGeometry::oriented(
                    [[v(0), v(1)], [v(2), v(3)], [v(4), v(5)], [v(6), v(7)]],
                    score,
                    &label,
                )
            } else {
                DetectionGeometry::axis_aligned(v(0), v(1), v(2), v(3), score, &label)
            }
        })
        .collect())
}

/// Score filter, suppression, minimum area, then top-k.
///
/// Boxes are first scaled from model to raster pixels so `min_area` is in
/// raster pixels.
pub fn postprocess_detections(
    detections: Vec<DetectionGeometry>,
    params: &ResolvedPostProcessing,
    sx: f64,
    sy: f64,
) -> Vec<DetectionGeometry> {
    let scored: Vec<DetectionGeometry> = detections
        .into_iter()
        .filter(|d| d.score >= params.threshold)
        .map(|d| d.scaled(sx, sy))
        .collect();

    let deduped = if params.sort_by_score {
        dedupe_by_score(scored, params.iou_threshold)
    } else {
        dedupe(scored, params.iou_threshold)
    };

    let mut kept: Vec<DetectionGeometry> = deduped
        .into_iter()
        .filter(|d| d.area() >= params.min_area)
        .collect();

    if let Some(k) = params.top_k {
        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        kept.truncate(k);
    }
    kept
}

/// Vectorises up to `max_masks` probability masks `[N, H, W]`.
///
/// With a per-mask score tensor, the highest-scoring masks go first.
fn decode_masks(
    masks: &Tensor,
    scores: Option<&Tensor>,
    spec: &TaskSpec,
    image: &GeoRawImage,
    params: &ResolvedPostProcessing,
) -> Result<FeatureCollection, InferenceError> {
    let shape = masks.squeezed_shape(3);
    let [count, height, width] = match shape {
        [h, w] => [1, *h, *w],
        [n, h, w] => [*n, *h, *w],
        _ => {
            return Err(InferenceError::InvalidTensor(format!(
                "expected [N, H, W] masks, got {:?}",
                masks.shape()
            )))
        }
    };

    let mut order: Vec<(usize, f32)> = (0..count)
        .map(|i| (i, scores.and_then(|s| s.data().get(i).copied()).unwrap_or(1.0)))
        .collect();
    if scores.is_some() {
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    let plane = width * height;
    let pixel_area = (image.width() as f64 / width as f64) * (image.height() as f64 / height as f64);
    let mut features = Vec::new();

    for (index, score) in order.into_iter().take(params.max_masks) {
        let probabilities = &masks.data()[index * plane..(index + 1) * plane];
        let mask = BinaryMask::from_probabilities(probabilities, width, height, params.threshold)?;
        if mask.is_empty() || (mask.count() as f64 * pixel_area) < params.min_area {
            continue;
        }
        let feature: Feature = mask_to_polygon(&mask, image)
            .with_property("label", spec.label(0))
            .with_property("score", f64::from(score));
        features.push(feature);
    }

    Ok(FeatureCollection::new(features))
}

/// Per-pixel argmax over `[C, H, W]` logits, contoured per class.
fn decode_class_logits(
    logits: &Tensor,
    spec: &TaskSpec,
    image: &GeoRawImage,
) -> Result<Vec<FeatureCollection>, InferenceError> {
    let shape = logits.squeezed_shape(3);
    let &[classes, height, width] = shape else {
        return Err(InferenceError::InvalidTensor(format!(
            "expected [C, H, W] logits, got {:?}",
            logits.shape()
        )));
    };

    let plane = width * height;
    let data = logits.data();
    let argmax: Vec<usize> = (0..plane)
        .map(|p| {
            (0..classes)
                .max_by(|&a, &b| data[a * plane + p].total_cmp(&data[b * plane + p]))
                .unwrap_or(0)
        })
        .collect();

    (0..classes)
        .map(|class| {
            let values: Vec<f32> = argmax
                .iter()
                .map(|&c| if c == class { 1.0 } else { 0.0 })
                .collect();
            let geometry = contours_to_multipolygon(&values, width, height, 0.5, image)?;
            let features = geometry
                .map(|g| {
                    vec![Feature::new(g)
                        .with_property("class", spec.label(class))
                        .with_property("classIndex", class)]
                })
                .unwrap_or_default();
            Ok(FeatureCollection::new(features))
        })
        .collect()
}
