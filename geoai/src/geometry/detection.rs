//! Detection boxes, IoU and duplicate suppression.

use serde::{Deserialize, Serialize};

use super::polygon::{self, Point, EPSILON};
use crate::geojson::{Feature, Geometry};
use crate::raster::GeoRawImage;

/// Region of a detection in model pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BoxShape {
    /// Axis-aligned box from corner `(x1, y1)` to corner `(x2, y2)`.
    Axis { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// Four-vertex quadrilateral in drawing order.
    Oriented { points: [Point; 4] },
}

/// A scored, labelled detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionGeometry {
    pub shape: BoxShape,
    pub score: f32,
    pub label: String,
}

impl DetectionGeometry {
    pub fn axis_aligned(x1: f64, y1: f64, x2: f64, y2: f64, score: f32, label: &str) -> Self {
        Self {
            shape: BoxShape::Axis {
                x1: x1.min(x2),
                y1: y1.min(y2),
                x2: x1.max(x2),
                y2: y1.max(y2),
            },
            score,
            label: label.to_string(),
        }
    }

    pub fn oriented(points: [Point; 4], score: f32, label: &str) -> Self {
        Self {
            shape: BoxShape::Oriented { points },
            score,
            label: label.to_string(),
        }
    }

    /// The four corners in pixel space.
    pub fn corners(&self) -> [Point; 4] {
        match &self.shape {
            BoxShape::Axis { x1, y1, x2, y2 } => [[*x1, *y1], [*x2, *y1], [*x2, *y2], [*x1, *y2]],
            BoxShape::Oriented { points } => *points,
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> f64 {
        match &self.shape {
            BoxShape::Axis { x1, y1, x2, y2 } => (x2 - x1).abs() * (y2 - y1).abs(),
            BoxShape::Oriented { points } => polygon::area(points),
        }
    }

    /// Multiplies every coordinate, mapping model-input pixels onto raster
    /// pixels.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let shape = match &self.shape {
            BoxShape::Axis { x1, y1, x2, y2 } => BoxShape::Axis {
                x1: x1 * sx,
                y1: y1 * sy,
                x2: x2 * sx,
                y2: y2 * sy,
            },
            BoxShape::Oriented { points } => BoxShape::Oriented {
                points: points.map(|[x, y]| [x * sx, y * sy]),
            },
        };
        Self {
            shape,
            score: self.score,
            label: self.label.clone(),
        }
    }

    /// Converts to a world-space polygon feature carrying `score` and
    /// `label` properties.
    ///
    /// The ring is closed and counter-clockwise.
    pub fn to_feature(&self, image: &GeoRawImage) -> Feature {
        let mut ring: Vec<Point> = self
            .corners()
            .iter()
            .map(|&[x, y]| {
                let (lng, lat) = image.pixel_to_world(x, y);
                [lng, lat]
            })
            .collect();
        if polygon::signed_area(&ring) < 0.0 {
            ring.reverse();
        }
        ring.push(ring[0]);

        Feature::new(Geometry::Polygon(vec![ring]))
            .with_property("score", f64::from(self.score))
            .with_property("label", self.label.clone())
    }
}

/// Intersection-over-union of two detections, in `[0, 1]`.
///
/// Two axis-aligned boxes use the extent formula directly; any oriented box
/// goes through polygon clipping.
pub fn iou(a: &DetectionGeometry, b: &DetectionGeometry) -> f64 {
    match (&a.shape, &b.shape) {
        (
            BoxShape::Axis {
                x1: ax1,
                y1: ay1,
                x2: ax2,
                y2: ay2,
            },
            BoxShape::Axis {
                x1: bx1,
                y1: by1,
                x2: bx2,
                y2: by2,
            },
        ) => {
            let iw = (ax2.min(*bx2) - ax1.max(*bx1)).max(0.0);
            let ih = (ay2.min(*by2) - ay1.max(*by1)).max(0.0);
            let intersection = iw * ih;
            let union = a.area() + b.area() - intersection;
            if union < EPSILON {
                0.0
            } else {
                (intersection / union).clamp(0.0, 1.0)
            }
        }
        _ => polygon::polygon_iou(&a.corners(), &b.corners()),
    }
}

/// Greedy, order-dependent duplicate suppression.
///
/// Detections are visited in input order. A new detection that overlaps no
/// kept detection by more than `iou_threshold` is kept. Otherwise it wins
/// only if its score beats every kept detection it overlaps: it then takes
/// the place of the first of them and the rest are dropped. A losing
/// detection is discarded.
///
/// No two returned detections overlap by more than the threshold.
pub fn dedupe(detections: Vec<DetectionGeometry>, iou_threshold: f64) -> Vec<DetectionGeometry> {
    let mut kept: Vec<DetectionGeometry> = Vec::with_capacity(detections.len());

    for detection in detections {
        let overlapping: Vec<usize> = kept
            .iter()
            .enumerate()
            .filter(|(_, k)| iou(k, &detection) > iou_threshold)
            .map(|(i, _)| i)
            .collect();

        let Some((&first, rest)) = overlapping.split_first() else {
            kept.push(detection);
            continue;
        };

        let best = overlapping
            .iter()
            .map(|&i| kept[i].score)
            .fold(f32::NEG_INFINITY, f32::max);
        if detection.score > best {
            kept[first] = detection;
            for &i in rest.iter().rev() {
                kept.remove(i);
            }
        }
    }

    kept
}

/// Score-sorted suppression: standard NMS.
///
/// Sorts by descending score (stable, so ties keep input order) and then
/// applies [`dedupe`], which reduces to keeping each detection that does not
/// overlap a higher-scoring survivor.
pub fn dedupe_by_score(
    mut detections: Vec<DetectionGeometry>,
    iou_threshold: f64,
) -> Vec<DetectionGeometry> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    dedupe(detections, iou_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoBoundingBox;
    use crate::raster::Crs;

    fn boxed(x: f64, y: f64, size: f64, score: f32) -> DetectionGeometry {
        DetectionGeometry::axis_aligned(x, y, x + size, y + size, score, "car")
    }

    #[test]
    fn test_axis_iou_matches_polygon_iou() {
        let a = boxed(0.0, 0.0, 2.0, 0.9);
        let b = boxed(1.0, 1.0, 2.0, 0.8);
        let axis = iou(&a, &b);
        let poly = polygon::polygon_iou(&a.corners(), &b.corners());
        assert!((axis - 1.0 / 7.0).abs() < 1e-9);
        assert!((axis - poly).abs() < 1e-9);
    }

    #[test]
    fn test_oriented_self_iou() {
        let d = DetectionGeometry::oriented(
            [[2.0, 0.0], [4.0, 2.0], [2.0, 4.0], [0.0, 2.0]],
            0.7,
            "ship",
        );
        assert!((iou(&d, &d) - 1.0).abs() < 1e-9);
        assert!((d.area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_shapes_use_polygon_path() {
        let axis = boxed(0.0, 0.0, 4.0, 0.5);
        let diamond = DetectionGeometry::oriented(
            [[2.0, 0.0], [4.0, 2.0], [2.0, 4.0], [0.0, 2.0]],
            0.5,
            "ship",
        );
        assert!((iou(&axis, &diamond) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_axis_aligned_normalises_corners() {
        let d = DetectionGeometry::axis_aligned(5.0, 5.0, 1.0, 2.0, 0.5, "x");
        assert_eq!(
            d.shape,
            BoxShape::Axis {
                x1: 1.0,
                y1: 2.0,
                x2: 5.0,
                y2: 5.0
            }
        );
    }

    #[test]
    fn test_dedupe_keeps_non_overlapping() {
        let kept = dedupe(vec![boxed(0.0, 0.0, 1.0, 0.5), boxed(10.0, 10.0, 1.0, 0.4)], 0.5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_dedupe_replaces_in_place_when_higher() {
        let kept = dedupe(
            vec![
                boxed(50.0, 50.0, 1.0, 0.3),
                boxed(0.0, 0.0, 10.0, 0.5),
                boxed(0.5, 0.5, 10.0, 0.9),
            ],
            0.5,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].score, 0.9);
        assert_eq!(kept[0].score, 0.3);
    }

    #[test]
    fn test_dedupe_drops_lower_duplicate() {
        let kept = dedupe(vec![boxed(0.0, 0.0, 10.0, 0.9), boxed(0.5, 0.5, 10.0, 0.4)], 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_dedupe_winner_replaces_every_overlap() {
        // a overlaps b and b overlaps c, but a and c do not overlap
        let a = boxed(0.0, 0.0, 10.0, 0.8);
        let b = boxed(4.0, 0.0, 10.0, 0.9);
        let c = boxed(8.0, 0.0, 10.0, 0.7);
        let greedy = dedupe(vec![a.clone(), c.clone(), b.clone()], 0.3);
        assert_eq!(greedy.len(), 1);
        assert_eq!(greedy[0].score, 0.9);

        let sorted = dedupe_by_score(vec![a, c, b], 0.3);
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].score, 0.9);
    }

    #[test]
    fn test_feature_is_closed_ccw_in_world() {
        let bounds = GeoBoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let image = GeoRawImage::new(vec![0; 100], 10, 10, 1, bounds, Crs::Epsg4326).unwrap();
        let feature = boxed(0.0, 0.0, 5.0, 0.75).to_feature(&image);
        let Some(Geometry::Polygon(rings)) = &feature.geometry else {
            panic!("expected polygon");
        };
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert!(polygon::signed_area(ring) > 0.0);
        assert_eq!(feature.properties["label"], "car");
        let bbox = feature.bbox().unwrap();
        assert!((bbox.north - 1.0).abs() < 1e-12);
        assert!((bbox.east - 0.5).abs() < 1e-12);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn detection() -> impl Strategy<Value = DetectionGeometry> {
            (0.0..100.0_f64, 0.0..100.0_f64, 1.0..30.0_f64, 1.0..30.0_f64, 0.0..1.0_f32)
                .prop_map(|(x, y, w, h, s)| DetectionGeometry::axis_aligned(x, y, x + w, y + h, s, "obj"))
        }

        proptest! {
            #[test]
            fn test_dedupe_never_keeps_overlaps(
                detections in prop::collection::vec(detection(), 0..40),
                threshold in 0.1..0.9_f64,
            ) {
                for kept in [dedupe(detections.clone(), threshold), dedupe_by_score(detections, threshold)] {
                    for i in 0..kept.len() {
                        for j in (i + 1)..kept.len() {
                            prop_assert!(iou(&kept[i], &kept[j]) <= threshold);
                        }
                    }
                }
            }
        }
    }
}
