//! Detection post-processing geometry
//!
//! - [`mask_to_polygon`] vectorises a binary mask by boundary tracing
//! - [`contours_to_multipolygon`] extracts nested iso-contours for
//!   multi-class output
//! - [`iou`] and [`dedupe`] suppress duplicate axis-aligned or oriented
//!   detections
//!
//! All functions are pure.

mod contour;
mod detection;
mod mask;
mod polygon;

use thiserror::Error;

pub use contour::{contour_rings, contours_to_multipolygon, group_rings};
pub use detection::{dedupe, dedupe_by_score, iou, BoxShape, DetectionGeometry};
pub use mask::{mask_to_polygon, BinaryMask};
pub use polygon::{area, clip_polygon, point_in_ring, polygon_iou, signed_area, Point};

/// Errors raised by geometry helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A value buffer does not match its declared grid.
    #[error("grid of {width}×{height} does not match {actual} values")]
    MaskSize {
        width: usize,
        height: usize,
        actual: usize,
    },
}
