//! Raster types and errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::coord::CoordError;

/// Coordinate reference system tag carried by a raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Geographic WGS84 degrees
    #[default]
    #[serde(rename = "EPSG:4326")]
    Epsg4326,
    /// Web Mercator metres
    #[serde(rename = "EPSG:3857")]
    Epsg3857,
}

impl Crs {
    /// The EPSG identifier, e.g. `"EPSG:4326"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Crs::Epsg4326 => "EPSG:4326",
            Crs::Epsg3857 => "EPSG:3857",
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by raster construction and manipulation.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Width, height or channel count is zero or unsupported.
    #[error("Invalid dimensions {width}×{height}×{channels}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        channels: u8,
        reason: String,
    },

    /// Pixel buffer length does not match the declared dimensions.
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Bounds are degenerate or inverted.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(#[from] CoordError),

    /// A crop window falls outside the raster.
    #[error("Window {x},{y} {width}×{height} outside raster {raster_width}×{raster_height}")]
    WindowOutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        raster_width: u32,
        raster_height: u32,
    },

    /// Image codec failure.
    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for RasterError {
    fn from(e: image::ImageError) -> Self {
        RasterError::Image(e.to_string())
    }
}
